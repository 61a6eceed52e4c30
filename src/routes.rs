use crate::{
    routes::{
        index::get_index_route,
        photos::{MAX_PHOTO_BYTES, delete_student_photo, get_student_photo},
        students::{
            delete_student, get_all_students, get_search_students, get_student,
            post_add_student, put_update_student,
        },
    },
    state::StudentState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod index;
pub mod photos;
pub mod students;

/// Whole-request cap; leaves room for the JSON part next to a maximal photo.
pub const MAX_REQUEST_BYTES: usize = MAX_PHOTO_BYTES + 1024 * 1024;

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match HeaderValue::from_str(origin) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            warn!(?origin, ?e, "Invalid CORS origin, cross-origin requests will be refused");
            AllowOrigin::list([])
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn router(state: StudentState) -> Router {
    let cors = cors_layer(&state.config().server_config().cors_origin);

    Router::new()
        .route("/", get(get_index_route))
        .route("/student/add", post(post_add_student))
        .route("/student/search/id/{student_id}", get(get_student))
        .route("/student/search", get(get_search_students))
        .route("/student/update/{student_id}", put(put_update_student))
        .route("/student/delete/{student_id}", delete(delete_student))
        .route("/student/all", get(get_all_students))
        .route(
            "/student/photo/{student_id}",
            get(get_student_photo).delete(delete_student_photo),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

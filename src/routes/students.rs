use crate::{
    data::student::{NewPhoto, Student, StudentForm},
    error::{DeserialiseStudentSnafu, MultipartSnafu, StudentResult},
    records::SearchCriteria,
    routes::photos::accept_upload,
    state::StudentState,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use snafu::ResultExt;

/// The two parts of a create/update request: a JSON `student` part and an
/// optional `photo` file. Other parts are skipped.
#[derive(Debug, Default)]
pub struct StudentUpload {
    pub student: Option<StudentForm>,
    pub photo: Option<NewPhoto>,
}

impl StudentUpload {
    pub async fn read(mut multipart: Multipart) -> StudentResult<Self> {
        let mut upload = Self::default();

        while let Some(field) = multipart.next_field().await.context(MultipartSnafu)? {
            let name = field.name().map(ToString::to_string);
            match name.as_deref() {
                Some("student") => {
                    let bytes = field.bytes().await.context(MultipartSnafu)?;
                    upload.student =
                        Some(serde_json::from_slice(&bytes).context(DeserialiseStudentSnafu)?);
                }
                Some("photo") => {
                    let content_type = field.content_type().map(ToString::to_string);
                    let file_name = field.file_name().map(ToString::to_string);
                    let bytes = field.bytes().await.context(MultipartSnafu)?;
                    upload.photo = accept_upload(content_type, file_name, bytes)?;
                }
                other => {
                    debug!(?other, "Skipping unexpected multipart field");
                }
            }
        }

        Ok(upload)
    }
}

pub async fn post_add_student(
    State(state): State<StudentState>,
    multipart: Multipart,
) -> StudentResult<(StatusCode, Json<Student>)> {
    let StudentUpload { student, photo } = StudentUpload::read(multipart).await?;
    let saved = state.add(student, photo).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_student(
    State(state): State<StudentState>,
    Path(student_id): Path<String>,
) -> StudentResult<Json<Student>> {
    Ok(Json(state.find_by_student_id(&student_id).await?))
}

pub async fn get_search_students(
    State(state): State<StudentState>,
    Query(criteria): Query<SearchCriteria>,
) -> StudentResult<Json<Vec<Student>>> {
    Ok(Json(state.search(criteria).await?))
}

pub async fn put_update_student(
    State(state): State<StudentState>,
    Path(student_id): Path<String>,
    multipart: Multipart,
) -> StudentResult<Json<Student>> {
    let StudentUpload { student, photo } = StudentUpload::read(multipart).await?;
    Ok(Json(state.update(&student_id, student, photo).await?))
}

pub async fn delete_student(
    State(state): State<StudentState>,
    Path(student_id): Path<String>,
) -> StudentResult<&'static str> {
    state.delete(&student_id).await?;
    Ok("Student deleted successfully")
}

pub async fn get_all_students(
    State(state): State<StudentState>,
) -> StudentResult<Json<Vec<Student>>> {
    Ok(Json(state.get_all().await?))
}

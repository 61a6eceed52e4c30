use crate::{
    data::student::{NewPhoto, PhotoRef},
    error::{InvalidPhotoTypeSnafu, MissingPhotoSnafu, PhotoTooLargeSnafu, StudentResult},
    state::StudentState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use snafu::{OptionExt, ensure};

pub const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;
pub const ALLOWED_PHOTO_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// Checks an uploaded `photo` part. Empty uploads count as no photo at all.
pub fn accept_upload(
    content_type: Option<String>,
    file_name: Option<String>,
    bytes: Bytes,
) -> StudentResult<Option<NewPhoto>> {
    if bytes.is_empty() {
        return Ok(None);
    }

    let content_type = match content_type {
        Some(content_type)
            if ALLOWED_PHOTO_TYPES
                .iter()
                .any(|allowed| content_type.eq_ignore_ascii_case(allowed)) =>
        {
            content_type
        }
        other => return InvalidPhotoTypeSnafu { content_type: other }.fail(),
    };
    ensure!(
        bytes.len() <= MAX_PHOTO_BYTES,
        PhotoTooLargeSnafu { size: bytes.len() }
    );

    Ok(Some(NewPhoto {
        bytes: bytes.to_vec(),
        content_type,
        file_name,
    }))
}

/// The stored type if there is one, otherwise whatever the bytes look like.
pub fn served_content_type(photo: PhotoRef<'_>) -> String {
    photo
        .content_type
        .map(ToString::to_string)
        .or_else(|| infer::get(photo.bytes).map(|kind| kind.mime_type().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

pub async fn get_student_photo(
    State(state): State<StudentState>,
    Path(student_id): Path<String>,
) -> StudentResult<Response> {
    let student = state.find_by_student_id(&student_id).await?;
    let photo = student.photo().context(MissingPhotoSnafu {
        student_id: student_id.as_str(),
    })?;

    Ok((
        [(header::CONTENT_TYPE, served_content_type(photo))],
        photo.bytes.to_vec(),
    )
        .into_response())
}

pub async fn delete_student_photo(
    State(state): State<StudentState>,
    Path(student_id): Path<String>,
) -> StudentResult<&'static str> {
    state.remove_photo(&student_id).await?;
    Ok("Photo removed successfully")
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snafu::Snafu;
use std::num::ParseIntError;

pub type StudentResult<T> = Result<T, StudentError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StudentError {
    #[snafu(display("Error opening database"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error making SQL query"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("Error migrating DB schema"))]
    MigrateError { source: sqlx::migrate::MigrateError },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse IP port"))]
    ParsePort { source: ParseIntError },
    #[snafu(display("Unknown storage backend {:?}, expected `postgres` or `memory`", found))]
    UnknownStorage { found: String },

    #[snafu(display("Student cannot be null"))]
    NullStudent,
    #[snafu(display("Student name cannot be empty"))]
    EmptyStudentName,
    #[snafu(display("Invalid email format"))]
    InvalidEmail,
    #[snafu(display("Student ID cannot be empty"))]
    EmptyStudentId,
    #[snafu(display("Unable to read student details: {}", source))]
    DeserialiseStudent { source: serde_json::Error },
    #[snafu(display("Error with multipart form input"))]
    Multipart {
        source: axum::extract::multipart::MultipartError,
    },
    #[snafu(display("Invalid image type. Allowed types: JPEG, PNG, GIF."))]
    InvalidPhotoType { content_type: Option<String> },
    #[snafu(display("Image size exceeds maximum allowed size of 2 MB."))]
    PhotoTooLarge { size: usize },

    #[snafu(display("Student already exists with same email: {}", email))]
    DuplicateEmail { email: String },
    #[snafu(display("Student already exists with same phone: {}", phone))]
    DuplicatePhone { phone: i64 },
    #[snafu(display("Student already exists with same student ID: {}", student_id))]
    DuplicateStudentId { student_id: String },

    #[snafu(display("Student not found with ID: {}", student_id))]
    StudentNotFound { student_id: String },
    #[snafu(display("Student is not present with this ID {} to {}", student_id, action))]
    MissingStudent {
        student_id: String,
        action: &'static str,
    },
    #[snafu(display("Student with ID {} has no photo", student_id))]
    MissingPhoto { student_id: String },
}

/// Coarse classification of a [`StudentError`], independent of transport.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Conflict,
    NotFound,
    Unexpected,
}

impl StudentError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NullStudent
            | Self::EmptyStudentName
            | Self::InvalidEmail
            | Self::EmptyStudentId
            | Self::DeserialiseStudent { .. }
            | Self::Multipart { .. }
            | Self::InvalidPhotoType { .. }
            | Self::PhotoTooLarge { .. } => ErrorKind::InvalidArgument,
            Self::DuplicateEmail { .. }
            | Self::DuplicatePhone { .. }
            | Self::DuplicateStudentId { .. } => ErrorKind::Conflict,
            Self::StudentNotFound { .. }
            | Self::MissingStudent { .. }
            | Self::MissingPhoto { .. } => ErrorKind::NotFound,
            Self::OpenDatabase { .. }
            | Self::MakeQuery { .. }
            | Self::MigrateError { .. }
            | Self::BadEnvVar { .. }
            | Self::ParsePort { .. }
            | Self::UnknownStorage { .. } => ErrorKind::Unexpected,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: u16,
    error: &'static str,
    message: String,
}

impl IntoResponse for StudentError {
    fn into_response(self) -> Response {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input
        const CF: StatusCode = StatusCode::CONFLICT; //conflict
        const TL: StatusCode = StatusCode::PAYLOAD_TOO_LARGE; //too large

        let status_code = match &self {
            Self::PhotoTooLarge { .. } => TL,
            Self::Multipart { source } => source.status(),
            _ => match self.kind() {
                ErrorKind::InvalidArgument => BI,
                ErrorKind::Conflict => CF,
                ErrorKind::NotFound => NF,
                ErrorKind::Unexpected => ISE,
            },
        };

        if status_code.is_server_error() {
            error!(?self, "Error!");
        } else {
            warn!(%self, %status_code, "Rejected request");
        }

        let body = ErrorBody {
            status: status_code.as_u16(),
            error: status_code.canonical_reason().unwrap_or("Unknown Error"),
            message: self.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}

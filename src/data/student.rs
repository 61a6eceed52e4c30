use serde::{Deserialize, Serialize, Serializer};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// A persisted student row. The photo bytes stay server-side and are only
/// ever handed out through the photo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub student_id: String,
    pub student_name: String,
    pub student_city: Option<String>,
    pub student_phone: Option<i64>,
    pub student_email: Option<String>,
    #[serde(skip)]
    pub photo: Option<Vec<u8>>,
    pub photo_content_type: Option<String>,
    pub photo_file_name: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: OffsetDateTime,
}

impl Student {
    pub fn photo(&self) -> Option<PhotoRef<'_>> {
        let bytes = self.photo.as_deref().filter(|bytes| !bytes.is_empty())?;
        Some(PhotoRef {
            bytes,
            content_type: self.photo_content_type.as_deref(),
            file_name: self.photo_file_name.as_deref(),
        })
    }

    /// Replaces (or with `None`, clears) all three photo columns together.
    pub fn set_photo(&mut self, photo: Option<NewPhoto>) {
        match photo {
            Some(NewPhoto {
                bytes,
                content_type,
                file_name,
            }) => {
                self.photo = Some(bytes);
                self.photo_content_type = Some(content_type);
                self.photo_file_name = file_name;
            }
            None => {
                self.photo = None;
                self.photo_content_type = None;
                self.photo_file_name = None;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PhotoRef<'a> {
    pub bytes: &'a [u8],
    pub content_type: Option<&'a str>,
    pub file_name: Option<&'a str>,
}

/// An uploaded photo that has already passed the boundary checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

/// The create/update payload as sent by clients, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    pub student_name: Option<String>,
    pub student_city: Option<String>,
    pub student_phone: Option<i64>,
    pub student_email: Option<String>,
}

/// Everything needed to insert a row, minus the surrogate key.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub student_id: String,
    pub student_name: String,
    pub student_city: Option<String>,
    pub student_phone: Option<i64>,
    pub student_email: Option<String>,
    pub photo: Option<NewPhoto>,
    pub created_at: OffsetDateTime,
}

impl NewStudent {
    /// What the row looks like once the store has handed out `id`.
    pub fn into_student(self, id: i64) -> Student {
        let mut student = Student {
            id,
            student_id: self.student_id,
            student_name: self.student_name,
            student_city: self.student_city,
            student_phone: self.student_phone,
            student_email: self.student_email,
            photo: None,
            photo_content_type: None,
            photo_file_name: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        };
        student.set_photo(self.photo);
        student
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] //serde hands us a reference
fn serialize_timestamp<S: Serializer>(
    timestamp: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let formatted = timestamp
        .format(TIMESTAMP_FORMAT)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

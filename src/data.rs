use crate::{
    data::student::{NewStudent, Student},
    error::StudentResult,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod memory;
pub mod postgres;
pub mod student;

/// Persistence for student rows.
///
/// Implementations must enforce uniqueness of `student_id`, `student_email`
/// and `student_phone` themselves, reporting violations as the matching
/// `Duplicate*` error: the existence checks the records layer makes before
/// inserting are only advisory, as two requests can pass them at once.
#[async_trait]
pub trait StudentStore: Debug + Send + Sync {
    /// Stores a brand-new row, assigning its surrogate key.
    async fn insert(&self, new_student: NewStudent) -> StudentResult<Student>;
    /// Rewrites every mutable column of an existing row, matched by `id`.
    /// `created_at` is never written.
    async fn update(&self, student: Student) -> StudentResult<Student>;
    async fn find_by_student_id(&self, student_id: &str) -> StudentResult<Option<Student>>;
    async fn exists_by_email(&self, email: &str) -> StudentResult<bool>;
    async fn exists_by_phone(&self, phone: i64) -> StudentResult<bool>;
    async fn find_all(&self) -> StudentResult<Vec<Student>>;
    /// Rows matching ANY of the given fields. `None` matches nothing.
    async fn find_by_name_or_phone_or_email(
        &self,
        name: Option<&str>,
        phone: Option<i64>,
        email: Option<&str>,
    ) -> StudentResult<Vec<Student>>;
    async fn delete(&self, student: &Student) -> StudentResult<()>;

    async fn close(&self) {}
}

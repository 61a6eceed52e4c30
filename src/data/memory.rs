use crate::{
    data::{
        StudentStore,
        student::{NewStudent, Student},
    },
    error::{
        DuplicateEmailSnafu, DuplicatePhoneSnafu, DuplicateStudentIdSnafu, MissingStudentSnafu,
        StudentResult,
    },
};
use async_trait::async_trait;
use snafu::{OptionExt, ensure};
use tokio::sync::RwLock;

/// A process-local store, kept in insertion order. Nothing survives a
/// restart.
#[derive(Debug, Default)]
pub struct MemoryStudentStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    rows: Vec<Student>,
}

impl Inner {
    /// Mirrors the table's unique constraints. `skip_id` is the row being
    /// rewritten, which may of course clash with itself.
    fn check_unique(&self, candidate: &Student, skip_id: Option<i64>) -> StudentResult<()> {
        for row in self.rows.iter().filter(|row| Some(row.id) != skip_id) {
            ensure!(
                row.student_id != candidate.student_id,
                DuplicateStudentIdSnafu {
                    student_id: candidate.student_id.as_str()
                }
            );
            if let Some(email) = candidate.student_email.as_deref() {
                ensure!(
                    row.student_email.as_deref() != Some(email),
                    DuplicateEmailSnafu { email }
                );
            }
            if let Some(phone) = candidate.student_phone {
                ensure!(
                    row.student_phone != Some(phone),
                    DuplicatePhoneSnafu { phone }
                );
            }
        }
        Ok(())
    }
}

impl MemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn insert(&self, new_student: NewStudent) -> StudentResult<Student> {
        let mut inner = self.inner.write().await;

        let student = new_student.into_student(inner.last_id + 1);
        inner.check_unique(&student, None)?;

        inner.last_id = student.id;
        inner.rows.push(student.clone());
        Ok(student)
    }

    async fn update(&self, student: Student) -> StudentResult<Student> {
        let mut inner = self.inner.write().await;
        inner.check_unique(&student, Some(student.id))?;

        let existing = inner
            .rows
            .iter_mut()
            .find(|row| row.id == student.id)
            .context(MissingStudentSnafu {
                student_id: student.student_id.as_str(),
                action: "update",
            })?;

        let created_at = existing.created_at;
        *existing = Student {
            created_at,
            ..student
        };
        Ok(existing.clone())
    }

    async fn find_by_student_id(&self, student_id: &str) -> StudentResult<Option<Student>> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .find(|row| row.student_id == student_id)
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> StudentResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .any(|row| row.student_email.as_deref() == Some(email)))
    }

    async fn exists_by_phone(&self, phone: i64) -> StudentResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .any(|row| row.student_phone == Some(phone)))
    }

    async fn find_all(&self) -> StudentResult<Vec<Student>> {
        Ok(self.inner.read().await.rows.clone())
    }

    async fn find_by_name_or_phone_or_email(
        &self,
        name: Option<&str>,
        phone: Option<i64>,
        email: Option<&str>,
    ) -> StudentResult<Vec<Student>> {
        let matches = |row: &&Student| {
            name.is_some_and(|name| row.student_name == name)
                || phone.is_some_and(|phone| row.student_phone == Some(phone))
                || email.is_some_and(|email| row.student_email.as_deref() == Some(email))
        };

        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .filter(matches)
            .cloned()
            .collect())
    }

    async fn delete(&self, student: &Student) -> StudentResult<()> {
        self.inner
            .write()
            .await
            .rows
            .retain(|row| row.id != student.id);
        Ok(())
    }
}

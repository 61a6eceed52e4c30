use crate::{
    data::{
        StudentStore,
        student::{NewPhoto, NewStudent, Student, StudentForm},
    },
    error::{
        DuplicateEmailSnafu, DuplicatePhoneSnafu, EmptyStudentIdSnafu, MissingStudentSnafu,
        StudentError, StudentNotFoundSnafu, StudentResult,
    },
    records::{
        student_id::generate_student_id,
        validation::{ValidStudent, validate},
    },
};
use serde::Deserialize;
use snafu::{OptionExt, ensure};
use std::sync::Arc;
use time::OffsetDateTime;

pub mod student_id;
pub mod validation;

/// Fresh ids drawn before giving up on a run of business-id collisions.
const MAX_STUDENT_ID_ATTEMPTS: usize = 5;

//`ThreadRng` is !Send, so it stays out of the async fns
fn fresh_student_id(student: &ValidStudent) -> String {
    generate_student_id(&student.name, student.phone, &mut rand::rng())
}

/// Optional search criteria, as they arrive from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchCriteria {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Create/read/update/delete for student records on top of a [`StudentStore`].
#[derive(Clone, Debug)]
pub struct StudentRecords {
    store: Arc<dyn StudentStore>,
}

impl StudentRecords {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        candidate: Option<StudentForm>,
        photo: Option<NewPhoto>,
    ) -> StudentResult<Student> {
        let student = validate(candidate)?;

        if !student.email.trim().is_empty() {
            ensure!(
                !self.store.exists_by_email(&student.email).await?,
                DuplicateEmailSnafu {
                    email: student.email.as_str()
                }
            );
        }
        if let Some(phone) = student.phone {
            ensure!(
                !self.store.exists_by_phone(phone).await?,
                DuplicatePhoneSnafu { phone }
            );
        }

        let created_at = OffsetDateTime::now_utc();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let new_student = NewStudent {
                student_id: fresh_student_id(&student),
                student_name: student.name.clone(),
                student_city: student.city.clone(),
                student_phone: student.phone,
                student_email: Some(student.email.clone()),
                photo: photo.clone(),
                created_at,
            };

            match self.store.insert(new_student).await {
                Ok(saved) => {
                    info!(student_id = %saved.student_id, id = saved.id, "Added student");
                    return Ok(saved);
                }
                Err(StudentError::DuplicateStudentId { student_id })
                    if attempts < MAX_STUDENT_ID_ATTEMPTS =>
                {
                    warn!(%student_id, attempts, "Generated student ID already taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn find_by_student_id(&self, student_id: &str) -> StudentResult<Student> {
        ensure!(!student_id.trim().is_empty(), EmptyStudentIdSnafu);
        self.store
            .find_by_student_id(student_id)
            .await?
            .context(StudentNotFoundSnafu { student_id })
    }

    /// Students matching any of the given criteria, or everyone when there
    /// are none. A phone number that doesn't parse counts as not given.
    pub async fn search(&self, criteria: SearchCriteria) -> StudentResult<Vec<Student>> {
        let SearchCriteria { name, phone, email } = criteria;
        let phone = phone
            .filter(|phone| !phone.trim().is_empty())
            .and_then(|phone| match phone.parse::<i64>() {
                Ok(phone) => Some(phone),
                Err(e) => {
                    debug!(?phone, ?e, "Ignoring unparseable phone search");
                    None
                }
            });

        if name.is_none() && phone.is_none() && email.is_none() {
            return self.store.find_all().await;
        }

        self.store
            .find_by_name_or_phone_or_email(name.as_deref(), phone, email.as_deref())
            .await
    }

    pub async fn update(
        &self,
        student_id: &str,
        candidate: Option<StudentForm>,
        photo: Option<NewPhoto>,
    ) -> StudentResult<Student> {
        let changes = validate(candidate)?;
        let mut existing = self.existing(student_id, "update").await?;

        existing.student_name = changes.name;
        existing.student_city = changes.city;
        existing.student_phone = changes.phone;
        existing.student_email = Some(changes.email);
        if let Some(photo) = photo.filter(|photo| !photo.bytes.is_empty()) {
            existing.set_photo(Some(photo));
        }
        existing.updated_at = OffsetDateTime::now_utc();

        let saved = self.store.update(existing).await?;
        info!(student_id = %saved.student_id, "Updated student");
        Ok(saved)
    }

    pub async fn delete(&self, student_id: &str) -> StudentResult<()> {
        let existing = self.existing(student_id, "delete").await?;
        self.store.delete(&existing).await?;
        info!(%student_id, "Deleted student");
        Ok(())
    }

    pub async fn remove_photo(&self, student_id: &str) -> StudentResult<Student> {
        let mut existing = self.existing(student_id, "remove photo").await?;
        existing.set_photo(None);
        existing.updated_at = OffsetDateTime::now_utc();

        let saved = self.store.update(existing).await?;
        info!(%student_id, "Removed student photo");
        Ok(saved)
    }

    pub async fn get_all(&self) -> StudentResult<Vec<Student>> {
        self.store.find_all().await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }

    async fn existing(&self, student_id: &str, action: &'static str) -> StudentResult<Student> {
        self.store
            .find_by_student_id(student_id)
            .await?
            .context(MissingStudentSnafu { student_id, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::memory::MemoryStudentStore, error::ErrorKind};
    use async_trait::async_trait;
    use regex::Regex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn records() -> StudentRecords {
        StudentRecords::new(Arc::new(MemoryStudentStore::new()))
    }

    fn form(name: &str, phone: Option<i64>, email: &str) -> Option<StudentForm> {
        Some(StudentForm {
            student_name: Some(name.into()),
            student_city: Some("Pune".into()),
            student_phone: phone,
            student_email: Some(email.into()),
        })
    }

    fn jpeg() -> NewPhoto {
        NewPhoto {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            content_type: "image/jpeg".into(),
            file_name: Some("face.jpg".into()),
        }
    }

    #[tokio::test]
    async fn add_assigns_business_id_and_equal_timestamps() {
        let records = records();
        let pattern = Regex::new(r"^STU\d{3}[A-Z0-9]{2}\d{4}$").unwrap();

        let saved = records
            .add(form("Ravi Kumar", Some(9_876_543_210), "ravi@example.com"), None)
            .await
            .unwrap();

        assert!(pattern.is_match(&saved.student_id), "{}", saved.student_id);
        assert!(saved.student_id.starts_with("STU210RA"));
        assert_eq!(saved.created_at, saved.updated_at);
        assert_eq!(saved.student_email.as_deref(), Some("ravi@example.com"));
    }

    #[tokio::test]
    async fn add_rejects_duplicate_email_and_phone() {
        let records = records();
        records
            .add(form("Ravi", Some(1), "ravi@example.com"), None)
            .await
            .unwrap();

        let same_email = records
            .add(form("Other", Some(2), "ravi@example.com"), None)
            .await
            .unwrap_err();
        let same_phone = records
            .add(form("Other", Some(1), "other@example.com"), None)
            .await
            .unwrap_err();

        assert!(matches!(same_email, StudentError::DuplicateEmail { .. }));
        assert_eq!(same_email.kind(), ErrorKind::Conflict);
        assert!(matches!(same_phone, StudentError::DuplicatePhone { phone: 1 }));
        assert_eq!(same_phone.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn add_rejects_invalid_input() {
        let records = records();

        let empty_name = records
            .add(form("", None, "ravi@example.com"), None)
            .await
            .unwrap_err();
        let bad_email = records
            .add(form("Ravi", None, "not-an-email"), None)
            .await
            .unwrap_err();

        assert_eq!(empty_name.kind(), ErrorKind::InvalidArgument);
        assert_eq!(bad_email.kind(), ErrorKind::InvalidArgument);
        assert!(records.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_keeps_photo() {
        let records = records();
        let saved = records
            .add(form("Ravi", None, "ravi@example.com"), Some(jpeg()))
            .await
            .unwrap();

        let photo = saved.photo().unwrap();
        assert_eq!(photo.content_type, Some("image/jpeg"));
        assert_eq!(photo.file_name, Some("face.jpg"));
    }

    /// Claims the first few generated ids are already taken.
    #[derive(Debug)]
    struct CollidingStore {
        inner: MemoryStudentStore,
        collisions_left: AtomicUsize,
    }

    #[async_trait]
    impl StudentStore for CollidingStore {
        async fn insert(&self, new_student: NewStudent) -> StudentResult<Student> {
            if self
                .collisions_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StudentError::DuplicateStudentId {
                    student_id: new_student.student_id,
                });
            }
            self.inner.insert(new_student).await
        }
        async fn update(&self, student: Student) -> StudentResult<Student> {
            self.inner.update(student).await
        }
        async fn find_by_student_id(&self, student_id: &str) -> StudentResult<Option<Student>> {
            self.inner.find_by_student_id(student_id).await
        }
        async fn exists_by_email(&self, email: &str) -> StudentResult<bool> {
            self.inner.exists_by_email(email).await
        }
        async fn exists_by_phone(&self, phone: i64) -> StudentResult<bool> {
            self.inner.exists_by_phone(phone).await
        }
        async fn find_all(&self) -> StudentResult<Vec<Student>> {
            self.inner.find_all().await
        }
        async fn find_by_name_or_phone_or_email(
            &self,
            name: Option<&str>,
            phone: Option<i64>,
            email: Option<&str>,
        ) -> StudentResult<Vec<Student>> {
            self.inner
                .find_by_name_or_phone_or_email(name, phone, email)
                .await
        }
        async fn delete(&self, student: &Student) -> StudentResult<()> {
            self.inner.delete(student).await
        }
    }

    fn colliding(collisions: usize) -> StudentRecords {
        StudentRecords::new(Arc::new(CollidingStore {
            inner: MemoryStudentStore::new(),
            collisions_left: AtomicUsize::new(collisions),
        }))
    }

    #[tokio::test]
    async fn add_retries_taken_business_ids() {
        let records = colliding(MAX_STUDENT_ID_ATTEMPTS - 1);

        let saved = records
            .add(form("Ravi", None, "ravi@example.com"), None)
            .await
            .unwrap();

        assert!(saved.student_id.starts_with("STU000RA"));
    }

    #[tokio::test]
    async fn add_gives_up_after_repeated_collisions() {
        let records = colliding(MAX_STUDENT_ID_ATTEMPTS);

        let error = records
            .add(form("Ravi", None, "ravi@example.com"), None)
            .await
            .unwrap_err();

        assert!(matches!(error, StudentError::DuplicateStudentId { .. }));
        assert!(records.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_requires_an_id_and_a_match() {
        let records = records();

        let blank = records.find_by_student_id("  ").await.unwrap_err();
        let missing = records.find_by_student_id("STU000XX0000").await.unwrap_err();

        assert!(matches!(blank, StudentError::EmptyStudentId));
        assert_eq!(blank.kind(), ErrorKind::InvalidArgument);
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.to_string(), "Student not found with ID: STU000XX0000");
    }

    #[tokio::test]
    async fn search_matches_any_criterion() {
        let records = records();
        let ravi = records
            .add(form("Ravi", Some(111), "ravi@example.com"), None)
            .await
            .unwrap();
        let meera = records
            .add(form("Meera", Some(222), "meera@example.com"), None)
            .await
            .unwrap();
        records
            .add(form("Arjun", Some(333), "arjun@example.com"), None)
            .await
            .unwrap();

        let found = records
            .search(SearchCriteria {
                name: Some("Ravi".into()),
                phone: Some("222".into()),
                email: None,
            })
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|s| s.student_id.as_str()).collect();

        assert_eq!(ids, [ravi.student_id.as_str(), meera.student_id.as_str()]);
    }

    #[tokio::test]
    async fn search_without_usable_criteria_returns_everyone() {
        let records = records();
        for (name, phone, email) in [("Ravi", 1, "r@x.io"), ("Meera", 2, "m@x.io")] {
            records.add(form(name, Some(phone), email), None).await.unwrap();
        }

        let everyone = records.search(SearchCriteria::default()).await.unwrap();
        let bad_phone = records
            .search(SearchCriteria {
                phone: Some("abc".into()),
                ..SearchCriteria::default()
            })
            .await
            .unwrap();

        assert_eq!(everyone.len(), 2);
        assert_eq!(bad_phone, everyone);
    }

    #[tokio::test]
    async fn unparseable_phone_is_dropped_alongside_other_criteria() {
        let records = records();
        records.add(form("Ravi", Some(1), "r@x.io"), None).await.unwrap();
        records.add(form("Meera", Some(2), "m@x.io"), None).await.unwrap();

        let found = records
            .search(SearchCriteria {
                name: Some("Meera".into()),
                phone: Some("twelve".into()),
                email: None,
            })
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].student_name, "Meera");
    }

    #[tokio::test]
    async fn update_missing_student_is_not_found() {
        let error = records()
            .update("STU000XX0000", form("Ravi", None, "r@x.io"), None)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn update_validates_before_lookup() {
        let error = records()
            .update("STU000XX0000", form("Ravi", None, "nope"), None)
            .await
            .unwrap_err();

        assert!(matches!(error, StudentError::InvalidEmail));
    }

    #[tokio::test]
    async fn update_rewrites_fields_but_not_identity_or_photo() {
        let records = records();
        let saved = records
            .add(form("Ravi", Some(1), "r@x.io"), Some(jpeg()))
            .await
            .unwrap();

        let updated = records
            .update(
                &saved.student_id,
                Some(StudentForm {
                    student_name: Some("Ravi K".into()),
                    student_city: None,
                    student_phone: Some(2),
                    student_email: Some("ravi.k@x.io".into()),
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.student_id, saved.student_id);
        assert_eq!(updated.created_at, saved.created_at);
        assert!(updated.updated_at >= saved.updated_at);
        assert_eq!(updated.student_name, "Ravi K");
        assert_eq!(updated.student_city, None);
        assert_eq!(updated.student_phone, Some(2));
        assert_eq!(updated.photo, saved.photo);
        assert_eq!(updated.photo_file_name.as_deref(), Some("face.jpg"));
    }

    #[tokio::test]
    async fn update_cannot_take_another_students_email_or_phone() {
        let records = records();
        records
            .add(form("Ravi", Some(1), "ravi@example.com"), None)
            .await
            .unwrap();
        let meera = records
            .add(form("Meera", Some(2), "meera@example.com"), None)
            .await
            .unwrap();

        let same_email = records
            .update(&meera.student_id, form("Meera", Some(2), "ravi@example.com"), None)
            .await
            .unwrap_err();
        let same_phone = records
            .update(&meera.student_id, form("Meera", Some(1), "meera@example.com"), None)
            .await
            .unwrap_err();

        assert!(matches!(same_email, StudentError::DuplicateEmail { .. }));
        assert_eq!(same_email.kind(), ErrorKind::Conflict);
        assert!(matches!(same_phone, StudentError::DuplicatePhone { phone: 1 }));
        assert_eq!(same_phone.kind(), ErrorKind::Conflict);

        let unchanged = records.find_by_student_id(&meera.student_id).await.unwrap();
        assert_eq!(unchanged, meera);
    }

    #[tokio::test]
    async fn update_replaces_photo_when_given_one() {
        let records = records();
        let saved = records
            .add(form("Ravi", Some(1), "r@x.io"), Some(jpeg()))
            .await
            .unwrap();
        let png = NewPhoto {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".into(),
            file_name: None,
        };

        let updated = records
            .update(&saved.student_id, form("Ravi", Some(1), "r@x.io"), Some(png))
            .await
            .unwrap();

        assert_eq!(updated.photo_content_type.as_deref(), Some("image/png"));
        assert_eq!(updated.photo_file_name, None);
    }

    #[tokio::test]
    async fn remove_photo_clears_all_photo_fields() {
        let records = records();
        let saved = records
            .add(form("Ravi", Some(1), "r@x.io"), Some(jpeg()))
            .await
            .unwrap();

        records.remove_photo(&saved.student_id).await.unwrap();
        let fetched = records.find_by_student_id(&saved.student_id).await.unwrap();

        assert!(fetched.photo().is_none());
        assert_eq!(fetched.photo_content_type, None);
        assert_eq!(fetched.photo_file_name, None);
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let records = records();
        let saved = records
            .add(form("Ravi", Some(1), "r@x.io"), None)
            .await
            .unwrap();

        records.delete(&saved.student_id).await.unwrap();

        let again = records.delete(&saved.student_id).await.unwrap_err();
        let fetch = records
            .find_by_student_id(&saved.student_id)
            .await
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::NotFound);
        assert_eq!(fetch.kind(), ErrorKind::NotFound);
    }
}

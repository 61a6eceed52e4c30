use crate::{
    data::{
        StudentStore,
        student::{NewStudent, Student},
    },
    error::{
        MakeQuerySnafu, MigrateSnafu, MissingStudentSnafu, OpenDatabaseSnafu, StudentError,
        StudentResult,
    },
};
use async_trait::async_trait;
use snafu::{OptionExt, ResultExt};
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

#[derive(Debug, Clone)]
pub struct PgStudentStore {
    pool: Pool<Postgres>,
}

impl PgStudentStore {
    pub async fn new(options: PgPoolOptions, db_path: &str) -> StudentResult<Self> {
        let pool = options.connect(db_path).await.context(OpenDatabaseSnafu)?;

        sqlx::migrate!().run(&pool).await.context(MigrateSnafu)?;

        Ok(Self { pool })
    }
}

/// Turns a unique-constraint violation back into the domain error for the
/// column that clashed, so racing inserts still come out as conflicts.
fn classify_write_error(
    source: sqlx::Error,
    student_id: &str,
    email: Option<&str>,
    phone: Option<i64>,
) -> StudentError {
    if let sqlx::Error::Database(db_error) = &source {
        if db_error.is_unique_violation() {
            match db_error.constraint() {
                Some("students_student_id_key") => {
                    return StudentError::DuplicateStudentId {
                        student_id: student_id.to_string(),
                    };
                }
                Some("students_student_email_key") => {
                    if let Some(email) = email {
                        return StudentError::DuplicateEmail {
                            email: email.to_string(),
                        };
                    }
                }
                Some("students_student_phone_key") => {
                    if let Some(phone) = phone {
                        return StudentError::DuplicatePhone { phone };
                    }
                }
                _ => {}
            }
        }
    }

    StudentError::MakeQuery { source }
}

#[async_trait]
impl StudentStore for PgStudentStore {
    async fn insert(&self, new_student: NewStudent) -> StudentResult<Student> {
        let NewStudent {
            student_id,
            student_name,
            student_city,
            student_phone,
            student_email,
            photo,
            created_at,
        } = new_student;
        let (photo, photo_content_type, photo_file_name) = match photo {
            Some(photo) => (Some(photo.bytes), Some(photo.content_type), photo.file_name),
            None => (None, None, None),
        };

        sqlx::query_as::<_, Student>(
            "INSERT INTO public.students (student_id, student_name, student_city, student_phone, student_email, photo, photo_content_type, photo_file_name, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) RETURNING *",
        )
        .bind(&student_id)
        .bind(&student_name)
        .bind(&student_city)
        .bind(student_phone)
        .bind(&student_email)
        .bind(photo)
        .bind(photo_content_type)
        .bind(photo_file_name)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|source| {
            classify_write_error(source, &student_id, student_email.as_deref(), student_phone)
        })
    }

    async fn update(&self, student: Student) -> StudentResult<Student> {
        sqlx::query_as::<_, Student>(
            "UPDATE public.students SET student_name = $2, student_city = $3, student_phone = $4, student_email = $5, photo = $6, photo_content_type = $7, photo_file_name = $8, updated_at = $9 WHERE id = $1 RETURNING *",
        )
        .bind(student.id)
        .bind(&student.student_name)
        .bind(&student.student_city)
        .bind(student.student_phone)
        .bind(&student.student_email)
        .bind(&student.photo)
        .bind(&student.photo_content_type)
        .bind(&student.photo_file_name)
        .bind(student.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| {
            classify_write_error(
                source,
                &student.student_id,
                student.student_email.as_deref(),
                student.student_phone,
            )
        })?
        .context(MissingStudentSnafu {
            student_id: student.student_id.as_str(),
            action: "update",
        })
    }

    async fn find_by_student_id(&self, student_id: &str) -> StudentResult<Option<Student>> {
        sqlx::query_as::<_, Student>("SELECT * FROM public.students WHERE student_id = $1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .context(MakeQuerySnafu)
    }

    async fn exists_by_email(&self, email: &str) -> StudentResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM public.students WHERE student_email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .context(MakeQuerySnafu)
    }

    async fn exists_by_phone(&self, phone: i64) -> StudentResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM public.students WHERE student_phone = $1)",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .context(MakeQuerySnafu)
    }

    async fn find_all(&self) -> StudentResult<Vec<Student>> {
        sqlx::query_as::<_, Student>("SELECT * FROM public.students ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context(MakeQuerySnafu)
    }

    async fn find_by_name_or_phone_or_email(
        &self,
        name: Option<&str>,
        phone: Option<i64>,
        email: Option<&str>,
    ) -> StudentResult<Vec<Student>> {
        //`col = NULL` is never true, so absent criteria drop out of the OR
        sqlx::query_as::<_, Student>(
            "SELECT * FROM public.students WHERE student_name = $1 OR student_phone = $2 OR student_email = $3 ORDER BY id",
        )
        .bind(name)
        .bind(phone)
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .context(MakeQuerySnafu)
    }

    async fn delete(&self, student: &Student) -> StudentResult<()> {
        sqlx::query("DELETE FROM public.students WHERE id = $1")
            .bind(student.id)
            .execute(&self.pool)
            .await
            .context(MakeQuerySnafu)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

use crate::{
    data::student::StudentForm,
    error::{EmptyStudentNameSnafu, InvalidEmailSnafu, NullStudentSnafu, StudentResult},
};
use regex::Regex;
use snafu::{OptionExt, ensure};
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$").expect("email pattern is valid"));

/// A [`StudentForm`] whose name and email have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidStudent {
    pub name: String,
    pub city: Option<String>,
    pub phone: Option<i64>,
    pub email: String,
}

pub fn validate(candidate: Option<StudentForm>) -> StudentResult<ValidStudent> {
    let StudentForm {
        student_name,
        student_city,
        student_phone,
        student_email,
    } = candidate.context(NullStudentSnafu)?;

    let name = student_name
        .filter(|name| !name.trim().is_empty())
        .context(EmptyStudentNameSnafu)?;
    let email = student_email.context(InvalidEmailSnafu)?;
    ensure!(EMAIL_PATTERN.is_match(&email), InvalidEmailSnafu);

    Ok(ValidStudent {
        name,
        city: student_city,
        phone: student_phone,
        email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StudentError};

    fn form(name: Option<&str>, email: Option<&str>) -> StudentForm {
        StudentForm {
            student_name: name.map(Into::into),
            student_city: None,
            student_phone: Some(9_876_543_210),
            student_email: email.map(Into::into),
        }
    }

    #[test]
    fn accepts_a_complete_form() {
        let valid = validate(Some(form(Some("Ravi Kumar"), Some("ravi@example.com")))).unwrap();

        assert_eq!(valid.name, "Ravi Kumar");
        assert_eq!(valid.email, "ravi@example.com");
        assert_eq!(valid.phone, Some(9_876_543_210));
    }

    #[test]
    fn missing_form_is_rejected() {
        assert!(matches!(validate(None), Err(StudentError::NullStudent)));
    }

    #[test]
    fn blank_or_missing_names_are_rejected() {
        for name in [None, Some(""), Some("   \t")] {
            let error = validate(Some(form(name, Some("ravi@example.com")))).unwrap_err();
            assert!(matches!(error, StudentError::EmptyStudentName));
            assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn email_must_look_like_local_at_domain() {
        for email in [
            None,
            Some(""),
            Some("not-an-email"),
            Some("@example.com"),
            Some("ravi@"),
            Some("ra vi@example.com"),
        ] {
            let result = validate(Some(form(Some("Ravi"), email)));
            assert!(
                matches!(result, Err(StudentError::InvalidEmail)),
                "{email:?} should be rejected"
            );
        }

        for email in ["a+b_c.d-e@x", "RAVI@example.com", "r@b@c"] {
            assert!(validate(Some(form(Some("Ravi"), Some(email)))).is_ok(), "{email:?}");
        }
    }

    #[test]
    fn name_is_kept_verbatim() {
        let valid = validate(Some(form(Some("  Ravi "), Some("ravi@example.com")))).unwrap();
        assert_eq!(valid.name, "  Ravi ");
    }
}

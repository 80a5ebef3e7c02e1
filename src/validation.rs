//! Field checks shared by the input schemas.

use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors};

use crate::error::AppError;

/// Phrases a listing may not carry under the anti-discrimination rules.
const DISCRIMINATORY_PHRASES: &[&str] = &[
    "no dss",
    "no benefits",
    "no housing benefit",
    "no universal credit",
    "no children",
    "no kids",
    "no families",
    "professionals only",
    "working professionals only",
];

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "This field is required"));
    }
    Ok(())
}

/// Review text between 50 and 1000 characters once surrounding whitespace is dropped.
pub fn review_text(value: &str) -> Result<(), ValidationError> {
    let length = value.trim().chars().count();
    if !(50..=1000).contains(&length) {
        return Err(error("length", "Reviews must be 50 to 1000 characters"));
    }
    Ok(())
}

pub fn fair_listing_text(value: &str) -> Result<(), ValidationError> {
    let lowered = value.to_lowercase();
    match DISCRIMINATORY_PHRASES
        .iter()
        .find(|phrase| lowered.contains(*phrase))
    {
        Some(phrase) => Err(error(
            "discriminatory",
            format!("Listings may not say \"{phrase}\""),
        )),
        None => Ok(()),
    }
}

pub fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// A single field failure as an `AppError::Validation`.
pub fn field_error(
    field: &'static str,
    code: &'static str,
    message: impl Into<Cow<'static, str>>,
) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, error(code, message));
    AppError::Validation(errors)
}

/// Turns accumulated errors into a result.
pub fn finish(errors: ValidationErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Starts from derive-generated errors so cross-field checks can be added.
pub fn collect(result: Result<(), ValidationErrors>) -> ValidationErrors {
    result.err().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_rejected() {
        assert!(not_blank("   ").is_err());
        assert!(not_blank("Flat 2").is_ok());
    }

    #[test]
    fn listing_text_rejects_benefit_bans_case_insensitively() {
        assert!(fair_listing_text("Lovely flat. NO DSS please").is_err());
        assert!(fair_listing_text("Bright two bed near the park").is_ok());
    }

    #[test]
    fn review_length_ignores_padding() {
        let padded = format!("{:^80}", "x".repeat(40));
        assert!(review_text(&padded).is_err());
        assert!(review_text(&"x".repeat(50)).is_ok());
        assert!(review_text(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn field_error_names_the_field() {
        let err = field_error("deposit", "cap", "Deposit too high");
        let errors = err.field_errors().expect("validation error");
        assert!(errors.field_errors().contains_key("deposit"));
    }
}

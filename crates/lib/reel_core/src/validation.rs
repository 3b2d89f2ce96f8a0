//! Struct validation helpers shared by the services.

use std::collections::BTreeMap;

use validator::{Validate, ValidationErrors};

/// Field name → human-readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Run `validator` rules and flatten failures into [`FieldErrors`].
pub fn validate<T: Validate>(value: &T) -> Result<(), FieldErrors> {
    value.validate().map_err(|e| field_errors(&e))
}

/// Flatten `ValidationErrors`, keeping the first message per field.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid ({})", err.code));
                (field.to_string(), message)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn collects_one_message_per_field() {
        let errors = validate(&Sample {
            name: String::new(),
            email: "nope".into(),
        })
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors["name"], "name is required");
        assert_eq!(errors["email"], "email is invalid (email)");
    }

    #[test]
    fn valid_struct_passes() {
        assert!(
            validate(&Sample {
                name: "Ada".into(),
                email: "ada@example.com".into(),
            })
            .is_ok()
        );
    }
}

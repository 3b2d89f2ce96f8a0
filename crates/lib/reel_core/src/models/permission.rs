//! Permission domain models.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]+:[a-z]+$").expect("permission code pattern compiles")
});

/// Capability identifier of the form `resource:action`, e.g. `movie:add`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(String);

/// Rejected permission code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission format: {0:?}")]
pub struct InvalidPermissionCode(pub String);

impl PermissionCode {
    /// Whether `raw` is a well-formed code.
    pub fn is_valid(raw: &str) -> bool {
        CODE_PATTERN.is_match(raw)
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidPermissionCode> {
        if Self::is_valid(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidPermissionCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PermissionCode {
    type Err = InvalidPermissionCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = InvalidPermissionCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidPermissionCode(value))
        }
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.0
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// De-duplicated, validated set of permission codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCodes(BTreeSet<PermissionCode>);

impl PermissionCodes {
    /// Validate every code; the first bad one rejects the whole batch.
    pub fn parse<I, S>(raw: I) -> Result<Self, InvalidPermissionCode>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .map(|code| PermissionCode::parse(code.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.0.iter()
    }

    /// Codes as plain strings, in sorted order (for query binding).
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|c| c.as_str().to_string()).collect()
    }
}

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub code: PermissionCode,
}

/// Request to add a catalog entry.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPermission {
    #[validate(
        length(min = 1, max = 200, message = "code must be 1 to 200 characters"),
        custom(function = "validate_code_format")
    )]
    pub code: String,
}

/// Request to rename a catalog entry.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PermissionUpdate {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,
    #[validate(
        length(min = 1, max = 200, message = "code must be 1 to 200 characters"),
        custom(function = "validate_code_format")
    )]
    pub code: String,
}

fn validate_code_format(code: &str) -> Result<(), ValidationError> {
    if PermissionCode::is_valid(code) {
        Ok(())
    } else {
        Err(ValidationError::new("permission_code")
            .with_message("code must look like resource:action".into()))
    }
}

/// Whether `permissions` grants `code`.
pub fn has_code(permissions: &[Permission], code: &str) -> bool {
    permissions.iter().any(|p| p.code.as_str() == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_resource_action_codes() {
        assert!(PermissionCode::is_valid("add:movie"));
        assert!(PermissionCode::is_valid("movie:add"));
        assert!(PermissionCode::is_valid("delete:permission"));
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["AddMovie", "add_movie", "add:", ":movie", "Add:movie", "a:b:c", ""] {
            assert!(PermissionCode::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn code_set_deduplicates() {
        let codes = PermissionCodes::parse(["movie:add", "movie:view", "movie:add"]).unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes.to_strings(), vec!["movie:add", "movie:view"]);
    }

    #[test]
    fn code_set_rejects_whole_batch() {
        let err = PermissionCodes::parse(["movie:add", "bad code"]).unwrap_err();
        assert_eq!(err, InvalidPermissionCode("bad code".into()));
    }

    #[test]
    fn deserializing_validates() {
        let ok: Permission = serde_json::from_str(r#"{"id":1,"code":"movie:add"}"#).unwrap();
        assert_eq!(ok.code.as_str(), "movie:add");
        assert!(serde_json::from_str::<Permission>(r#"{"id":1,"code":"MOVIE"}"#).is_err());
    }

    #[test]
    fn new_permission_validation_messages() {
        let errors = crate::validation::validate(&NewPermission {
            code: "Movie Add".into(),
        })
        .unwrap_err();
        assert_eq!(errors["code"], "code must look like resource:action");

        let errors = crate::validation::validate(&NewPermission { code: String::new() })
            .unwrap_err();
        assert!(errors.contains_key("code"));

        assert!(crate::validation::validate(&NewPermission { code: "movie:add".into() }).is_ok());
    }

    #[test]
    fn update_requires_positive_id() {
        let errors = crate::validation::validate(&PermissionUpdate {
            id: 0,
            code: "movie:add".into(),
        })
        .unwrap_err();
        assert_eq!(errors["id"], "id must be positive");
    }

    #[test]
    fn has_code_scans_the_set() {
        let perms = vec![Permission {
            id: 1,
            code: PermissionCode::parse("movie:view").unwrap(),
        }];
        assert!(has_code(&perms, "movie:view"));
        assert!(!has_code(&perms, "movie:add"));
    }
}

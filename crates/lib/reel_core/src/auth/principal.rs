//! Request principal.

use crate::models::auth::{IdTokenClaims, User};

/// Identity fields of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Who is making the request.
///
/// Anonymity is a variant, not a sentinel value: an `Authenticated` principal
/// is never anonymous, whatever its fields hold.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated(identity) => Some(identity),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.identity().map(|i| i.id)
    }
}

impl From<IdTokenClaims> for Principal {
    fn from(claims: IdTokenClaims) -> Self {
        Principal::Authenticated(Identity {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
        })
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_anonymous() {
        assert!(Principal::Anonymous.is_anonymous());
        assert!(Principal::default().is_anonymous());
        assert_eq!(Principal::Anonymous.user_id(), None);
    }

    #[test]
    fn principal_from_claims_is_never_anonymous() {
        let principal = Principal::from(IdTokenClaims {
            sub: 0,
            name: String::new(),
            email: String::new(),
            iat: 0,
            exp: 0,
        });
        assert!(!principal.is_anonymous());
        assert_eq!(principal.user_id(), Some(0));
    }
}

use thiserror::Error;

use crate::domain::{Role, Session};

/// What a protected view demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    SignedIn,
    Role(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    RedirectToLogin,
    Denied,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AccessError {
    #[error("Please sign in to continue.")]
    Unauthenticated,
    #[error("You do not have permission to view this page.")]
    Forbidden,
}

impl Access {
    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            Access::Granted => Ok(()),
            Access::RedirectToLogin => Err(AccessError::Unauthenticated),
            Access::Denied => Err(AccessError::Forbidden),
        }
    }
}

/// Admins satisfy every role requirement.
pub fn check_access(session: Option<&Session>, requirement: Requirement) -> Access {
    let Some(session) = session else {
        return Access::RedirectToLogin;
    };

    match requirement {
        Requirement::SignedIn => Access::Granted,
        Requirement::Role(_) if session.role == Role::Admin => Access::Granted,
        Requirement::Role(role) if session.role == role => Access::Granted,
        Requirement::Role(_) => Access::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            uid: "u1".to_string(),
            email: "u1@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn anonymous_caller_is_sent_to_login() {
        assert_eq!(check_access(None, Requirement::SignedIn), Access::RedirectToLogin);
        assert_eq!(
            check_access(None, Requirement::Role(Role::Admin)),
            Access::RedirectToLogin
        );
    }

    #[test]
    fn customer_is_denied_admin_views() {
        let customer = session(Role::Customer);

        assert_eq!(
            check_access(Some(&customer), Requirement::Role(Role::Admin)),
            Access::Denied
        );
        assert_eq!(
            check_access(Some(&customer), Requirement::SignedIn),
            Access::Granted
        );
        assert_eq!(
            Access::Denied.into_result(),
            Err(AccessError::Forbidden)
        );
    }

    #[test]
    fn admin_satisfies_any_role() {
        let admin = session(Role::Admin);

        assert_eq!(
            check_access(Some(&admin), Requirement::Role(Role::Customer)),
            Access::Granted
        );
        assert_eq!(
            check_access(Some(&admin), Requirement::Role(Role::Admin)),
            Access::Granted
        );
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Customer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Customer => f.write_str("customer"),
        }
    }
}

/// Profile document kept for every account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl Document for UserData {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }
}

impl UserData {
    pub fn customer(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: Role::Customer,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&UserData> for Session {
    fn from(user: &UserData) -> Self {
        Self {
            uid: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_role_defaults_to_customer() {
        let user: UserData =
            serde_json::from_value(serde_json::json!({ "id": "u1", "email": "a@b.lk" })).unwrap();
        assert_eq!(user.role, Role::Customer);
    }

    #[test]
    fn role_serializes_lowercase() {
        let mut user = UserData::customer("u1", "a@b.lk");
        user.role = Role::Admin;

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "admin");
        assert!(Session::from(&user).is_admin());
    }
}

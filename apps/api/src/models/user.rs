use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ProjectManager,
    Staff,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ProjectManager => "project_manager",
            Role::Staff => "staff",
            Role::Client => "client",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "project_manager" => Some(Role::ProjectManager),
            "staff" => Some(Role::Staff),
            "client" => Some(Role::Client),
            _ => None,
        }
    }

    /// Admins, project managers and staff all reach the back-office.
    pub fn is_back_office(&self) -> bool {
        !matches!(self, Role::Client)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub google_sub: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Unknown role labels in storage degrade to the least privileged role.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_labels() {
        for role in [Role::Admin, Role::ProjectManager, Role::Staff, Role::Client] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_only_clients_are_outside_back_office() {
        assert!(Role::Admin.is_back_office());
        assert!(Role::ProjectManager.is_back_office());
        assert!(Role::Staff.is_back_office());
        assert!(!Role::Client.is_back_office());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = UserRow {
            id: Uuid::new_v4(),
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            role: "client".to_string(),
            password_hash: Some("$argon2id$secret".to_string()),
            google_sub: Some("sub-1".to_string()),
            phone: None,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("google_sub").is_none());
        assert_eq!(json["role"], "client");
    }
}

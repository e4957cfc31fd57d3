use serde::{Deserialize, Serialize};

/// Account role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Lenient parse used for persisted values; unknown strings fall back to `User`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Approval state of an account. New registrations start out `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Pending,
    Active,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "pending" => AccountStatus::Pending,
            _ => AccountStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub qq_number: String,
}

/// Response body shared by `/api/auth/login` and `/api/auth/register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthResponse {
    pub success: bool,
    pub token: Option<String>,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub error: Option<String>,
}

/// `/api/auth/me`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeResponse {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

/// Generic `{success, error}` body returned by admin mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_response_tolerates_failure_shape() {
        let body: AuthResponse =
            serde_json::from_value(json!({ "success": false, "error": "bad password" }))
                .unwrap();
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("bad password"));
        assert!(body.token.is_none());
    }

    #[test]
    fn auth_response_parses_roles_and_status() {
        let body: AuthResponse = serde_json::from_value(json!({
            "success": true,
            "token": "t0k",
            "username": "yui",
            "role": "admin",
            "status": "active"
        }))
        .unwrap();
        assert_eq!(body.role, Some(Role::Admin));
        assert_eq!(body.status, Some(AccountStatus::Active));
    }

    #[test]
    fn lenient_parse_defaults() {
        assert_eq!(Role::parse("superuser"), Role::User);
        assert_eq!(AccountStatus::parse(""), AccountStatus::Active);
        assert_eq!(AccountStatus::parse("pending"), AccountStatus::Pending);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Session;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Booking session for an authenticated caller. Unknown roles act as patients.
    pub fn session(&self) -> Session {
        match (self.role.as_deref(), self.doctor_id) {
            (Some("admin"), _) => Session::Admin,
            (Some("doctor"), Some(doctor_id)) => Session::Doctor(doctor_id),
            _ => Session::Patient { email: self.email.clone() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, doctor_id: Option<Uuid>) -> User {
        User {
            id: "user-1".to_string(),
            email: Some("someone@example.com".to_string()),
            role: Some(role.to_string()),
            doctor_id,
            created_at: None,
        }
    }

    #[test]
    fn test_session_from_user_role() {
        let doctor_id = Uuid::new_v4();
        assert_eq!(user("doctor", Some(doctor_id)).session(), Session::Doctor(doctor_id));
        assert_eq!(user("admin", None).session(), Session::Admin);
        assert_eq!(
            user("doctor", None).session(),
            Session::Patient { email: Some("someone@example.com".to_string()) }
        );
    }
}

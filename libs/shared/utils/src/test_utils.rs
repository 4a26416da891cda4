//! Fixtures shared by the cells' test suites.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use shared_config::{AppConfig, BookingRules};
use shared_database::{DataContext, InMemoryBookingStore};
use shared_models::auth::{JwtClaims, User};
use shared_models::booking::Doctor;

use crate::jwt::issue_token;
use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub booking_rules: BookingRules,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            booking_rules: BookingRules::default(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            bind_address: "127.0.0.1:0".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            doctor_seed_file: None,
            booking_rules: self.booking_rules.clone(),
        }
    }

    /// State backed by an empty in-memory store.
    pub fn to_state(&self) -> AppState {
        AppState::new(self.to_app_config(), DataContext::in_memory())
    }

    /// State backed by an in-memory store that already knows `doctors`.
    pub fn to_state_with(&self, doctors: Vec<Doctor>) -> AppState {
        let store = Arc::new(InMemoryBookingStore::with_doctors(doctors));
        AppState::new(self.to_app_config(), DataContext::new(store))
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub doctor_id: Option<Uuid>,
}

impl TestUser {
    pub fn new(email: &str, role: &str, doctor_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            doctor_id,
        }
    }

    pub fn doctor(doctor: &Doctor) -> Self {
        Self::new(&doctor.email, "doctor", Some(doctor.id))
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin", None)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            doctor_id: self.doctor_id,
            created_at: Some(Utc::now()),
        }
    }

    pub fn token(&self, secret: &str) -> String {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: self.id.clone(),
            exp: Some((now + Duration::hours(24)).timestamp() as u64),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            doctor_id: self.doctor_id,
            iat: Some(now.timestamp() as u64),
        };
        match issue_token(&claims, secret) {
            Ok(token) => token,
            Err(e) => panic!("failed to issue test token: {}", e),
        }
    }
}

pub struct TestDoctors;

impl TestDoctors {
    pub fn doctor(first_name: &str, last_name: &str, specialization: &str, state: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            practitioner_id: format!("DOC-{}", &last_name.to_uppercase()),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            specialization: specialization.to_string(),
            phone: "555-0100".to_string(),
            email: format!("{}.{}@hospital.com", first_name.to_lowercase(), last_name.to_lowercase()),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: state.to_string(),
            zip_code: "62701".to_string(),
        }
    }

    pub fn cardiologist() -> Doctor {
        Self::doctor("John", "Smith", "Cardiology", "IL")
    }

    pub fn dermatologist() -> Doctor {
        Self::doctor("Ana", "Lopez", "Dermatology", "CA")
    }
}

/// 2024-01-15, the reference day used across booking tests.
pub fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default()
}

/// Instant on [`test_day`] at `hour:minute` UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Rules for the booking core that depend on business policy rather than invariants.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BookingRules {
    /// Bookings against a published slot start CONFIRMED when set, PENDING otherwise.
    pub auto_confirm_availability: bool,
    pub grid_slot_minutes: i64,
    pub grid_day_start: NaiveTime,
    pub grid_day_end: NaiveTime,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            auto_confirm_availability: true,
            grid_slot_minutes: 30,
            grid_day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            grid_day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub jwt_secret: String,
    pub doctor_seed_file: Option<String>,
    pub booking_rules: BookingRules,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = BookingRules::default();

        let config = Self {
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| {
                    warn!("BIND_ADDRESS not set, using {}", DEFAULT_BIND_ADDRESS);
                    DEFAULT_BIND_ADDRESS.to_string()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            doctor_seed_file: env::var("DOCTOR_SEED_FILE").ok(),
            booking_rules: BookingRules {
                auto_confirm_availability: parse_var(
                    "BOOKING_AUTO_CONFIRM_SLOTS",
                    defaults.auto_confirm_availability,
                ),
                grid_slot_minutes: parse_var("BOOKING_GRID_SLOT_MINUTES", defaults.grid_slot_minutes),
                grid_day_start: parse_var("BOOKING_GRID_DAY_START", defaults.grid_day_start),
                grid_day_end: parse_var("BOOKING_GRID_DAY_END", defaults.grid_day_end),
            },
        };

        if !config.is_configured() {
            warn!("Application not fully configured - doctor portal authentication is disabled");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value {:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use shared_config::BookingRules;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorFilters {
    pub specialization: Option<String>,
    pub state: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSlotRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Bulk generation request; omitted fields fall back to the configured booking rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyGridRequest {
    pub date: NaiveDate,
    pub slot_minutes: Option<i64>,
    pub day_start: Option<NaiveTime>,
    pub day_end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyGrid {
    pub date: NaiveDate,
    pub slot_minutes: i64,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
}

impl DailyGridRequest {
    pub fn resolve(&self, rules: &BookingRules) -> DailyGrid {
        DailyGrid {
            date: self.date,
            slot_minutes: self.slot_minutes.unwrap_or(rules.grid_slot_minutes),
            day_start: self.day_start.unwrap_or(rules.grid_day_start),
            day_end: self.day_end.unwrap_or(rules.grid_day_end),
        }
    }
}

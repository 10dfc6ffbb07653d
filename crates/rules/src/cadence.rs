//! Cadence rules: which category goes out on which weekday, and how often.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use editorial_core::types::{Category, PostFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Weekly,
    /// Fires every other week, counting from the week containing `anchor`.
    Biweekly { anchor: NaiveDate },
}

/// One recurring publication slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceRule {
    pub id: String,
    pub weekday: Weekday,
    /// Position of the slot within the day.
    #[serde(default)]
    pub slot_index: u8,
    pub category: Category,
    /// Higher priority slots are filled first on days with several slots.
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub preferred_time: Option<NaiveTime>,
    #[serde(default)]
    pub preferred_format: Option<PostFormat>,
    /// Overrides the tenant-wide quality threshold for this slot.
    #[serde(default)]
    pub min_quality: Option<u8>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CadenceRule {
    pub fn weekly(id: impl Into<String>, weekday: Weekday, category: Category) -> Self {
        Self {
            id: id.into(),
            weekday,
            slot_index: 0,
            category,
            priority: 0,
            frequency: Frequency::Weekly,
            preferred_time: None,
            preferred_format: None,
            min_quality: None,
            active: true,
        }
    }

    pub fn fires_on(&self, date: NaiveDate) -> bool {
        if !self.active || date.weekday() != self.weekday {
            return false;
        }
        match &self.frequency {
            Frequency::Weekly => true,
            Frequency::Biweekly { anchor } => {
                let weeks = (week_start(date) - week_start(*anchor)).num_days() / 7;
                weeks.rem_euclid(2) == 0
            }
        }
    }
}

/// Monday of the ISO week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

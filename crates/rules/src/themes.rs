use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A date-bounded editorial theme (e.g. "Summer nights", "Festive season").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTheme {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub cta_focus: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub preferred_ambiances: BTreeSet<String>,
    #[serde(default)]
    pub preferred_elements: BTreeSet<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl SeasonalTheme {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.active && self.start_date <= date && date <= self.end_date
    }

    pub fn overlaps(&self, other: &SeasonalTheme) -> bool {
        self.active
            && other.active
            && self.start_date <= other.end_date
            && other.start_date <= self.end_date
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_date <= self.end_date
    }
}

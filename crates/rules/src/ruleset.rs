//! Tenant rule set: resolves the slots and the active theme for a date.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use editorial_core::types::Season;
use editorial_core::{EditorialError, EditorialResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cadence::CadenceRule;
use crate::seasons::SeasonCalendar;
use crate::themes::SeasonalTheme;

/// Read-only editorial configuration loaded at the start of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<CadenceRule>,
    #[serde(default)]
    pub themes: Vec<SeasonalTheme>,
    #[serde(default)]
    pub seasons: SeasonCalendar,
    /// Weekdays that must produce at least one slot. Empty means no day is
    /// forced to carry a post.
    #[serde(default)]
    pub covered_weekdays: Vec<Weekday>,
}

impl RuleSet {
    pub fn new(rules: Vec<CadenceRule>, themes: Vec<SeasonalTheme>) -> Self {
        Self {
            rules,
            themes,
            seasons: SeasonCalendar::default(),
            covered_weekdays: Vec::new(),
        }
    }

    /// Rules firing on `date`, by descending priority, then slot index, then id.
    pub fn resolve_slots(&self, date: NaiveDate) -> EditorialResult<Vec<&CadenceRule>> {
        let mut firing: Vec<&CadenceRule> =
            self.rules.iter().filter(|r| r.fires_on(date)).collect();

        if firing.is_empty() && self.covered_weekdays.contains(&date.weekday()) {
            return Err(EditorialError::config(format!(
                "no cadence rule covers {date} ({:?}) although the weekday is required",
                date.weekday()
            )));
        }

        let mut seen = HashSet::new();
        for rule in &firing {
            if !seen.insert(rule.slot_index) {
                return Err(EditorialError::config(format!(
                    "several rules claim slot {} on {date}",
                    rule.slot_index
                )));
            }
        }

        firing.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.slot_index.cmp(&b.slot_index))
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(%date, slots = firing.len(), "resolved slots");
        Ok(firing)
    }

    /// The single active theme covering `date`, if any.
    pub fn active_theme(&self, date: NaiveDate) -> EditorialResult<Option<&SeasonalTheme>> {
        let mut covering = self.themes.iter().filter(|t| t.covers(date));
        let first = covering.next();
        if let Some(second) = covering.next() {
            return Err(EditorialError::config(format!(
                "themes '{}' and '{}' both cover {date}",
                first.map(|t| t.id.as_str()).unwrap_or_default(),
                second.id
            )));
        }
        Ok(first)
    }

    pub fn season_for(&self, date: NaiveDate) -> Option<Season> {
        self.seasons.season_for(date)
    }

    /// Every configuration problem found, without stopping at the first one.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut ids = HashSet::new();
        for rule in &self.rules {
            if !ids.insert(rule.id.as_str()) {
                problems.push(format!("duplicate rule id '{}'", rule.id));
            }
            if let Some(q) = rule.min_quality {
                if !(1..=10).contains(&q) {
                    problems.push(format!("rule '{}' has min_quality {q} outside 1..=10", rule.id));
                }
            }
        }

        // Two consecutive weeks cover both parities of every biweekly rule.
        let Some(monday) = NaiveDate::from_ymd_opt(2024, 1, 1) else {
            return problems;
        };
        for offset in 0..14 {
            let date = monday + Duration::days(offset);
            let mut claimed = HashSet::new();
            for rule in self.rules.iter().filter(|r| r.fires_on(date)) {
                if !claimed.insert(rule.slot_index) {
                    problems.push(format!(
                        "slot {} on {:?} is claimed by more than one rule",
                        rule.slot_index,
                        date.weekday()
                    ));
                }
            }
        }
        problems.sort();
        problems.dedup();

        for theme in &self.themes {
            if !theme.is_well_formed() {
                problems.push(format!(
                    "theme '{}' ends ({}) before it starts ({})",
                    theme.id, theme.end_date, theme.start_date
                ));
            }
        }
        for (i, a) in self.themes.iter().enumerate() {
            for b in self.themes.iter().skip(i + 1) {
                if a.is_well_formed() && b.is_well_formed() && a.overlaps(b) {
                    problems.push(format!("themes '{}' and '{}' overlap", a.id, b.id));
                }
            }
        }

        for month in self.seasons.invalid_months() {
            problems.push(format!("season calendar has invalid month {month}"));
        }

        problems
    }
}

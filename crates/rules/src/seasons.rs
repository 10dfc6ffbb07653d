use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use editorial_core::types::Season;
use serde::{Deserialize, Serialize};

/// Month (1–12) to season mapping. Months left out map to no season, which
/// disables seasonal filtering for those dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonCalendar {
    months: BTreeMap<u32, Season>,
}

impl SeasonCalendar {
    pub fn northern_hemisphere() -> Self {
        let months = (1..=12)
            .map(|month| {
                let season = match month {
                    12 | 1 | 2 => Season::Winter,
                    3..=5 => Season::Spring,
                    6..=8 => Season::Summer,
                    _ => Season::Autumn,
                };
                (month, season)
            })
            .collect();
        Self { months }
    }

    pub fn southern_hemisphere() -> Self {
        let months = Self::northern_hemisphere()
            .months
            .into_iter()
            .map(|(month, season)| {
                let flipped = match season {
                    Season::Winter => Season::Summer,
                    Season::Summer => Season::Winter,
                    Season::Spring => Season::Autumn,
                    Season::Autumn => Season::Spring,
                    Season::AllSeasons => Season::AllSeasons,
                };
                (month, flipped)
            })
            .collect();
        Self { months }
    }

    /// Calendar that never maps a date to a season.
    pub fn none() -> Self {
        Self {
            months: BTreeMap::new(),
        }
    }

    pub fn season_for(&self, date: NaiveDate) -> Option<Season> {
        self.months
            .get(&date.month())
            .copied()
            .filter(|season| *season != Season::AllSeasons)
    }

    /// Month keys outside 1..=12.
    pub fn invalid_months(&self) -> Vec<u32> {
        self.months
            .keys()
            .copied()
            .filter(|m| !(1..=12).contains(m))
            .collect()
    }
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        Self::northern_hemisphere()
    }
}

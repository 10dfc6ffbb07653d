use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// One isolated deployment (a single hotel property).
    TenantId
);
string_id!(
    /// Catalog identifier of a media asset.
    AssetId
);
string_id!(
    /// Unique identifier of a performance record, used for idempotent ingestion.
    RecordId
);

// ─── Vocabularies ───────────────────────────────────────────────────────────

/// Closed vocabulary of content categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Room,
    Common,
    Exterior,
    Terrace,
    Gastronomy,
    Wellness,
    Experience,
    Destination,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Room => "room",
            Category::Common => "common",
            Category::Exterior => "exterior",
            Category::Terrace => "terrace",
            Category::Gastronomy => "gastronomy",
            Category::Wellness => "wellness",
            Category::Experience => "experience",
            Category::Destination => "destination",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seasons an asset is suitable for. `AllSeasons` is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
    AllSeasons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// Publication format of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostFormat {
    Feed,
    Story,
    Reel,
}

impl PostFormat {
    /// Aspect ratios that render well in this format.
    pub fn preferred_aspects(&self) -> &'static [&'static str] {
        match self {
            PostFormat::Feed => &["4:5", "1:1"],
            PostFormat::Story | PostFormat::Reel => &["9:16"],
        }
    }

    pub fn accepts(&self, aspect_ratio: &str) -> bool {
        self.preferred_aspects().contains(&aspect_ratio)
    }
}

// ─── Assets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Available,
    Used,
    Archived,
}

/// A tagged media record owned by the asset catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub category: Category,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub ambiance: BTreeSet<String>,
    #[serde(default)]
    pub seasons: BTreeSet<Season>,
    #[serde(default)]
    pub elements: BTreeSet<String>,
    /// Editorial quality on a 1–10 scale.
    pub quality: u8,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    pub status: AssetStatus,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
}

impl Asset {
    /// Archived assets are never scheduled.
    pub fn is_schedulable(&self) -> bool {
        !matches!(self.status, AssetStatus::Archived)
    }

    /// Whole days between the last use and `date`, or `None` if never used.
    pub fn days_since_use(&self, date: NaiveDate) -> Option<i64> {
        self.last_used_at
            .map(|at| (date - at.date_naive()).num_days())
    }

    /// True when the asset was used fewer than `window_days` days before `date`.
    pub fn used_within(&self, date: NaiveDate, window_days: u32) -> bool {
        match self.days_since_use(date) {
            Some(days) => window_days > 0 && days < i64::from(window_days),
            None => false,
        }
    }

    /// Suitable for `season` either explicitly or through the wildcard.
    pub fn fits_season(&self, season: Season) -> bool {
        self.seasons.contains(&season) || self.seasons.contains(&Season::AllSeasons)
    }
}

// ─── Entry lifecycle ────────────────────────────────────────────────────────

/// Status of a schedule entry across the planning and publication loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Planned,
    Validated,
    Scheduled,
    Published,
    Measured,
    Rejected,
}

// ─── Performance feedback ───────────────────────────────────────────────────

/// Raw engagement counters. Signed so that corrupt upstream values can be
/// detected instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub likes: i64,
    pub comments: i64,
    pub saves: i64,
    pub shares: i64,
    pub reach: i64,
    pub impressions: i64,
}

impl EngagementMetrics {
    pub fn interactions(&self) -> i64 {
        self.likes + self.comments + self.saves + self.shares
    }
}

/// Post-publication metrics for one schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub id: RecordId,
    pub entry_id: Uuid,
    pub asset_id: AssetId,
    pub published_on: NaiveDate,
    pub entry_status: EntryStatus,
    pub metrics: EngagementMetrics,
    /// Supplied by the analytics collaborator; derived from metrics if absent.
    #[serde(default)]
    pub engagement_rate: Option<f64>,
}

impl PerformanceRecord {
    /// Engagement rate as supplied, or interactions over reach.
    pub fn engagement_rate(&self) -> Option<f64> {
        match self.engagement_rate {
            Some(rate) => Some(rate),
            None if self.metrics.reach > 0 => {
                Some(self.metrics.interactions() as f64 / self.metrics.reach as f64)
            }
            None => None,
        }
    }
}

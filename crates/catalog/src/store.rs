use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use editorial_core::types::{Asset, AssetId, Category, Season, TenantId};
use editorial_core::EditorialResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Filter passed to [`AssetCatalog::find`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuery {
    pub category: Category,
    pub min_quality: u8,
    /// Accepted seasons; `None` disables seasonal filtering. The wildcard
    /// season on an asset always matches.
    pub seasons: Option<BTreeSet<Season>>,
    /// Assets used fewer than this many days before `as_of` are excluded.
    pub excluding_recent_days: u32,
    pub as_of: NaiveDate,
}

impl AssetQuery {
    /// Hard, seasonal and recency filters in one predicate.
    pub fn matches(&self, asset: &Asset) -> bool {
        if asset.category != self.category || asset.quality < self.min_quality {
            return false;
        }
        if !asset.is_schedulable() {
            return false;
        }
        if let Some(seasons) = &self.seasons {
            if !seasons.iter().any(|s| asset.fits_season(*s)) {
                return false;
            }
        }
        !asset.used_within(self.as_of, self.excluding_recent_days)
    }
}

/// Confirmation that a planned selection was actually published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub asset_id: AssetId,
    pub entry_id: Uuid,
    /// Usage count observed when the asset was selected.
    pub expected_usage_count: u32,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub asset_id: AssetId,
    pub entry_id: Uuid,
    pub usage_count: u32,
    /// True when the entry had already been committed and nothing changed.
    pub replayed: bool,
}

/// Tenant-scoped read access plus the single usage-mutating operation.
pub trait AssetCatalog: Send + Sync {
    /// Assets matching `query`, ordered by asset id.
    fn find(&self, tenant: &TenantId, query: &AssetQuery) -> EditorialResult<Vec<Asset>>;

    fn get(&self, tenant: &TenantId, asset_id: &AssetId) -> EditorialResult<Option<Asset>>;

    /// Increment usage exactly once per entry. Concurrent commits on the same
    /// asset version have a single winner; losers get `AlreadyCommitted`.
    /// An entry already committed with another asset gets
    /// `SlotAlreadyCommitted`.
    fn commit_selection(
        &self,
        tenant: &TenantId,
        request: &CommitRequest,
    ) -> EditorialResult<CommitReceipt>;
}

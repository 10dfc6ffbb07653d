//! In-process catalog backed by DashMap, one lock per tenant.

use std::collections::{BTreeMap, HashMap};

use dashmap::DashMap;
use editorial_core::types::{Asset, AssetId, AssetStatus, TenantId};
use editorial_core::{EditorialError, EditorialResult};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::{AssetCatalog, AssetQuery, CommitReceipt, CommitRequest};

#[derive(Debug, Default)]
struct TenantCatalog {
    assets: BTreeMap<AssetId, Asset>,
    commits: HashMap<Uuid, CommitReceipt>,
}

/// Tenant-partitioned asset store. Reads share a lock; commits take it
/// exclusively so usage increments for one tenant are serialized.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tenants: DashMap<TenantId, RwLock<TenantCatalog>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }

    /// Insert or replace an asset for a tenant.
    pub fn upsert(&self, tenant: &TenantId, asset: Asset) {
        debug!(tenant_id = %tenant, asset_id = %asset.id, "upserting asset");
        self.tenants
            .entry(tenant.clone())
            .or_default()
            .write()
            .assets
            .insert(asset.id.clone(), asset);
    }

    pub fn upsert_many(&self, tenant: &TenantId, assets: impl IntoIterator<Item = Asset>) {
        let entry = self.tenants.entry(tenant.clone()).or_default();
        let mut catalog = entry.write();
        let mut count = 0usize;
        for asset in assets {
            catalog.assets.insert(asset.id.clone(), asset);
            count += 1;
        }
        info!(tenant_id = %tenant, count, "loaded assets into catalog");
    }

    /// Retire an asset from scheduling. Returns false if it does not exist.
    pub fn archive(&self, tenant: &TenantId, asset_id: &AssetId) -> bool {
        let Some(entry) = self.tenants.get(tenant) else {
            return false;
        };
        let mut catalog = entry.write();
        match catalog.assets.get_mut(asset_id) {
            Some(asset) => {
                asset.status = AssetStatus::Archived;
                info!(tenant_id = %tenant, %asset_id, "asset archived");
                true
            }
            None => false,
        }
    }

    /// All assets of a tenant, ordered by id.
    pub fn snapshot(&self, tenant: &TenantId) -> Vec<Asset> {
        self.tenants
            .get(tenant)
            .map(|entry| {
                let catalog = entry.read();
                catalog.assets.values().cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, tenant: &TenantId) -> usize {
        self.tenants
            .get(tenant)
            .map(|entry| {
                let catalog = entry.read();
                catalog.assets.len()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self, tenant: &TenantId) -> bool {
        self.len(tenant) == 0
    }
}

impl AssetCatalog for InMemoryCatalog {
    fn find(&self, tenant: &TenantId, query: &AssetQuery) -> EditorialResult<Vec<Asset>> {
        let Some(entry) = self.tenants.get(tenant) else {
            return Ok(Vec::new());
        };
        let catalog = entry.read();
        let matching = catalog
            .assets
            .values()
            .filter(|asset| query.matches(asset))
            .cloned()
            .collect();
        Ok(matching)
    }

    fn get(&self, tenant: &TenantId, asset_id: &AssetId) -> EditorialResult<Option<Asset>> {
        let Some(entry) = self.tenants.get(tenant) else {
            return Ok(None);
        };
        let catalog = entry.read();
        let asset = catalog.assets.get(asset_id).cloned();
        Ok(asset)
    }

    fn commit_selection(
        &self,
        tenant: &TenantId,
        request: &CommitRequest,
    ) -> EditorialResult<CommitReceipt> {
        let entry = self
            .tenants
            .get(tenant)
            .ok_or_else(|| EditorialError::NotFound(format!("tenant {tenant}")))?;
        let mut catalog = entry.write();

        if let Some(previous) = catalog.commits.get(&request.entry_id) {
            if previous.asset_id == request.asset_id {
                debug!(
                    tenant_id = %tenant,
                    entry_id = %request.entry_id,
                    "commit replayed, usage unchanged"
                );
                return Ok(CommitReceipt {
                    replayed: true,
                    ..previous.clone()
                });
            }
            warn!(
                tenant_id = %tenant,
                entry_id = %request.entry_id,
                committed = %previous.asset_id,
                requested = %request.asset_id,
                "entry already committed with a different asset"
            );
            return Err(EditorialError::SlotAlreadyCommitted {
                entry_id: request.entry_id,
                committed: previous.asset_id.clone(),
            });
        }

        let asset = catalog
            .assets
            .get_mut(&request.asset_id)
            .ok_or_else(|| EditorialError::NotFound(format!("asset {}", request.asset_id)))?;

        if !asset.is_schedulable() {
            return Err(EditorialError::NotFound(format!(
                "asset {} is archived",
                request.asset_id
            )));
        }

        if asset.usage_count != request.expected_usage_count {
            metrics::counter!("catalog.commit_conflicts").increment(1);
            warn!(
                tenant_id = %tenant,
                asset_id = %request.asset_id,
                expected = request.expected_usage_count,
                actual = asset.usage_count,
                "commit lost to a concurrent selection"
            );
            return Err(EditorialError::AlreadyCommitted {
                asset_id: request.asset_id.clone(),
            });
        }

        asset.usage_count += 1;
        asset.last_used_at = Some(match asset.last_used_at {
            Some(previous) if previous > request.used_at => previous,
            _ => request.used_at,
        });
        asset.status = AssetStatus::Used;

        let receipt = CommitReceipt {
            asset_id: request.asset_id.clone(),
            entry_id: request.entry_id,
            usage_count: asset.usage_count,
            replayed: false,
        };
        catalog.commits.insert(request.entry_id, receipt.clone());

        metrics::counter!("catalog.commits").increment(1);
        info!(
            tenant_id = %tenant,
            asset_id = %receipt.asset_id,
            entry_id = %receipt.entry_id,
            usage_count = receipt.usage_count,
            "selection committed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use editorial_core::types::{Category, MediaType, Season};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn asset(id: &str, quality: u8, status: AssetStatus) -> Asset {
        Asset {
            id: AssetId::new(id),
            category: Category::Terrace,
            subcategory: String::new(),
            ambiance: BTreeSet::new(),
            seasons: [Season::AllSeasons].into_iter().collect(),
            elements: BTreeSet::new(),
            quality,
            usage_count: 0,
            last_used_at: None,
            status,
            aspect_ratio: None,
            media_type: MediaType::Image,
        }
    }

    fn query() -> AssetQuery {
        AssetQuery {
            category: Category::Terrace,
            min_quality: 7,
            seasons: None,
            excluding_recent_days: 30,
            as_of: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        }
    }

    fn request(asset_id: &str, expected: u32) -> CommitRequest {
        CommitRequest {
            asset_id: AssetId::new(asset_id),
            entry_id: Uuid::new_v4(),
            expected_usage_count: expected,
            used_at: Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_find_applies_hard_filters() {
        let catalog = InMemoryCatalog::new();
        let tenant = TenantId::new("hotel-a");
        catalog.upsert_many(
            &tenant,
            vec![
                asset("a", 9, AssetStatus::Available),
                asset("b", 6, AssetStatus::Available),
                asset("c", 8, AssetStatus::Archived),
                asset("d", 7, AssetStatus::Used),
            ],
        );

        let found = catalog.find(&tenant, &query()).unwrap();
        let ids: Vec<_> = found.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let catalog = InMemoryCatalog::new();
        let a = TenantId::new("hotel-a");
        let b = TenantId::new("hotel-b");
        catalog.upsert(&a, asset("x", 9, AssetStatus::Available));

        assert_eq!(catalog.find(&a, &query()).unwrap().len(), 1);
        assert!(catalog.find(&b, &query()).unwrap().is_empty());
        assert!(catalog.get(&b, &AssetId::new("x")).unwrap().is_none());
        assert!(catalog.commit_selection(&b, &request("x", 0)).is_err());
    }

    #[test]
    fn test_commit_increments_once_and_replays() {
        let catalog = InMemoryCatalog::new();
        let tenant = TenantId::new("hotel-a");
        catalog.upsert(&tenant, asset("a", 9, AssetStatus::Available));

        let req = request("a", 0);
        let first = catalog.commit_selection(&tenant, &req).unwrap();
        assert_eq!(first.usage_count, 1);
        assert!(!first.replayed);

        let again = catalog.commit_selection(&tenant, &req).unwrap();
        assert!(again.replayed);
        assert_eq!(again.usage_count, 1);

        let stored = catalog.get(&tenant, &AssetId::new("a")).unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
        assert_eq!(stored.status, AssetStatus::Used);
        assert_eq!(stored.last_used_at, Some(req.used_at));
    }

    #[test]
    fn test_stale_commit_is_rejected() {
        let catalog = InMemoryCatalog::new();
        let tenant = TenantId::new("hotel-a");
        catalog.upsert(&tenant, asset("a", 9, AssetStatus::Available));

        catalog.commit_selection(&tenant, &request("a", 0)).unwrap();
        let err = catalog.commit_selection(&tenant, &request("a", 0)).unwrap_err();
        assert!(matches!(err, EditorialError::AlreadyCommitted { .. }));
    }

    #[test]
    fn test_entry_keeps_its_first_asset() {
        let catalog = InMemoryCatalog::new();
        let tenant = TenantId::new("hotel-a");
        catalog.upsert(&tenant, asset("a", 9, AssetStatus::Available));
        catalog.upsert(&tenant, asset("b", 8, AssetStatus::Available));

        let first = request("a", 0);
        catalog.commit_selection(&tenant, &first).unwrap();

        let swapped = CommitRequest {
            asset_id: AssetId::new("b"),
            ..first.clone()
        };
        let err = catalog.commit_selection(&tenant, &swapped).unwrap_err();
        assert!(matches!(
            err,
            EditorialError::SlotAlreadyCommitted { ref committed, .. } if committed.as_str() == "a"
        ));
        let b = catalog.get(&tenant, &AssetId::new("b")).unwrap().unwrap();
        assert_eq!(b.usage_count, 0);
    }

    #[test]
    fn test_concurrent_commits_have_one_winner() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let tenant = TenantId::new("hotel-a");
        catalog.upsert(&tenant, asset("a", 9, AssetStatus::Available));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = catalog.clone();
                let tenant = tenant.clone();
                std::thread::spawn(move || catalog.commit_selection(&tenant, &request("a", 0)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();
        assert_eq!(winners, 1);
        let stored = catalog.get(&tenant, &AssetId::new("a")).unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
    }

    #[test]
    fn test_archived_asset_cannot_be_committed() {
        let catalog = InMemoryCatalog::new();
        let tenant = TenantId::new("hotel-a");
        catalog.upsert(&tenant, asset("a", 9, AssetStatus::Available));
        assert!(catalog.archive(&tenant, &AssetId::new("a")));
        assert!(catalog.commit_selection(&tenant, &request("a", 0)).is_err());
        assert!(catalog.find(&tenant, &query()).unwrap().is_empty());
    }
}

//! Learned score weights: a tenant-scoped, versioned key/value store of
//! additive bonuses keyed by (category, ambiance, element).

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use dashmap::DashMap;
use editorial_core::types::{Asset, Category, RecordId, TenantId};
use editorial_core::{EditorialError, EditorialResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

const WILDCARD: &str = "*";

/// One weight dimension. A missing ambiance or element is stored as `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeightKey {
    pub category: Category,
    pub ambiance: Option<String>,
    pub element: Option<String>,
}

impl WeightKey {
    pub fn new(category: Category, ambiance: Option<&str>, element: Option<&str>) -> Self {
        Self {
            category,
            ambiance: ambiance.map(str::to_string),
            element: element.map(str::to_string),
        }
    }

    /// Every (category, ambiance, element) tuple describing an asset.
    pub fn for_asset(asset: &Asset) -> Vec<WeightKey> {
        let ambiances: Vec<Option<&str>> = if asset.ambiance.is_empty() {
            vec![None]
        } else {
            asset.ambiance.iter().map(|a| Some(a.as_str())).collect()
        };
        let elements: Vec<Option<&str>> = if asset.elements.is_empty() {
            vec![None]
        } else {
            asset.elements.iter().map(|e| Some(e.as_str())).collect()
        };

        ambiances
            .iter()
            .flat_map(|a| {
                elements
                    .iter()
                    .map(move |e| WeightKey::new(asset.category, *a, *e))
            })
            .collect()
    }
}

impl fmt::Display for WeightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.category,
            self.ambiance.as_deref().unwrap_or(WILDCARD),
            self.element.as_deref().unwrap_or(WILDCARD)
        )
    }
}

/// One persisted weight. Tags are free-form, so keys are written as fields
/// rather than a joined string.
#[derive(Serialize, Deserialize)]
struct WeightRecord {
    category: Category,
    #[serde(default)]
    ambiance: Option<String>,
    #[serde(default)]
    element: Option<String>,
    value: f64,
}

mod weight_entries {
    use super::{WeightKey, WeightRecord};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        entries: &BTreeMap<WeightKey, f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        entries
            .iter()
            .map(|(key, value)| WeightRecord {
                category: key.category,
                ambiance: key.ambiance.clone(),
                element: key.element.clone(),
                value: *value,
            })
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<WeightKey, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<WeightRecord>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for record in records {
            let key = WeightKey {
                category: record.category,
                ambiance: record.ambiance,
                element: record.element,
            };
            if entries.insert(key.clone(), record.value).is_some() {
                return Err(serde::de::Error::custom(format!("duplicate weight key {key}")));
            }
        }
        Ok(entries)
    }
}

/// Ingested performance record, kept for idempotency and the trailing average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub published_on: NaiveDate,
    pub category: Category,
    pub engagement_rate: f64,
}

/// Learned state of one tenant at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub tenant_id: TenantId,
    #[serde(default)]
    pub version: u64,
    #[serde(default, with = "weight_entries")]
    pub entries: BTreeMap<WeightKey, f64>,
    #[serde(default)]
    pub ledger: BTreeMap<RecordId, LedgerEntry>,
}

impl ScoreWeights {
    pub fn empty(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            version: 0,
            entries: BTreeMap::new(),
            ledger: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &WeightKey) -> f64 {
        self.entries.get(key).copied().unwrap_or(0.0)
    }

    /// Sum of the weights matching the asset's tuples.
    pub fn learned_bonus(&self, asset: &Asset) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        WeightKey::for_asset(asset)
            .iter()
            .map(|key| self.get(key))
            .sum()
    }

    /// Add `delta` to `key`, keeping the cumulative value inside `[min, max]`.
    pub fn adjust(&mut self, key: WeightKey, delta: f64, min: f64, max: f64) -> f64 {
        let value = self.entries.entry(key).or_insert(0.0);
        *value = (*value + delta).clamp(min, max);
        *value
    }

    pub fn has_record(&self, id: &RecordId) -> bool {
        self.ledger.contains_key(id)
    }
}

/// Tenant-scoped persistence for [`ScoreWeights`] with optimistic versioning.
pub trait WeightsStore: Send + Sync {
    /// Current weights, or an empty set at version 0.
    fn load(&self, tenant: &TenantId) -> EditorialResult<ScoreWeights>;

    /// Persist `weights` if its version still matches the stored one.
    /// Returns the new version; fails with `StaleWeights` otherwise.
    fn store(&self, weights: ScoreWeights) -> EditorialResult<u64>;
}

#[derive(Debug, Default)]
pub struct InMemoryWeightsStore {
    tenants: DashMap<TenantId, ScoreWeights>,
}

impl InMemoryWeightsStore {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }

    /// Replace a tenant's weights wholesale, e.g. when restoring from disk.
    pub fn restore(&self, weights: ScoreWeights) {
        debug!(tenant_id = %weights.tenant_id, version = weights.version, "restoring weights");
        self.tenants.insert(weights.tenant_id.clone(), weights);
    }
}

impl WeightsStore for InMemoryWeightsStore {
    fn load(&self, tenant: &TenantId) -> EditorialResult<ScoreWeights> {
        Ok(self
            .tenants
            .get(tenant)
            .map(|w| w.value().clone())
            .unwrap_or_else(|| ScoreWeights::empty(tenant.clone())))
    }

    fn store(&self, mut weights: ScoreWeights) -> EditorialResult<u64> {
        let mut entry = self
            .tenants
            .entry(weights.tenant_id.clone())
            .or_insert_with(|| ScoreWeights::empty(weights.tenant_id.clone()));

        if entry.version != weights.version {
            return Err(EditorialError::StaleWeights {
                tenant_id: weights.tenant_id.clone(),
                expected: weights.version,
                actual: entry.version,
            });
        }

        weights.version += 1;
        let version = weights.version;
        *entry = weights;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editorial_core::types::{AssetId, AssetStatus, MediaType};
    use std::collections::BTreeSet;

    fn asset(ambiance: &[&str], elements: &[&str]) -> Asset {
        Asset {
            id: AssetId::new("a"),
            category: Category::Destination,
            subcategory: String::new(),
            ambiance: ambiance.iter().map(|s| s.to_string()).collect(),
            seasons: BTreeSet::new(),
            elements: elements.iter().map(|s| s.to_string()).collect(),
            quality: 8,
            usage_count: 0,
            last_used_at: None,
            status: AssetStatus::Available,
            aspect_ratio: None,
            media_type: MediaType::Image,
        }
    }

    #[test]
    fn test_keys_cover_all_tuples() {
        let keys = WeightKey::for_asset(&asset(&["sunny", "calm"], &["sea", "boat"]));
        assert_eq!(keys.len(), 4);

        let keys = WeightKey::for_asset(&asset(&[], &["sea"]));
        assert_eq!(
            keys,
            vec![WeightKey::new(Category::Destination, None, Some("sea"))]
        );
    }

    #[test]
    fn test_key_display() {
        let key = WeightKey::new(Category::Terrace, Some("sunset"), None);
        assert_eq!(key.to_string(), "terrace/sunset/*");
    }

    #[test]
    fn test_adjust_clamps() {
        let mut weights = ScoreWeights::empty(TenantId::new("t"));
        let key = WeightKey::new(Category::Room, Some("cozy"), Some("bed"));
        assert_eq!(weights.adjust(key.clone(), 0.75, -1.0, 1.0), 0.75);
        assert_eq!(weights.adjust(key.clone(), 0.75, -1.0, 1.0), 1.0);
        assert_eq!(weights.adjust(key.clone(), -3.0, -1.0, 1.0), -1.0);
    }

    #[test]
    fn test_learned_bonus_sums_matching_keys() {
        let mut weights = ScoreWeights::empty(TenantId::new("t"));
        let a = asset(&["sunny"], &["sea", "boat"]);
        let sunny = |category, element| WeightKey::new(category, Some("sunny"), Some(element));
        weights.adjust(sunny(Category::Destination, "sea"), 0.5, -5.0, 5.0);
        weights.adjust(sunny(Category::Destination, "boat"), 0.25, -5.0, 5.0);
        weights.adjust(sunny(Category::Room, "sea"), 3.0, -5.0, 5.0);
        assert_eq!(weights.learned_bonus(&a), 0.75);
    }

    #[test]
    fn test_store_is_versioned_and_tenant_scoped() {
        let store = InMemoryWeightsStore::new();
        let a = TenantId::new("hotel-a");
        let b = TenantId::new("hotel-b");

        let mut weights = store.load(&a).unwrap();
        weights.adjust(WeightKey::new(Category::Room, None, None), 1.0, -5.0, 5.0);
        assert_eq!(store.store(weights.clone()).unwrap(), 1);

        // Writing again from the same base version loses.
        assert!(matches!(
            store.store(weights),
            Err(EditorialError::StaleWeights { expected: 0, actual: 1, .. })
        ));

        assert_eq!(store.load(&a).unwrap().version, 1);
        let other = store.load(&b).unwrap();
        assert_eq!(other.version, 0);
        assert!(other.entries.is_empty());
    }

    #[test]
    fn test_weights_json_round_trip() {
        let mut weights = ScoreWeights::empty(TenantId::new("t"));
        let pool = WeightKey::new(Category::Terrace, Some("sunset"), Some("pool"));
        weights.adjust(pool, 0.5, -5.0, 5.0);
        let json = serde_json::to_string(&weights).unwrap();
        assert!(json.contains(r#""ambiance":"sunset""#));
        let back: ScoreWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(back, weights);
    }

    #[test]
    fn test_free_form_tags_survive_persistence() {
        let mut weights = ScoreWeights::empty(TenantId::new("t"));
        let slashed = WeightKey::new(Category::Room, Some("indoor/outdoor"), Some("bed"));
        let starred = WeightKey::new(Category::Room, Some("*"), None);
        let wildcard = WeightKey::new(Category::Room, None, None);
        weights.adjust(slashed.clone(), 0.5, -5.0, 5.0);
        weights.adjust(starred.clone(), 0.25, -5.0, 5.0);
        weights.adjust(wildcard.clone(), -0.5, -5.0, 5.0);

        let back: ScoreWeights =
            serde_json::from_str(&serde_json::to_string(&weights).unwrap()).unwrap();
        assert_eq!(back, weights);
        assert_eq!(back.entries.len(), 3);
        assert_eq!(back.get(&slashed), 0.5);
        assert_eq!(back.get(&starred), 0.25);
        assert_eq!(back.get(&wildcard), -0.5);
    }

    #[test]
    fn test_duplicate_persisted_key_is_rejected() {
        let json = r#"{
            "tenant_id": "t",
            "entries": [
                {"category": "room", "ambiance": "cozy", "value": 0.5},
                {"category": "room", "ambiance": "cozy", "element": null, "value": 0.1}
            ]
        }"#;
        assert!(serde_json::from_str::<ScoreWeights>(json).is_err());
    }
}

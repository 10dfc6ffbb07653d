//! Tenant bundle files and on-disk weights.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use editorial_core::tenant::TenantOverrides;
use editorial_core::types::{Asset, AssetId, PerformanceRecord, TenantId};
use editorial_feedback::ScoreWeights;
use editorial_rules::RuleSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A `(date, slot_index)` already present in the tenant's published plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExistingSlot {
    pub date: NaiveDate,
    pub slot_index: u8,
}

/// Everything one tenant run needs, read from a single JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantBundle {
    pub tenant_id: TenantId,
    #[serde(default)]
    pub overrides: TenantOverrides,
    #[serde(default)]
    pub rules: RuleSet,
    #[serde(default)]
    pub assets: Vec<Asset>,
    /// Performance feed consumed by `ingest`.
    #[serde(default)]
    pub records: Vec<PerformanceRecord>,
    #[serde(default)]
    pub existing_slots: Vec<ExistingSlot>,
    /// Assets held by entries planned outside this run.
    #[serde(default)]
    pub planned_assets: Vec<AssetId>,
}

impl TenantBundle {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading tenant bundle {}", path.display()))?;
        let bundle: TenantBundle = serde_json::from_str(&raw)
            .with_context(|| format!("parsing tenant bundle {}", path.display()))?;
        debug!(
            tenant_id = %bundle.tenant_id,
            assets = bundle.assets.len(),
            rules = bundle.rules.rules.len(),
            records = bundle.records.len(),
            "tenant bundle loaded"
        );
        Ok(bundle)
    }
}

fn weights_path(dir: &Path, tenant: &TenantId) -> PathBuf {
    dir.join(format!("{tenant}.weights.json"))
}

/// Previously learned weights for `tenant`, if any were saved.
pub fn load_weights(dir: Option<&Path>, tenant: &TenantId) -> Result<Option<ScoreWeights>> {
    let Some(dir) = dir else {
        return Ok(None);
    };
    let path = weights_path(dir, tenant);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading weights {}", path.display()))?;
    let weights: ScoreWeights = serde_json::from_str(&raw)
        .with_context(|| format!("parsing weights {}", path.display()))?;
    anyhow::ensure!(
        &weights.tenant_id == tenant,
        "weights file {} belongs to tenant {}",
        path.display(),
        weights.tenant_id
    );
    Ok(Some(weights))
}

pub fn save_weights(dir: &Path, weights: &ScoreWeights) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = weights_path(dir, &weights.tenant_id);
    fs::write(&path, serde_json::to_vec_pretty(weights)?)
        .with_context(|| format!("writing weights {}", path.display()))?;
    Ok(path)
}

/// Write `value` as pretty JSON to `dir/name`, or to stdout without a directory.
pub fn emit<T: Serialize>(dir: Option<&Path>, name: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match dir {
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            let path = dir.join(name);
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use editorial_feedback::WeightKey;
    use editorial_core::types::Category;
    use serde_json::json;

    #[test]
    fn test_minimal_bundle_parses() {
        let bundle: TenantBundle = serde_json::from_value(json!({
            "tenant_id": "hotel-riviera",
            "rules": {
                "rules": [{"id": "mon-room", "weekday": "Mon", "category": "room"}],
                "covered_weekdays": ["Mon"]
            },
            "assets": [{
                "id": "room-1", "category": "room", "quality": 8, "status": "available"
            }],
            "existing_slots": [{"date": "2026-07-06", "slot_index": 0}]
        }))
        .unwrap();

        assert_eq!(bundle.tenant_id.as_str(), "hotel-riviera");
        assert_eq!(bundle.rules.rules.len(), 1);
        assert!(bundle.overrides.selection.is_none());
        assert!(bundle.records.is_empty());
        assert_eq!(bundle.existing_slots[0].slot_index, 0);
    }

    #[test]
    fn test_weights_round_trip_on_disk() {
        let dir = std::env::temp_dir().join(format!("editorial-express-{}", std::process::id()));
        let tenant = TenantId::new("hotel-riviera");
        assert!(load_weights(Some(&dir), &tenant).unwrap().is_none());

        let mut weights = ScoreWeights::empty(tenant.clone());
        weights.version = 3;
        weights.adjust(WeightKey::new(Category::Room, Some("cozy"), None), 0.5, -5.0, 5.0);
        save_weights(&dir, &weights).unwrap();

        assert_eq!(load_weights(Some(&dir), &tenant).unwrap(), Some(weights));
        assert!(load_weights(None, &tenant).unwrap().is_none());
        fs::remove_dir_all(&dir).unwrap();
    }
}

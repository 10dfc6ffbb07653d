use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use editorial_core::types::{AssetId, Category, EntryStatus, PostFormat, Season, TenantId};
use editorial_core::CancelFlag;
use editorial_rules::{CadenceRule, SeasonalTheme};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ─── Slots ──────────────────────────────────────────────────────────────────

/// Theme fields carried into the plan for the caption collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeContext {
    pub id: String,
    pub name: String,
    pub mood: String,
    pub cta_focus: String,
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub preferred_ambiances: BTreeSet<String>,
    #[serde(default)]
    pub preferred_elements: BTreeSet<String>,
}

impl From<&SeasonalTheme> for ThemeContext {
    fn from(theme: &SeasonalTheme) -> Self {
        Self {
            id: theme.id.clone(),
            name: theme.name.clone(),
            mood: theme.mood.clone(),
            cta_focus: theme.cta_focus.clone(),
            hashtags: theme.hashtags.clone(),
            preferred_ambiances: theme.preferred_ambiances.clone(),
            preferred_elements: theme.preferred_elements.clone(),
        }
    }
}

/// A single scheduling opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub category: Category,
    pub slot_index: u8,
    pub rule_id: String,
    pub priority: u32,
    /// Effective quality threshold: the rule override or the tenant default.
    pub min_quality: u8,
    pub preferred_time: Option<NaiveTime>,
    pub preferred_format: Option<PostFormat>,
    pub theme: Option<ThemeContext>,
}

impl Slot {
    pub fn from_rule(
        date: NaiveDate,
        rule: &CadenceRule,
        theme: Option<&SeasonalTheme>,
        default_min_quality: u8,
    ) -> Self {
        Self {
            date,
            category: rule.category,
            slot_index: rule.slot_index,
            rule_id: rule.id.clone(),
            priority: rule.priority,
            min_quality: rule.min_quality.unwrap_or(default_min_quality),
            preferred_time: rule.preferred_time,
            preferred_format: rule.preferred_format,
            theme: theme.map(ThemeContext::from),
        }
    }
}

// ─── Selection rationale ────────────────────────────────────────────────────

/// Weighted contribution of every scoring term.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub quality: f64,
    pub usage: f64,
    pub learned: f64,
    pub theme: f64,
    pub season: f64,
    pub format: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.quality + self.usage + self.learned + self.theme + self.season + self.format
    }
}

/// Runner-up kept for a manual swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub asset_id: AssetId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRationale {
    pub breakdown: ScoreBreakdown,
    /// Cool-down window that produced the candidate pool.
    pub cooldown_days_applied: u32,
    /// True when the nominal cool-down had to be relaxed.
    pub relaxed: bool,
    pub candidates_considered: usize,
    pub alternatives: Vec<Alternative>,
    pub weights_version: u64,
}

// ─── Schedule ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub slot: Slot,
    pub asset_id: AssetId,
    /// Usage count observed at selection, checked again at commit.
    pub expected_usage_count: u32,
    pub score: f64,
    pub rationale: SelectionRationale,
    pub season: Option<Season>,
    pub status: EntryStatus,
}

impl ScheduleEntry {
    /// Stable id of the entry occupying `(date, slot_index)` for a tenant.
    pub fn entry_id(tenant: &TenantId, date: NaiveDate, slot_index: u8) -> Uuid {
        Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("editorial-express/{tenant}/{date}/{slot_index}").as_bytes(),
        )
    }

    pub fn theme_id(&self) -> Option<&str> {
        self.slot.theme.as_ref().map(|t| t.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnfilledReason {
    /// No asset survived filtering, even at the last cool-down tier.
    NoCandidate { category: Category, min_quality: u8 },
    /// The date's rules or themes are misconfigured.
    Configuration { message: String },
}

impl fmt::Display for UnfilledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnfilledReason::NoCandidate {
                category,
                min_quality,
            } => write!(f, "no {category} asset with quality >= {min_quality}"),
            UnfilledReason::Configuration { message } => write!(f, "{message}"),
        }
    }
}

/// A slot (or a whole date, when its configuration failed) left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfilledSlot {
    pub date: NaiveDate,
    pub slot_index: Option<u8>,
    pub category: Option<Category>,
    pub reason: UnfilledReason,
}

/// Returned alongside the successful entries whenever a build left gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialScheduleWarning {
    pub unfilled: Vec<UnfilledSlot>,
}

impl fmt::Display for PartialScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} slot(s) could not be filled", self.unfilled.len())?;
        for slot in &self.unfilled {
            write!(f, "; {}", slot.date)?;
            if let Some(index) = slot.slot_index {
                write!(f, "#{index}")?;
            }
            write!(f, ": {}", slot.reason)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub tenant_id: TenantId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub entries: Vec<ScheduleEntry>,
    pub unfilled: Vec<UnfilledSlot>,
    /// Existing `(date, slot_index)` keys left untouched.
    pub skipped_existing: usize,
    pub weights_version: u64,
    pub cancelled: bool,
}

impl ScheduleOutcome {
    pub fn warning(&self) -> Option<PartialScheduleWarning> {
        (!self.unfilled.is_empty()).then(|| PartialScheduleWarning {
            unfilled: self.unfilled.clone(),
        })
    }

    /// SHA-256 over the ordered (entry, asset, score) triples. Two builds over
    /// identical inputs produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.id.as_bytes());
            hasher.update(entry.asset_id.as_str().as_bytes());
            hasher.update(entry.score.to_bits().to_be_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.entries.iter().map(|e| &e.asset_id)
    }
}

/// Optional knobs for one `build` call.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Assets already planned elsewhere.
    pub exclude: HashSet<AssetId>,
    /// `(date, slot_index)` keys already present in the tenant's plan.
    pub existing: HashSet<(NaiveDate, u8)>,
    pub overwrite: bool,
    /// Overrides the tenant's configured number of runner-ups.
    pub alternatives: Option<usize>,
    pub cancel: CancelFlag,
}

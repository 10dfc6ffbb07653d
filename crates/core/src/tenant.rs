//! Explicit tenant context threaded through every catalog, rule and weights call.

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, CommitConfig, FeedbackConfig, SelectionConfig};
use crate::error::EditorialResult;
use crate::types::TenantId;

/// Per-tenant overrides. Missing sections fall back to the application defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantOverrides {
    #[serde(default)]
    pub selection: Option<SelectionConfig>,
    #[serde(default)]
    pub feedback: Option<FeedbackConfig>,
    #[serde(default)]
    pub commit: Option<CommitConfig>,
}

/// Identity and effective configuration of one tenant for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub selection: SelectionConfig,
    pub feedback: FeedbackConfig,
    pub commit: CommitConfig,
}

impl TenantContext {
    /// Context using the application defaults unchanged.
    pub fn new(tenant_id: TenantId, app: &AppConfig) -> Self {
        Self {
            tenant_id,
            selection: app.selection.clone(),
            feedback: app.feedback.clone(),
            commit: app.commit.clone(),
        }
    }

    /// Context with tenant overrides applied, validated before use.
    pub fn with_overrides(
        tenant_id: TenantId,
        app: &AppConfig,
        overrides: TenantOverrides,
    ) -> EditorialResult<Self> {
        let context = Self {
            tenant_id,
            selection: overrides.selection.unwrap_or_else(|| app.selection.clone()),
            feedback: overrides.feedback.unwrap_or_else(|| app.feedback.clone()),
            commit: overrides.commit.unwrap_or_else(|| app.commit.clone()),
        };
        context.selection.validate()?;
        context.feedback.validate()?;
        Ok(context)
    }

    /// Context with default configuration, mostly for tests and tooling.
    pub fn with_defaults(tenant_id: impl Into<String>) -> Self {
        Self::new(TenantId::new(tenant_id), &AppConfig::default())
    }
}

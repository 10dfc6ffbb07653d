use thiserror::Error;

use crate::types::{AssetId, EntryStatus, RecordId, TenantId};

pub type EditorialResult<T> = Result<T, EditorialError>;

#[derive(Error, Debug)]
pub enum EditorialError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Asset {asset_id} was already committed by another selection")]
    AlreadyCommitted { asset_id: AssetId },

    #[error("Entry {entry_id} is already committed with asset {committed}")]
    SlotAlreadyCommitted {
        entry_id: uuid::Uuid,
        committed: AssetId,
    },

    #[error("Out-of-range feedback in record {record_id}: {reason}")]
    OutOfRangeAdjustment { record_id: RecordId, reason: String },

    #[error("Stale weights for tenant {tenant_id}: expected version {expected}, found {actual}")]
    StaleWeights {
        tenant_id: TenantId,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid entry transition from {from:?} to {to:?}")]
    InvalidTransition { from: EntryStatus, to: EntryStatus },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EditorialError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for errors that only invalidate the date or slot being processed.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::AlreadyCommitted { .. }
                | Self::SlotAlreadyCommitted { .. }
                | Self::OutOfRangeAdjustment { .. }
        )
    }
}

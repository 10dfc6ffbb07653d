//! Asset catalog boundary: tenant-scoped queries over tagged media and the
//! idempotent usage commit that follows external publication.

pub mod memory;
pub mod store;

pub use memory::InMemoryCatalog;
pub use store::{AssetCatalog, AssetQuery, CommitReceipt, CommitRequest};

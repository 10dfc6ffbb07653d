pub mod cancel;
pub mod config;
pub mod error;
pub mod tenant;
pub mod types;

pub use cancel::CancelFlag;
pub use config::AppConfig;
pub use error::{EditorialError, EditorialResult};
pub use tenant::TenantContext;

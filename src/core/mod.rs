//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod error;
pub mod fund;
pub mod identity;
pub mod log;
pub mod nav;
pub mod saved;

// Re-export main types for cleaner imports
pub use error::SavedFundsError;
pub use fund::{FundDataProvider, FundDetails, FundMeta, FundSummary, NavPoint};
pub use identity::IdentityProvider;
pub use nav::HistoricalPeriod;
pub use saved::{SavedFund, UserId, UserRecord};

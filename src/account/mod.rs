//! Account management: versioned balances and system account provisioning

pub mod models;
pub mod repository;

pub use models::{Account, AccountStatus};
pub use repository::AccountRepository;

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod vault;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use repositories::{InMemoryDataHandler, RepositoryError, SqlCandidateRepository};
pub use vault::{RecordVault, VaultError};

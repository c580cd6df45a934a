pub mod app_config;
pub mod database;
pub mod document_repo;
pub mod oracle_client;

pub use database::DbClient;
pub use document_repo::PgDocumentStore;
pub use oracle_client::HttpPricingOracle;

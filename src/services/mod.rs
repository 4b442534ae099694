mod auth_service;
mod fetcher;
mod ingestion;
mod source_client;

pub use auth_service::*;
pub use fetcher::*;
pub use ingestion::*;
pub use source_client::*;

mod config;
mod error;
mod store;

pub use config::HttpStoreConfig;
pub use error::HttpStoreError;
pub use store::HttpMatchStore;

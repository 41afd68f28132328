mod error;
mod store;

pub use error::FileStoreError;
pub use store::FileMatchStore;

pub mod health;
pub mod intent;
pub mod sse;
pub mod validation;

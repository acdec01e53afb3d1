pub mod config;
pub mod digest;
pub mod types;

pub use config::ServiceConfig;
pub use digest::schema_digest;
pub use types::*;

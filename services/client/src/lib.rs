pub mod adapters;
pub mod config;
pub mod error;
pub mod retry;

pub use adapters::HttpApiAdapter;
pub use config::Config;
pub use error::ClientError;
pub use retry::{RetryConfig, RetryingChannel};

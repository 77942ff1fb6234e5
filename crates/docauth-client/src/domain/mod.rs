//! Domain layer: session configuration, lifecycle states, the error
//! taxonomy and the correlation table.

pub mod config;
pub mod error;
pub mod pending;
pub mod state;

pub use config::{parse_duration, ConfigError, SessionConfig, DEFAULT_CHANNEL_NAME};
pub use error::ClientError;
pub use pending::{ExchangeOutcome, PendingExchangeStore, PendingStats};
pub use state::SessionState;

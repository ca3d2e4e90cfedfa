//! Service layer for autoapply business logic.
//!
//! Services hold the operations the CLI exposes, separated from argument
//! parsing and output formatting.

pub mod bot;

pub use bot::{BotService, BotState, ServiceError};

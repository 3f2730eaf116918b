pub mod config;
pub mod error;
pub mod types;

pub use config::MatchConfig;
pub use error::{Result, TacticsError};

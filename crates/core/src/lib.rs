//! imgsearch core library
//!
//! Foundational utilities shared by every imgsearch crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, EncoderConfig, StorageConfig};
pub use error::{AppError, AppResult, StorageErrorKind};

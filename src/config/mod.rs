//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → app.rs: AppConfig::from_settings + hooks
//!     → shared via Arc by the App and the normalizer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; the App never mutates it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod app;
pub mod loader;
pub mod schema;
pub mod validation;

pub use app::{AppConfig, AppConfigBuilder};
pub use loader::{load_settings, ConfigError};
pub use schema::{AppSettings, LogFormat, LoggingSettings, MetricsSettings, ServerSettings, Settings};
pub use validation::ValidationError;

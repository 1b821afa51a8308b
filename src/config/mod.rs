/// Default configuration template and `config init`.
pub mod default;

/// Configuration error types.
pub mod error;

/// Configuration file loader.
pub mod loader;

/// TOML configuration schema types.
pub mod schema;

/// Duration resolution and semantic checks.
pub mod validate;

/// XDG Base Directory path resolution utilities.
pub mod xdg;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{Config, ServerConfig};

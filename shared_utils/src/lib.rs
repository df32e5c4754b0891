//! Small helpers shared by the weave crates.

pub mod env;

pub use env::{ConfigError, current_host, current_user, get_env_path, get_env_var};

use std::env;

use anyhow::{Context, Result};

/// Read a required environment variable.
///
/// Fail with useful context if the variable is not set in the environment.
pub fn required_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("Failed to read {key} from environment"))
}

/// Read an optional environment variable. Empty values count as unset.
pub fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Take a value from the command line or fall back to the environment.
pub fn arg_or_env(arg: Option<String>, key: &str) -> Result<String> {
    match arg {
        Some(value) => Ok(value),
        None => required_env(key),
    }
}

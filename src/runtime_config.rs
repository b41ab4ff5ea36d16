//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the coroutine runtime.
//!
//! ## Environment Variables
//!
//! ### `GAUNTLET_STACK_SIZE`
//!
//! Sets the stack size for handler coroutines. Accepts values in:
//! - Decimal: `16384` (16 KB)
//! - Hexadecimal: `0x4000` (16 KB)
//!
//! Default: `0x4000` (16 KB)
//!
//! Larger stacks support deeper call chains in handlers; smaller stacks
//! reduce memory usage for many concurrent coroutines. Tune based on handler
//! complexity and concurrency.

use std::env;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`] to configure
/// the coroutine runtime behavior.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for handler coroutines in bytes (default: 16 KB / 0x4000)
    pub stack_size: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = match env::var("GAUNTLET_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(0x4000)
                } else {
                    val.parse().unwrap_or(0x4000)
                }
            }
            Err(_) => 0x4000,
        };
        RuntimeConfig { stack_size }
    }
}

//! Environment variable utilities
//!
//! Typed lookups with defaults, used by `SchedulerConfig::from_env` and the
//! logging setup. Sizes accept binary suffixes so stacks can be given as
//! `UTHREAD_STACK_SIZE=512K`.
//!
//! ```ignore
//! use uthread_core::env::{env_get, env_get_bool, env_get_size};
//!
//! let max: usize = env_get("UTHREAD_MAX_UTHREADS", 65536);
//! let stack = env_get_size("UTHREAD_STACK_SIZE", 256 * 1024);
//! let debug = env_get_bool("UTHREAD_DEBUG", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Unset and unparsable values both fall back to `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other set value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check if environment variable is set (regardless of value)
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}

/// Get a byte size, accepting `K`, `M` and `G` suffixes (powers of 1024)
pub fn env_get_size(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_size(&v))
        .unwrap_or(default)
}

/// Parse "4096", "64k", "16M", "1G" into bytes
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    let (digits, shift) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], 10),
        'm' | 'M' => (&s[..s.len() - 1], 20),
        'g' | 'G' => (&s[..s.len() - 1], 30),
        _ => (s, 0),
    };
    let n: usize = digits.trim().parse().ok()?;
    n.checked_mul(1usize << shift)
}

// ============================================================================
// Tests
// ============================================================================

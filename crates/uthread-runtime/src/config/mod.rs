//! Scheduler configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. User's uthread_config.rs (compile-time, via `UTHREAD_CONFIG_RS`)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use uthread_runtime::config::SchedulerConfig;
//!
//! // Use defaults with env overrides
//! let config = SchedulerConfig::from_env();
//!
//! // Or customize programmatically
//! let config = SchedulerConfig::from_env()
//!     .stack_size(64 * 1024)
//!     .max_uthreads(1024);
//! ```

pub mod defaults;

use uthread_core::constants::{MAX_STACK_SIZE, MIN_STACK_SIZE, UTHREAD_NONE};
use uthread_core::env::{env_get, env_get_bool, env_get_size};

/// Scheduler configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Usable stack bytes per uthread (rounded up to whole pages)
    pub stack_size: usize,
    /// Maximum uthreads alive in one scheduler (created and not yet reaped)
    pub max_uthreads: usize,
    /// PROT_NONE pages below each stack
    pub guard_pages: usize,
    /// Log every create/switch/drain at debug level
    pub debug_logging: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SchedulerConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `UTHREAD_STACK_SIZE` - Stack size per uthread (accepts K/M/G suffix)
    /// - `UTHREAD_MAX_UTHREADS` - Max live uthreads per scheduler
    /// - `UTHREAD_GUARD_PAGES` - Guard pages per stack
    /// - `UTHREAD_DEBUG` - Enable scheduler debug logging (0/1)
    pub fn from_env() -> Self {
        Self {
            stack_size: env_get_size("UTHREAD_STACK_SIZE", defaults::STACK_SIZE),
            max_uthreads: env_get("UTHREAD_MAX_UTHREADS", defaults::MAX_UTHREADS),
            guard_pages: env_get("UTHREAD_GUARD_PAGES", defaults::GUARD_PAGES),
            debug_logging: env_get_bool("UTHREAD_DEBUG", defaults::DEBUG_LOGGING),
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            stack_size: defaults::STACK_SIZE,
            max_uthreads: defaults::MAX_UTHREADS,
            guard_pages: defaults::GUARD_PAGES,
            debug_logging: defaults::DEBUG_LOGGING,
        }
    }

    // Builder methods

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn max_uthreads(mut self, n: usize) -> Self {
        self.max_uthreads = n;
        self
    }

    pub fn guard_pages(mut self, n: usize) -> Self {
        self.guard_pages = n;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be >= 16KB"));
        }
        if self.stack_size > MAX_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be <= 1GB"));
        }
        if self.max_uthreads == 0 {
            return Err(ConfigError::InvalidValue("max_uthreads must be > 0"));
        }
        if self.max_uthreads >= UTHREAD_NONE as usize {
            return Err(ConfigError::InvalidValue("max_uthreads must fit a slot index"));
        }
        if self.guard_pages > 16 {
            return Err(ConfigError::InvalidValue("guard_pages must be <= 16"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("uthread Configuration:");
        eprintln!("  stack_size:    {}", self.stack_size);
        eprintln!("  max_uthreads:  {}", self.max_uthreads);
        eprintln!("  guard_pages:   {}", self.guard_pages);
        eprintln!("  debug_logging: {}", self.debug_logging);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulerConfig::new();
        assert_eq!(config.stack_size, defaults::STACK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SchedulerConfig::new()
            .stack_size(64 * 1024)
            .max_uthreads(8)
            .guard_pages(0)
            .debug_logging(true);

        assert_eq!(config.stack_size, 64 * 1024);
        assert_eq!(config.max_uthreads, 8);
        assert_eq!(config.guard_pages, 0);
        assert!(config.debug_logging);
    }

    #[test]
    fn test_validation() {
        assert!(SchedulerConfig::new().stack_size(1024).validate().is_err());
        assert!(SchedulerConfig::new().stack_size(2 << 30).validate().is_err());
        assert!(SchedulerConfig::new().max_uthreads(0).validate().is_err());
        assert!(SchedulerConfig::new().guard_pages(64).validate().is_err());
        assert_eq!(
            SchedulerConfig::new().max_uthreads(0).validate(),
            Err(ConfigError::InvalidValue("max_uthreads must be > 0"))
        );
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("UTHREAD_MAX_UTHREADS", "17");
        std::env::set_var("UTHREAD_STACK_SIZE", "128K");
        let config = SchedulerConfig::from_env();
        std::env::remove_var("UTHREAD_MAX_UTHREADS");
        std::env::remove_var("UTHREAD_STACK_SIZE");

        assert_eq!(config.max_uthreads, 17);
        assert_eq!(config.stack_size, 128 * 1024);
    }
}

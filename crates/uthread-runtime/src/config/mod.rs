//! uthread configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls (`init(quantum)` sets the quantum this way)
//! 2. Environment variables
//! 3. The user's `UTH_CONFIG_RS` file, merged at build time
//! 4. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use uthread_runtime::config::{AlarmClock, SchedulerConfig};
//!
//! let config = SchedulerConfig::from_env()
//!     .quantum_usecs(1_000)
//!     .clock(AlarmClock::Real);
//! ```

use std::fmt;
use std::str::FromStr;

use uthread_core::constants::{MIN_STACK_SIZE, PAGE_SIZE};
use uthread_core::env::{env_get, env_get_bool, env_get_lower};
use uthread_core::SchedError;

/// Defaults generated by build.rs
pub mod defaults {
    include!(concat!(env!("OUT_DIR"), "/uth_merged_config.rs"));
}

/// Largest identity space accepted
pub const MAX_THREADS_LIMIT: usize = 1 << 16;

/// Which clock drives preemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmClock {
    /// CPU time consumed by the process (SIGVTALRM)
    ///
    /// Ticks at the kernel's CPU accounting granularity, so quanta shorter
    /// than a scheduler tick (often 4ms) are stretched to it.
    Virtual,
    /// Wall-clock time (SIGALRM)
    #[default]
    Real,
}

impl FromStr for AlarmClock {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtual" | "vt" | "cpu" => Ok(AlarmClock::Virtual),
            "real" | "wall" => Ok(AlarmClock::Real),
            _ => Err(ConfigError::InvalidValue("clock must be `virtual` or `real`")),
        }
    }
}

impl fmt::Display for AlarmClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmClock::Virtual => write!(f, "virtual"),
            AlarmClock::Real => write!(f, "real"),
        }
    }
}

/// Scheduler configuration with builder pattern.
///
/// Use `from_env()` to start with compile-time defaults and apply
/// any environment variable overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Quantum length in microseconds
    pub quantum_usecs: i64,
    /// Size of the identity space, main thread included
    pub max_threads: usize,
    /// Usable stack bytes per spawned thread (guard page not included)
    pub stack_size: usize,
    /// Preemption clock
    pub clock: AlarmClock,
    /// Raise logging to at least debug
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
    /// - `UTH_QUANTUM_USECS` - Quantum length in microseconds
    /// - `UTH_MAX_THREADS` - Identity space size
    /// - `UTH_STACK_SIZE` - Stack bytes per thread
    /// - `UTH_CLOCK` - `virtual` or `real`
    /// - `UTH_DEBUG` - Enable debug logging (0/1)
    ///
    /// An unparsable value is ignored in favour of the default.
    pub fn from_env() -> Self {
        let base = Self::new();
        Self {
            quantum_usecs: env_get("UTH_QUANTUM_USECS", base.quantum_usecs),
            max_threads: env_get("UTH_MAX_THREADS", base.max_threads),
            stack_size: env_get("UTH_STACK_SIZE", base.stack_size),
            clock: env_get_lower("UTH_CLOCK")
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.clock),
            debug_logging: env_get_bool("UTH_DEBUG", base.debug_logging),
        }
    }

    /// Create config from compile-time defaults only (no env override).
    pub fn new() -> Self {
        Self {
            quantum_usecs: defaults::QUANTUM_USECS,
            max_threads: defaults::MAX_THREADS,
            stack_size: defaults::STACK_SIZE,
            clock: AlarmClock::default(),
            debug_logging: defaults::DEBUG_LOGGING || cfg!(feature = "debug-logging"),
        }
    }

    // Builder methods

    pub fn quantum_usecs(mut self, usecs: i64) -> Self {
        self.quantum_usecs = usecs;
        self
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn clock(mut self, clock: AlarmClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantum_usecs <= 0 {
            return Err(ConfigError::InvalidValue("quantum_usecs must be positive"));
        }
        if self.max_threads == 0 {
            return Err(ConfigError::InvalidValue("max_threads must be > 0"));
        }
        if self.max_threads > MAX_THREADS_LIMIT {
            return Err(ConfigError::InvalidValue("max_threads must be <= 65536"));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be >= 16KB"));
        }
        if self.stack_size % PAGE_SIZE != 0 {
            return Err(ConfigError::InvalidValue("stack_size must be a multiple of 4KB"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("uthread configuration:");
        eprintln!("  quantum_usecs:  {}", self.quantum_usecs);
        eprintln!("  max_threads:    {}", self.max_threads);
        eprintln!("  stack_size:     {}", self.stack_size);
        eprintln!("  clock:          {}", self.clock);
        eprintln!("  debug_logging:  {}", self.debug_logging);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for SchedError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => SchedError::InvalidArgument(msg),
        }
    }
}

//! Configuration for the hart engine.
//!
//! This module defines the structures used to parameterize a run. It provides:
//! 1. **Defaults:** Baseline constants for memory, TLB, block cache and JIT tuning.
//! 2. **Structures:** Hierarchical config for general, memory, cache and JIT settings.
//! 3. **Validation:** Shape checks (power-of-two tables, non-zero block length).
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built with `Config::default()`.

use serde::Deserialize;
use thiserror::Error;

use crate::common::EngineError;

/// Default configuration constants.
mod defaults {
    /// Initial program counter.
    pub const INITIAL_PC: u64 = 0x1000;

    /// Value written into x1..x31 before the first step.
    pub const INITIAL_REG_VAL: u64 = 0;

    /// Guest memory size (64 MiB).
    pub const MEMORY_SIZE: usize = 64 * 1024 * 1024;

    /// Entries per TLB (fetch, load and store each get their own).
    pub const TLB_SIZE: usize = 64;

    /// Block cache slots.
    pub const BB_CACHE_SIZE: usize = 4096;

    /// Maximum instructions collected into a single block.
    pub const CACHED_BB_SIZE: usize = 64;

    /// Lookup count at which a threaded block is compiled.
    pub const JIT_BOUND: u64 = 10;
}

/// Configuration shape errors reported by [`Config::validate`] and [`Config::from_json`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document did not parse.
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A table size that must be a power of two is not.
    #[error("{field} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo {
        /// Name of the offending field.
        field: &'static str,
        /// Value supplied.
        value: usize,
    },

    /// A size that must be non-zero is zero.
    #[error("{0} must be non-zero")]
    Zero(&'static str),

    /// An execution range with `start > end`.
    #[error("execution range {start:#x}..{end:#x} is inverted")]
    InvertedRange {
        /// Range start.
        start: u64,
        /// Range end.
        end: u64,
    },
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use rvjit_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.general.initial_pc, 0x1000);
/// assert!(!config.jit.use_jit);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use rvjit_core::config::Config;
///
/// let json = r#"{
///     "general": { "initial_pc": 4096, "max_steps": 1000 },
///     "cache": { "bb_cache_size": 256, "cached_bb_size": 32 },
///     "jit": { "use_jit": true, "jit_bound": 4 },
///     "exec_ranges": [ { "start": 4096, "end": 8192 } ]
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.general.max_steps, 1000);
/// assert_eq!(config.cache.bb_cache_size, 256);
/// assert_eq!(config.jit.jit_bound, 4);
/// assert_eq!(config.exec_ranges.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General run settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Guest memory and TLB sizing
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Block cache sizing
    #[serde(default)]
    pub cache: CacheConfig,
    /// Native compilation policy
    #[serde(default)]
    pub jit: JitConfig,
    /// Executable guest address ranges followed by function discovery
    #[serde(default)]
    pub exec_ranges: Vec<ExecRange>,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Arguments
    ///
    /// * `json` - The document; missing sections and fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and any error from
    /// [`Config::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks structural constraints the engine relies on.
    ///
    /// # Errors
    ///
    /// Rejects a block cache or TLB whose size is not a power of two, a zero
    /// maximum block length or memory size, and inverted execution ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pow2("cache.bb_cache_size", self.cache.bb_cache_size)?;
        check_pow2("memory.tlb_size", self.memory.tlb_size)?;
        if self.cache.cached_bb_size == 0 {
            return Err(ConfigError::Zero("cache.cached_bb_size"));
        }
        if self.memory.size == 0 {
            return Err(ConfigError::Zero("memory.size"));
        }
        for range in &self.exec_ranges {
            if range.start > range.end {
                return Err(ConfigError::InvertedRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }
        Ok(())
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

fn check_pow2(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo { field, value })
    }
}

/// General run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Program counter at reset.
    #[serde(default = "GeneralConfig::default_initial_pc")]
    pub initial_pc: u64,

    /// Value every register except x0 holds at reset.
    #[serde(default = "GeneralConfig::default_initial_reg_val")]
    pub initial_reg_val: u64,

    /// Instruction budget for `Machine::run` (0 = run until halted).
    #[serde(default)]
    pub max_steps: u64,

    /// Initial stack pointer; written into `sp` by the driver when set.
    #[serde(default)]
    pub stack_top: Option<u64>,
}

impl GeneralConfig {
    fn default_initial_pc() -> u64 {
        defaults::INITIAL_PC
    }

    fn default_initial_reg_val() -> u64 {
        defaults::INITIAL_REG_VAL
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            initial_pc: defaults::INITIAL_PC,
            initial_reg_val: defaults::INITIAL_REG_VAL,
            max_steps: 0,
            stack_top: None,
        }
    }
}

/// Guest memory and translation cache sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Guest memory size in bytes
    #[serde(default = "MemoryConfig::default_size")]
    pub size: usize,

    /// Entries per TLB (power of two)
    #[serde(default = "MemoryConfig::default_tlb_size")]
    pub tlb_size: usize,
}

impl MemoryConfig {
    fn default_size() -> usize {
        defaults::MEMORY_SIZE
    }

    fn default_tlb_size() -> usize {
        defaults::TLB_SIZE
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            size: defaults::MEMORY_SIZE,
            tlb_size: defaults::TLB_SIZE,
        }
    }
}

/// Block cache sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Number of direct-mapped slots (power of two)
    #[serde(default = "CacheConfig::default_bb_cache_size")]
    pub bb_cache_size: usize,

    /// Maximum instructions per collected block
    #[serde(default = "CacheConfig::default_cached_bb_size")]
    pub cached_bb_size: usize,
}

impl CacheConfig {
    fn default_bb_cache_size() -> usize {
        defaults::BB_CACHE_SIZE
    }

    fn default_cached_bb_size() -> usize {
        defaults::CACHED_BB_SIZE
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bb_cache_size: defaults::BB_CACHE_SIZE,
            cached_bb_size: defaults::CACHED_BB_SIZE,
        }
    }
}

/// Native compilation policy.
#[derive(Debug, Clone, Deserialize)]
pub struct JitConfig {
    /// Compile hot leaf blocks and whole functions to host code
    #[serde(default)]
    pub use_jit: bool,

    /// Lookup count at which a branch-free threaded block is compiled
    #[serde(default = "JitConfig::default_jit_bound")]
    pub jit_bound: u64,
}

impl JitConfig {
    fn default_jit_bound() -> u64 {
        defaults::JIT_BOUND
    }
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            use_jit: false,
            jit_bound: defaults::JIT_BOUND,
        }
    }
}

/// A half-open range `[start, end)` of executable guest addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExecRange {
    /// First executable address
    pub start: u64,
    /// One past the last executable address
    pub end: u64,
}

impl ExecRange {
    /// Creates a range.
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `addr` lies inside the range.
    #[inline]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

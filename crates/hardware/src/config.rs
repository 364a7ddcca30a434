//! Configuration system for the coherence simulator.
//!
//! A `Config` fixes the bus population, cache geometry, protocol and policy for
//! a whole run. This module covers:
//! 1. **Defaults:** Baseline cache geometry and bus population.
//! 2. **Structures:** General run options and the per-cache geometry shared by every cache on the bus.
//! 3. **Enums:** Coherence protocol and replacement policy selection.
//! 4. **Validation:** Geometry is checked once by `Config::validate`, never per access.
//!
//! Configuration is supplied as JSON (see `Config::from_json`) or built from `Config::default()`.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::addr::AddressLayout;
use crate::common::error::ConfigError;

/// Values used for fields absent from a JSON configuration.
mod defaults {
    /// Number of private caches (one per simulated processor).
    pub const NUM_CACHES: usize = 4;

    /// Default associativity (2-way set-associative).
    pub const ASSOC: usize = 2;

    /// Default number of sets per cache.
    pub const NUM_SETS: usize = 64;

    /// Default cache line size in bytes.
    pub const LINE_BYTES: usize = 64;

    /// Default processor address width in bits.
    pub const ADDRESS_BITS: u32 = 32;

    /// Default seed of the random replacement policy.
    pub const RANDOM_SEED: u64 = 0x2545_F491_4F6C_DD1D;

    /// Most lines a single cache may hold (`num_sets * assoc`).
    pub const MAX_LINES: usize = 1 << 24;

    /// Largest associativity the bit-PLRU policy can track.
    pub const PLRU_MAX_WAYS: usize = 64;
}

/// Cache coherence protocol variants.
///
/// Every cache on a bus runs the same protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum Protocol {
    /// Plain MSI; a write hit on a Shared line issues a full `BusRdX`.
    #[serde(alias = "MSI")]
    Msi,
    /// MSI with the `BusUpgr` message for write hits on Shared lines.
    #[default]
    #[serde(alias = "MSIUpgr", alias = "msi_upgr")]
    MsiUpgr,
    /// MESI; reads that find no other copy install the line Exclusive.
    #[serde(alias = "MESI")]
    Mesi,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Msi => "MSI",
            Self::MsiUpgr => "MSIUpgr",
            Self::Mesi => "MESI",
        })
    }
}

/// Cache replacement policy algorithms.
///
/// Specifies the algorithm used to select which way to evict when a new line
/// must be installed in a full cache set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Least Recently Used (age counters).
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// First In First Out (round-robin pointer per set).
    #[serde(alias = "Fifo")]
    Fifo,
    /// Bit pseudo-LRU (one recently-used bit per way).
    #[serde(alias = "Plru")]
    Plru,
    /// Seeded pseudo-random selection.
    #[serde(alias = "Random")]
    Random,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lru => "LRU",
            Self::Fifo => "FIFO",
            Self::Plru => "PLRU",
            Self::Random => "RANDOM",
        })
    }
}

/// Everything needed to build a [`crate::Simulator`].
///
/// # Examples
///
/// Starting from the built-in values:
///
/// ```
/// use cohsim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.cache.num_caches, 4);
/// assert!(config.validate().is_ok());
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use cohsim_core::config::{Config, Protocol, ReplacementPolicy};
///
/// let json = r#"{
///     "general": { "check_invariants": true },
///     "cache": {
///         "num_caches": 2,
///         "assoc": 4,
///         "num_sets": 16,
///         "line_bytes": 32,
///         "protocol": "Mesi",
///         "policy": "FIFO"
///     }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert!(config.general.check_invariants);
/// assert_eq!(config.cache.protocol, Protocol::Mesi);
/// assert_eq!(config.cache.policy, ReplacementPolicy::Fifo);
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Run options.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Geometry and policies shared by every cache on the bus
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation error
    /// reported by [`Config::validate`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`Config::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()
    }
}

/// Options that affect the run but not cache behavior.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Verify the single-writer and no-stale-sharer invariants after every access
    #[serde(default)]
    pub check_invariants: bool,
}

/// Geometry, protocol and replacement policy of every cache on the bus.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Number of private caches sharing the bus
    #[serde(default = "CacheConfig::default_num_caches")]
    pub num_caches: usize,

    /// Associativity (number of ways per set)
    #[serde(default = "CacheConfig::default_assoc")]
    pub assoc: usize,

    /// Number of sets per cache
    #[serde(default = "CacheConfig::default_num_sets")]
    pub num_sets: usize,

    /// Cache line size in bytes
    #[serde(default = "CacheConfig::default_line_bytes")]
    pub line_bytes: usize,

    /// Processor address width in bits
    #[serde(default = "CacheConfig::default_address_bits")]
    pub address_bits: u32,

    /// Coherence protocol
    #[serde(default)]
    pub protocol: Protocol,

    /// Replacement policy
    #[serde(default)]
    pub policy: ReplacementPolicy,

    /// Seed for the random replacement policy
    #[serde(default = "CacheConfig::default_seed")]
    pub seed: u64,
}

impl CacheConfig {
    /// Returns the default number of caches.
    const fn default_num_caches() -> usize {
        defaults::NUM_CACHES
    }

    /// Returns the default associativity.
    const fn default_assoc() -> usize {
        defaults::ASSOC
    }

    /// Returns the default number of sets.
    const fn default_num_sets() -> usize {
        defaults::NUM_SETS
    }

    /// Returns the default line size in bytes.
    const fn default_line_bytes() -> usize {
        defaults::LINE_BYTES
    }

    /// Returns the default address width.
    const fn default_address_bits() -> u32 {
        defaults::ADDRESS_BITS
    }

    /// Returns the default random policy seed.
    const fn default_seed() -> u64 {
        defaults::RANDOM_SEED
    }

    /// Builds the address layout implied by this geometry.
    ///
    /// # Errors
    ///
    /// See [`AddressLayout::new`].
    pub fn layout(&self) -> Result<AddressLayout, ConfigError> {
        AddressLayout::new(self.line_bytes, self.num_sets, self.address_bits)
    }

    /// Checks cache count, associativity and address geometry.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_caches == 0 {
            return Err(ConfigError::Zero { field: "num_caches" });
        }
        if self.assoc == 0 {
            return Err(ConfigError::Zero { field: "assoc" });
        }
        if !self.assoc.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "assoc",
                value: self.assoc,
            });
        }
        if self.policy == ReplacementPolicy::Plru && self.assoc > defaults::PLRU_MAX_WAYS {
            return Err(ConfigError::TooManyWays {
                policy: "PLRU",
                max: defaults::PLRU_MAX_WAYS,
                ways: self.assoc,
            });
        }
        let lines = self.num_sets.checked_mul(self.assoc);
        if lines.is_none_or(|n| n > defaults::MAX_LINES) {
            return Err(ConfigError::GeometryTooLarge {
                sets: self.num_sets,
                ways: self.assoc,
                max: defaults::MAX_LINES,
            });
        }
        let _ = self.layout()?;
        Ok(())
    }
}

impl Default for CacheConfig {
    /// Four 2-way caches of 64 sets with 64-byte lines, MSI with `BusUpgr`, LRU replacement.
    fn default() -> Self {
        Self {
            num_caches: defaults::NUM_CACHES,
            assoc: defaults::ASSOC,
            num_sets: defaults::NUM_SETS,
            line_bytes: defaults::LINE_BYTES,
            address_bits: defaults::ADDRESS_BITS,
            protocol: Protocol::default(),
            policy: ReplacementPolicy::default(),
            seed: defaults::RANDOM_SEED,
        }
    }
}

//! Address type and tag/set/offset decomposition.
//!
//! This module defines the address handled by every cache and the layout that splits it.
//! It provides the following:
//! 1. **Type Safety:** A strong `Addr` type so raw counters are never confused with addresses.
//! 2. **Decomposition:** `AddressLayout` maps an address onto its tag and set index.
//! 3. **Validation:** Geometry is checked once when the layout is built, never per access.

use std::fmt;

use super::error::ConfigError;

/// A byte address issued by a simulated processor.
///
/// Addresses are opaque fixed-width integers; the cache geometry decides which bits
/// form the line offset, the set index and the tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Addr(pub u64);

impl Addr {
    /// Creates a new address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }
}

impl From<u64> for Addr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Bit layout of an address for one cache geometry.
///
/// From most to least significant the fields are: tag, set index, line offset.
/// `line_offset` is the number of bits below the set index and `tag_offset` the
/// number of bits below the tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressLayout {
    line_offset: u32,
    tag_offset: u32,
    address_bits: u32,
    set_mask: u64,
}

impl AddressLayout {
    /// Builds the layout for a cache with the given line size and set count.
    ///
    /// # Arguments
    ///
    /// * `line_bytes` - Bytes per cache line (non-zero power of two).
    /// * `num_sets` - Number of sets (non-zero power of two).
    /// * `address_bits` - Width of a processor address, `1..=64`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a size is zero or not a power of two, if the
    /// address width is out of range, or if no bits remain for the tag.
    pub fn new(line_bytes: usize, num_sets: usize, address_bits: u32) -> Result<Self, ConfigError> {
        let line_offset = log2_exact("line_bytes", line_bytes)?;
        let index_bits = log2_exact("num_sets", num_sets)?;
        if address_bits == 0 || address_bits > 64 {
            return Err(ConfigError::AddressWidth { bits: address_bits });
        }
        let tag_offset = line_offset + index_bits;
        if tag_offset >= address_bits {
            return Err(ConfigError::NoTagBits {
                offset_bits: line_offset,
                index_bits,
                address_bits,
            });
        }
        Ok(Self {
            line_offset,
            tag_offset,
            address_bits,
            set_mask: (num_sets as u64) - 1,
        })
    }

    /// Number of bits that come before the set index field.
    pub const fn line_offset(&self) -> u32 {
        self.line_offset
    }

    /// Number of bits that come before the tag field.
    pub const fn tag_offset(&self) -> u32 {
        self.tag_offset
    }

    /// Width of an address in bits.
    pub const fn address_bits(&self) -> u32 {
        self.address_bits
    }

    /// Extracts the set index of `addr`.
    #[inline]
    pub const fn set_index(&self, addr: Addr) -> usize {
        ((addr.0 >> self.line_offset) & self.set_mask) as usize
    }

    /// Extracts the tag of `addr`.
    #[inline]
    pub const fn tag(&self, addr: Addr) -> u64 {
        addr.0 >> self.tag_offset
    }

    /// Reassembles the first byte address of the line identified by `tag` and `set`.
    pub const fn line_base(&self, tag: u64, set: usize) -> Addr {
        Addr((tag << self.tag_offset) | ((set as u64) << self.line_offset))
    }

    /// Returns `true` if `addr` fits in the configured address width.
    pub const fn contains(&self, addr: Addr) -> bool {
        self.address_bits == 64 || addr.0 >> self.address_bits == 0
    }

    /// Returns `true` if `a` and `b` fall in the same cache line.
    pub const fn same_line(&self, a: Addr, b: Addr) -> bool {
        a.0 >> self.line_offset == b.0 >> self.line_offset
    }
}

/// Returns `log2(value)` if `value` is a non-zero power of two.
fn log2_exact(field: &'static str, value: usize) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    if !value.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { field, value });
    }
    Ok(value.trailing_zeros())
}

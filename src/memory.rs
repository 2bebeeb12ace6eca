//! Usage reporting for external monitoring and compaction decisions.

use std::ops::AddAssign;

/// Byte-level memory accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes reserved by allocations.
    pub allocated_bytes: usize,
    /// Bytes handed out to live, dead or held data.
    pub used_bytes: usize,
    /// Bytes of reclaimed space not yet reused.
    pub dead_bytes: usize,
    /// Bytes still waiting on a hold list.
    pub allocated_bytes_on_hold: usize,
}

impl MemoryUsage {
    /// Build a usage record.
    #[must_use]
    pub const fn new(
        allocated_bytes: usize,
        used_bytes: usize,
        dead_bytes: usize,
        allocated_bytes_on_hold: usize,
    ) -> Self {
        Self {
            allocated_bytes,
            used_bytes,
            dead_bytes,
            allocated_bytes_on_hold,
        }
    }
}

impl AddAssign for MemoryUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.allocated_bytes += rhs.allocated_bytes;
        self.used_bytes += rhs.used_bytes;
        self.dead_bytes += rhs.dead_bytes;
        self.allocated_bytes_on_hold += rhs.allocated_bytes_on_hold;
    }
}

/// Consumption of the handle offset range, in words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressSpace {
    /// Words consumed in the active buffer.
    pub used: u64,
    /// Words among `used` that are dead.
    pub dead: u64,
    /// Largest offset a handle can encode.
    pub limit: u64,
}

impl AddressSpace {
    /// Fraction of the addressable range in use, dead space included.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn usage(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        self.used as f64 / self.limit as f64
    }
}

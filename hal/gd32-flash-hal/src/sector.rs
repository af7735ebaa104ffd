//! Address to erase-unit resolution
//!
//! Flash is erased in hardware-defined units (pages on the simpler
//! devices, variable-size sectors on the larger ones). A [`SectorMap`]
//! describes one device's layout: every address in
//! `[base, base + total_size)` belongs to exactly one unit, units are
//! contiguous and non-overlapping, and unit sizes are NOT assumed
//! uniform - lookups go by address range, never by arithmetic stride.

/// One erase unit of the device layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EraseUnit {
    /// Zero-based logical index within the map
    pub index: u32,
    /// First address of the unit
    pub start: u32,
    /// Size in bytes
    pub size: u32,
}

impl EraseUnit {
    /// First address past the unit
    pub fn end(&self) -> u32 {
        self.start + self.size
    }
}

/// Static description of one device's erasable flash layout
pub trait SectorMap {
    /// Start of the flash address space
    fn base(&self) -> u32;

    /// Total addressable bytes
    fn total_size(&self) -> u32;

    /// First address past the flash region
    fn end(&self) -> u32 {
        self.base() + self.total_size()
    }

    /// The unit containing `address`, or `None` outside the region
    fn unit_containing(&self, address: u32) -> Option<EraseUnit>;

    /// Translate a logical unit into the value the erase command takes
    ///
    /// For uniform-page devices this is the page start address; for
    /// sector-table devices it is the controller's sector-select code,
    /// which may be non-contiguous in the logical index.
    ///
    /// # Panics
    ///
    /// Panics if `unit` falls outside the device's table. That means
    /// the static layout itself is wrong - a software defect, not bad
    /// caller input - and continuing would erase the wrong physical
    /// sector.
    fn hardware_code(&self, unit: &EraseUnit) -> u32;
}

//! The flash driver state machine
//!
//! Locked(idle) -> open -> Unlocked(idle) -> write|erase ->
//! Unlocked(busy, interrupts masked) -> verify ok | fault ->
//! Unlocked(idle) -> close -> Locked(idle).
//!
//! The busy state is never observable from outside: write and erase
//! run their unlock/program/relock sequence inside one critical
//! section, so no other code path (fault handler included) can
//! interleave with an unlocked controller.

use gd32_flash_hal::flash::PROGRAM_WORD_SIZE;
use gd32_flash_hal::{Driver, EraseUnit, FlashError, FmcBus, FmcStatus, SectorMap};

/// On-chip flash driver
///
/// Generic over the flash memory controller bus `B` and the device's
/// erase-unit layout `M`. Stateless between calls; the only latched
/// state is the controller's own lock bit, toggled by
/// [`open`](Self::open)/[`close`](Self::close) and re-engaged by every
/// write/erase regardless.
pub struct FlashDriver<B, M> {
    bus: B,
    map: M,
}

impl<B: FmcBus, M: SectorMap> FlashDriver<B, M> {
    /// Create a driver over a controller bus and its sector map
    pub fn new(bus: B, map: M) -> Self {
        Self { bus, map }
    }

    /// Get the raw controller bus for low-level access
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Remove the controller's write protection
    ///
    /// Idempotent; repeated opens just re-unlock.
    pub fn open(&mut self) -> Result<(), FlashError> {
        self.bus.unlock();
        Ok(())
    }

    /// Re-engage the controller's write protection
    pub fn close(&mut self) -> Result<(), FlashError> {
        self.bus.lock();
        Ok(())
    }

    /// Read `buffer.len()` bytes starting at `address`
    ///
    /// Plain memory-mapped reads; no unlock, no controller state
    /// change. Fails with [`FlashError::OutOfRange`] before touching
    /// anything if the range leaves the flash region.
    pub fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<usize, FlashError> {
        self.check_range(address, buffer.len())?;
        if buffer.is_empty() {
            return Ok(0);
        }

        self.bus.read(address, buffer);
        Ok(buffer.len())
    }

    /// Program `data` starting at `address`
    ///
    /// `address` must be 4-byte aligned. Programs one 4-byte word at a
    /// time, low address first, and reads each word back immediately;
    /// the first mismatch or controller fault aborts the loop, relocks
    /// the controller and surfaces the error. A final partial word is
    /// padded with 0xFF so the unrequested bytes stay in the erased
    /// state.
    ///
    /// On failure the range `[address, address + data.len())` must be
    /// treated as indeterminate - already-programmed words are not
    /// rolled back, the hardware cannot un-program bits.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<usize, FlashError> {
        if address % PROGRAM_WORD_SIZE as u32 != 0 {
            #[cfg(feature = "defmt")]
            defmt::error!("write address {=u32:#x} not word aligned", address);
            return Err(FlashError::Misaligned);
        }
        self.check_range(address, data.len())?;
        if data.is_empty() {
            return Ok(0);
        }

        let bus = &mut self.bus;
        critical_section::with(|_| {
            let mut guard = UnlockGuard::new(bus);
            let bus = guard.bus();
            bus.clear_flags();

            let mut addr = address;
            for chunk in data.chunks(PROGRAM_WORD_SIZE) {
                let mut word = [0xFF; PROGRAM_WORD_SIZE];
                word[..chunk.len()].copy_from_slice(chunk);

                match bus.program_word(addr, u32::from_le_bytes(word)) {
                    FmcStatus::Ready => {}
                    FmcStatus::Busy => {
                        #[cfg(feature = "defmt")]
                        defmt::error!("program timeout at {=u32:#x}", addr);
                        return Err(FlashError::Timeout);
                    }
                    FmcStatus::Fault => {
                        #[cfg(feature = "defmt")]
                        defmt::error!("program fault at {=u32:#x}", addr);
                        return Err(FlashError::Program);
                    }
                }

                let mut readback = [0u8; PROGRAM_WORD_SIZE];
                bus.read(addr, &mut readback[..chunk.len()]);
                if readback[..chunk.len()] != *chunk {
                    #[cfg(feature = "defmt")]
                    defmt::error!("verify mismatch at {=u32:#x}", addr);
                    return Err(FlashError::Verify);
                }

                addr += chunk.len() as u32;
            }
            Ok(())
        })?;

        Ok(data.len())
    }

    /// Erase every unit intersecting `[address, address + length)`
    ///
    /// No alignment requirement; the erase always rounds out to whole
    /// erase units, so bytes sharing a partially-covered unit are
    /// destroyed along with the requested range. Returns the total
    /// byte span of the erased units, which may exceed `length`.
    ///
    /// Units are erased in address order; the first unit reporting a
    /// fault aborts the loop and the remaining units are left alone.
    pub fn erase(&mut self, address: u32, length: usize) -> Result<usize, FlashError> {
        self.check_range(address, length)?;
        if length == 0 {
            return Ok(0);
        }

        let Self { bus, map } = self;
        let first = resolve_unit(map, address);
        let last = resolve_unit(map, address + (length as u32 - 1));
        let spanned = (last.end() - first.start) as usize;

        critical_section::with(|_| {
            let mut guard = UnlockGuard::new(bus);
            let bus = guard.bus();

            let mut unit = first;
            loop {
                // Flags latch per command; clear before each unit
                bus.clear_flags();
                match bus.erase_unit(map.hardware_code(&unit)) {
                    FmcStatus::Ready => {}
                    FmcStatus::Busy => {
                        #[cfg(feature = "defmt")]
                        defmt::error!("erase timeout in unit {=u32}", unit.index);
                        return Err(FlashError::Timeout);
                    }
                    FmcStatus::Fault => {
                        #[cfg(feature = "defmt")]
                        defmt::error!("erase fault in unit {=u32}", unit.index);
                        return Err(FlashError::Erase);
                    }
                }
                if unit.index == last.index {
                    break;
                }
                unit = resolve_unit(map, unit.end());
            }
            Ok(())
        })?;

        #[cfg(feature = "defmt")]
        defmt::debug!("erase done: addr {=u32:#x}, spanned {=usize}", address, spanned);
        Ok(spanned)
    }

    /// Driver-specific command extension point
    ///
    /// No commands are defined for the flash driver; every command is
    /// accepted as a no-op.
    pub fn control(&mut self, _command: u32) -> Result<(), FlashError> {
        Ok(())
    }

    /// Reject any request leaving `[base, end)` before hardware is
    /// touched
    fn check_range(&self, address: u32, length: usize) -> Result<(), FlashError> {
        let base = self.map.base() as u64;
        let end = self.map.end() as u64;
        if (address as u64) < base || address as u64 + length as u64 > end {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "request {=u32:#x}+{=usize} outside flash region",
                address,
                length
            );
            return Err(FlashError::OutOfRange);
        }
        Ok(())
    }
}

impl<B: FmcBus, M: SectorMap> Driver for FlashDriver<B, M> {
    type Error = FlashError;

    fn open(&mut self) -> Result<(), FlashError> {
        FlashDriver::open(self)
    }

    fn close(&mut self) -> Result<(), FlashError> {
        FlashDriver::close(self)
    }

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<usize, FlashError> {
        FlashDriver::read(self, address, buffer)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize, FlashError> {
        FlashDriver::write(self, address, data)
    }

    fn erase(&mut self, address: u32, length: usize) -> Result<usize, FlashError> {
        FlashDriver::erase(self, address, length)
    }

    fn control(&mut self, command: u32) -> Result<(), FlashError> {
        FlashDriver::control(self, command)
    }
}

/// Relocks the controller when dropped, so every exit path out of a
/// program/erase sequence - success, verify failure, fault, timeout -
/// restores write protection.
struct UnlockGuard<'a, B: FmcBus> {
    bus: &'a mut B,
}

impl<'a, B: FmcBus> UnlockGuard<'a, B> {
    fn new(bus: &'a mut B) -> Self {
        bus.unlock();
        Self { bus }
    }

    fn bus(&mut self) -> &mut B {
        self.bus
    }
}

impl<B: FmcBus> Drop for UnlockGuard<'_, B> {
    fn drop(&mut self) {
        self.bus.lock();
    }
}

/// Look up the unit covering an already range-checked address
///
/// A miss here means the static sector map does not cover its own
/// region - a software defect - and halting beats erasing the wrong
/// physical sector.
fn resolve_unit<M: SectorMap>(map: &M, address: u32) -> EraseUnit {
    match map.unit_containing(address) {
        Some(unit) => unit,
        None => panic!("sector map does not cover address {:#010x}", address),
    }
}

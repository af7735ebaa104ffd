//! Flash memory controller abstractions
//!
//! The driver core validates requests and sequences commands; the
//! [`FmcBus`] trait is the boundary below which a chip crate (or a
//! test mock) owns the registers. Program and erase commands are
//! synchronous at this level: the implementation polls the controller
//! up to its iteration cap and reports the outcome as an
//! [`FmcStatus`].

/// Smallest unit the controller can program in one command, in bytes
pub const PROGRAM_WORD_SIZE: usize = 4;

/// Errors from flash driver operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Requested range extends past the addressable region
    OutOfRange,
    /// Write start address is not program-word aligned
    Misaligned,
    /// Read-back after programming did not match the source
    Verify,
    /// Controller reported a fault while programming
    Program,
    /// Controller reported a fault while erasing
    Erase,
    /// Controller stayed busy past the poll limit
    Timeout,
}

/// Outcome of a single program or erase command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FmcStatus {
    /// Command completed and the controller is idle again
    Ready,
    /// Controller was still busy when the poll limit was reached
    Busy,
    /// Controller flagged a program/erase fault
    Fault,
}

/// Flash memory controller primitives
///
/// Implementations sequence the registers of one FMC variant. The
/// driver core guarantees that `program_word` and `erase_unit` are
/// only called between `unlock` and `lock`, inside a critical
/// section.
pub trait FmcBus {
    /// Disable the controller's program/erase protection
    fn unlock(&mut self);

    /// Re-engage the controller's program/erase protection
    fn lock(&mut self);

    /// Clear latched end/error flags left over from earlier commands
    fn clear_flags(&mut self);

    /// Program one 4-byte word at `address` and wait for completion
    fn program_word(&mut self, address: u32, word: u32) -> FmcStatus;

    /// Erase one unit identified by its hardware code and wait for
    /// completion
    fn erase_unit(&mut self, code: u32) -> FmcStatus;

    /// Copy `buffer.len()` bytes starting at `address` into `buffer`
    ///
    /// Flash reads behave as ordinary memory reads; no unlock is
    /// required and no controller state changes.
    fn read(&self, address: u32, buffer: &mut [u8]);
}

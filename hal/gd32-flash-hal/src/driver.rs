//! Uniform driver operations contract
//!
//! Every peripheral driver in this family exposes the same six
//! operations. Higher-level code talks to drivers either through the
//! [`Driver`] trait or through the C-style integer status contract in
//! [`status`], where zero or a positive count means success and a
//! negative value encodes the error kind.

use crate::flash::FlashError;

/// Driver operations contract
///
/// Addresses are linear byte addresses within the device's region.
/// `read`/`write`/`erase` return the number of bytes affected on
/// success.
pub trait Driver {
    /// Error type produced by this driver
    type Error;

    /// Bring the device into its operational state
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Return the device to its quiescent state
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Read `buffer.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` starting at `address`
    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize, Self::Error>;

    /// Erase at least `length` bytes starting at `address`
    fn erase(&mut self, address: u32, length: usize) -> Result<usize, Self::Error>;

    /// Driver-specific command extension point
    fn control(&mut self, command: u32) -> Result<(), Self::Error>;
}

/// C-style integer status codes
///
/// The negative-status contract consumed by application code that
/// predates the typed error enums.
pub mod status {
    use super::FlashError;

    /// Operation completed
    pub const OK: i32 = 0;
    /// Hardware-level failure (program/erase fault, verify mismatch)
    pub const ERROR: i32 = -1;
    /// Invalid argument (out of range, misaligned)
    pub const INVALID: i32 = -2;
    /// Controller stayed busy past the poll limit
    pub const TIMEOUT: i32 = -3;

    /// Fold a byte-count result into the integer status contract
    pub fn from_result(result: Result<usize, FlashError>) -> i32 {
        match result {
            Ok(count) => count as i32,
            Err(e) => from_error(e),
        }
    }

    /// Status code for an error kind
    pub fn from_error(error: FlashError) -> i32 {
        match error {
            FlashError::OutOfRange | FlashError::Misaligned => INVALID,
            FlashError::Verify | FlashError::Program | FlashError::Erase => ERROR,
            FlashError::Timeout => TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_maps_to_count() {
        assert_eq!(status::from_result(Ok(0)), status::OK);
        assert_eq!(status::from_result(Ok(256)), 256);
    }

    #[test]
    fn test_argument_errors_map_to_invalid() {
        assert_eq!(status::from_error(FlashError::OutOfRange), status::INVALID);
        assert_eq!(status::from_error(FlashError::Misaligned), status::INVALID);
    }

    #[test]
    fn test_hardware_errors_map_to_error() {
        assert_eq!(status::from_error(FlashError::Verify), status::ERROR);
        assert_eq!(status::from_error(FlashError::Program), status::ERROR);
        assert_eq!(status::from_error(FlashError::Erase), status::ERROR);
    }

    #[test]
    fn test_timeout_has_its_own_code() {
        assert_eq!(status::from_error(FlashError::Timeout), status::TIMEOUT);
    }
}

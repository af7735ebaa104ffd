//! Board-agnostic on-chip flash driver core
//!
//! Implements the uniform driver-operations contract
//! (open/close/read/write/erase/control) over any flash memory
//! controller that provides the `gd32-flash-hal` traits:
//!
//! - Address and alignment validation before any hardware is touched
//! - Unlock/relock discipline via a scoped guard, inside an
//!   interrupt-masked critical section
//! - Word programming with immediate read-back verification
//! - Erase-range decomposition against the device's sector map
//!
//! Chip crates (`gd32-flash-f30x`, `gd32-flash-f4xx`) supply the
//! register-level [`FmcBus`](gd32_flash_hal::FmcBus) and the
//! [`SectorMap`](gd32_flash_hal::SectorMap) for their layout.

#![no_std]
#![deny(unsafe_code)]

pub mod driver;

pub use driver::FlashDriver;
pub use gd32_flash_hal::{Driver, EraseUnit, FlashError, FmcBus, FmcStatus, SectorMap};

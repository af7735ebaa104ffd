//! GD32F4xx-specific flash controller binding
//!
//! This crate provides the GD32F4xx implementations of the
//! `gd32-flash-hal` traits: the two-bank non-uniform sector table
//! (16KB/64KB/128KB sectors, 2MB total) and the FMC register
//! sequencing (unlock keys, word program, sector erase by
//! sector-select code).
//!
//! # Features
//!
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! Pair [`flash::Fmc`] and [`flash::BankedSectors`] with the driver
//! core:
//!
//! ```ignore
//! let mut flash = FlashDriver::new(unsafe { Fmc::new() }, BankedSectors);
//! ```

#![no_std]

pub mod flash;

pub use flash::{BankedSectors, Fmc};

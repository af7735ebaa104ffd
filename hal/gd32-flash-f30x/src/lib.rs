//! GD32F30x-specific flash controller binding
//!
//! This crate provides the GD32F30x implementations of the
//! `gd32-flash-hal` traits: a uniform 1KB page map and the FMC bank0
//! register sequencing (unlock keys, word program, page erase).
//!
//! # Features
//!
//! - `gd32f303cb` - Enable support for GD32F303CB (128KB flash)
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! Pair [`flash::Fmc`] and [`flash::PageMap`] with the driver core:
//!
//! ```ignore
//! let mut flash = FlashDriver::new(unsafe { Fmc::new() }, PageMap);
//! ```

#![no_std]

pub mod flash;

pub use flash::{Fmc, PageMap};

//! GD32 Flash Hardware Abstraction Layer
//!
//! This crate defines the abstraction traits that the board-agnostic
//! flash driver is built on, implemented by chip-specific crates
//! (GD32F30x, GD32F4xx, etc.). The driver core never touches a
//! register directly; everything hardware-facing goes through these
//! traits so the same driver logic runs against either flash
//! controller variant - or against a mock on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application code (driver-ops contract) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  gd32-flash (driver core)               │
//! └─────────────────────────────────────────┘
//!                     │
//! ┌─────────────────────────────────────────┐
//! │  gd32-flash-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!         │                       │
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ gd32-flash-   │       │ gd32-flash-   │
//! │     f30x      │       │     f4xx      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`driver::Driver`] - Uniform driver operations contract
//! - [`flash::FmcBus`] - Flash memory controller primitives
//! - [`sector::SectorMap`] - Address to erase-unit resolution

#![no_std]
#![deny(unsafe_code)]

pub mod driver;
pub mod flash;
pub mod sector;

// Re-export key traits at crate root for convenience
pub use driver::Driver;
pub use flash::{FlashError, FmcBus, FmcStatus};
pub use sector::{EraseUnit, SectorMap};

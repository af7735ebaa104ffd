//! FMC binding for GD32F30x
//!
//! The F30x erases in uniform 1KB pages and programs 4-byte words.
//! The erase command addresses pages by their start address, so the
//! hardware code of a page is simply that address.

use core::ptr;

use gd32_flash_hal::{EraseUnit, FmcBus, FmcStatus, SectorMap};

/// Start of flash memory in address space
pub const FLASH_BASE: u32 = 0x0800_0000;

/// Size of flash memory
#[cfg(feature = "gd32f303cb")]
pub const FLASH_SIZE: u32 = 128 * 1024; // 128KB
#[cfg(not(feature = "gd32f303cb"))]
pub const FLASH_SIZE: u32 = 128 * 1024; // Default

/// Flash page size for the GD32F30x series
pub const FLASH_PAGE_SIZE: u32 = 0x400; // 1KB pages

/// Iteration cap for busy-polling the controller (vendor library
/// constant)
const TIMEOUT_COUNT: u32 = 0x000F_FFFF;

// FMC bank0 register block
const FMC_BASE: usize = 0x4002_2000;
const FMC_KEY0: usize = FMC_BASE + 0x04;
const FMC_STAT0: usize = FMC_BASE + 0x0C;
const FMC_CTL0: usize = FMC_BASE + 0x10;
const FMC_ADDR0: usize = FMC_BASE + 0x14;

// Unlock key sequence
const UNLOCK_KEY0: u32 = 0x4567_0123;
const UNLOCK_KEY1: u32 = 0xCDEF_89AB;

// CTL0 bits
const CTL_PG: u32 = 1 << 0;
const CTL_PER: u32 = 1 << 1;
const CTL_START: u32 = 1 << 6;
const CTL_LK: u32 = 1 << 7;

// STAT0 bits
const STAT_BUSY: u32 = 1 << 0;
const STAT_PGERR: u32 = 1 << 2;
const STAT_WPERR: u32 = 1 << 4;
const STAT_ENDF: u32 = 1 << 5;

/// Uniform page map for the GD32F30x
///
/// Pages resolve by alignment arithmetic; the hardware erase code is
/// the page start address.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PageMap;

impl SectorMap for PageMap {
    fn base(&self) -> u32 {
        FLASH_BASE
    }

    fn total_size(&self) -> u32 {
        FLASH_SIZE
    }

    fn unit_containing(&self, address: u32) -> Option<EraseUnit> {
        if address < FLASH_BASE || address >= FLASH_BASE + FLASH_SIZE {
            return None;
        }
        let index = (address - FLASH_BASE) / FLASH_PAGE_SIZE;
        Some(EraseUnit {
            index,
            start: FLASH_BASE + index * FLASH_PAGE_SIZE,
            size: FLASH_PAGE_SIZE,
        })
    }

    fn hardware_code(&self, unit: &EraseUnit) -> u32 {
        assert!(
            unit.index < FLASH_SIZE / FLASH_PAGE_SIZE,
            "page index {} outside the device",
            unit.index
        );
        unit.start
    }
}

/// GD32F30x flash memory controller (bank0)
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fmc {
    _private: (),
}

impl Fmc {
    /// Create the controller binding
    ///
    /// # Safety
    ///
    /// The caller must be the only user of the FMC registers; nothing
    /// else may program, erase or re-lock flash while this value
    /// exists.
    pub unsafe fn new() -> Self {
        Fmc { _private: () }
    }

    fn read_reg(&self, register: usize) -> u32 {
        // safety: register addresses are valid FMC MMIO words
        unsafe { ptr::read_volatile(register as *const u32) }
    }

    fn write_reg(&mut self, register: usize, value: u32) {
        // safety: register addresses are valid FMC MMIO words
        unsafe { ptr::write_volatile(register as *mut u32, value) }
    }

    fn modify_ctl(&mut self, set: u32, clear: u32) {
        let value = self.read_reg(FMC_CTL0);
        self.write_reg(FMC_CTL0, (value & !clear) | set);
    }

    /// Poll until the controller leaves busy or the iteration cap is
    /// exhausted, then translate the latched flags
    fn wait_done(&mut self) -> FmcStatus {
        let mut timeout = TIMEOUT_COUNT;
        while self.read_reg(FMC_STAT0) & STAT_BUSY != 0 {
            timeout -= 1;
            if timeout == 0 {
                return FmcStatus::Busy;
            }
        }

        let stat = self.read_reg(FMC_STAT0);
        if stat & (STAT_PGERR | STAT_WPERR) != 0 {
            return FmcStatus::Fault;
        }
        FmcStatus::Ready
    }
}

impl FmcBus for Fmc {
    fn unlock(&mut self) {
        if self.read_reg(FMC_CTL0) & CTL_LK != 0 {
            self.write_reg(FMC_KEY0, UNLOCK_KEY0);
            self.write_reg(FMC_KEY0, UNLOCK_KEY1);
        }
    }

    fn lock(&mut self) {
        self.modify_ctl(CTL_LK, 0);
    }

    fn clear_flags(&mut self) {
        // Write-one-to-clear
        self.write_reg(FMC_STAT0, STAT_ENDF | STAT_WPERR | STAT_PGERR);
    }

    fn program_word(&mut self, address: u32, word: u32) -> FmcStatus {
        self.modify_ctl(CTL_PG, 0);
        // safety: the driver core validated `address` against the page
        // map before entering the critical section
        unsafe {
            ptr::write_volatile(address as *mut u32, word);
        }
        let status = self.wait_done();
        self.modify_ctl(0, CTL_PG);

        // Make the new contents visible before the read-back
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
        status
    }

    fn erase_unit(&mut self, code: u32) -> FmcStatus {
        // `code` is the page start address
        self.modify_ctl(CTL_PER, 0);
        self.write_reg(FMC_ADDR0, code);
        self.modify_ctl(CTL_START, 0);
        let status = self.wait_done();
        self.modify_ctl(0, CTL_PER);

        cortex_m::asm::dsb();
        cortex_m::asm::isb();
        status
    }

    fn read(&self, address: u32, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            // safety: the driver core validated the range before the
            // call; flash reads behave as ordinary memory reads
            *byte = unsafe { ptr::read_volatile((address as usize + i) as *const u8) };
        }
    }
}

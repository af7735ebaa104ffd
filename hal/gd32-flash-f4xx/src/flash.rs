//! FMC binding for GD32F4xx
//!
//! The F4xx lays flash out in two banks of twelve sectors each: four
//! 16KB sectors, one 64KB sector, then seven 128KB sectors per bank.
//! Sector sizes vary, so addresses resolve against the table below by
//! range lookup, never by stride arithmetic.
//!
//! The erase command takes a sector-select code, and the code space
//! is not contiguous in the logical index: bank1 codes start at 16,
//! leaving a gap of four after bank0's 0-11. Both the gap and the
//! upper bound come from the hardware's command encoding and cannot
//! be derived from the layout.

use core::ptr;

use gd32_flash_hal::{EraseUnit, FmcBus, FmcStatus, SectorMap};

/// Start of flash memory in address space
pub const FLASH_BASE: u32 = 0x0800_0000;

/// Size of flash memory (both banks)
pub const FLASH_SIZE: u32 = 2 * 1024 * 1024;

/// Number of sectors across both banks
pub const SECTOR_COUNT: usize = 24;

/// Iteration cap for busy-polling the controller (vendor library
/// constant)
const TIMEOUT_COUNT: u32 = 0x000F_FFFF;

// FMC register block
const FMC_BASE: usize = 0x4002_3C00;
const FMC_KEY: usize = FMC_BASE + 0x04;
const FMC_STAT: usize = FMC_BASE + 0x0C;
const FMC_CTL: usize = FMC_BASE + 0x10;

// Unlock key sequence
const UNLOCK_KEY0: u32 = 0x4567_0123;
const UNLOCK_KEY1: u32 = 0xCDEF_89AB;

// CTL bits
const CTL_PG: u32 = 1 << 0;
const CTL_SER: u32 = 1 << 1;
const CTL_SN_SHIFT: u32 = 3;
const CTL_SN_MASK: u32 = 0x1F << CTL_SN_SHIFT;
const CTL_PSZ_MASK: u32 = 0b11 << 8;
const CTL_PSZ_WORD: u32 = 0b10 << 8; // 32-bit program size
const CTL_START: u32 = 1 << 16;
const CTL_LK: u32 = 1 << 31;

// STAT bits
const STAT_END: u32 = 1 << 0;
const STAT_OPERR: u32 = 1 << 1;
const STAT_WPERR: u32 = 1 << 4;
const STAT_PGMERR: u32 = 1 << 6;
const STAT_PGSERR: u32 = 1 << 7;
const STAT_BUSY: u32 = 1 << 16;

const STAT_ERRORS: u32 = STAT_OPERR | STAT_WPERR | STAT_PGMERR | STAT_PGSERR;

/// Sector layout of one device: (start address, size) per logical
/// index, both banks
const SECTORS: [(u32, u32); SECTOR_COUNT] = [
    // Bank 0
    (0x0800_0000, 0x4000),   // sector 0, 16KB
    (0x0800_4000, 0x4000),   // sector 1, 16KB
    (0x0800_8000, 0x4000),   // sector 2, 16KB
    (0x0800_C000, 0x4000),   // sector 3, 16KB
    (0x0801_0000, 0x1_0000), // sector 4, 64KB
    (0x0802_0000, 0x2_0000), // sector 5, 128KB
    (0x0804_0000, 0x2_0000), // sector 6, 128KB
    (0x0806_0000, 0x2_0000), // sector 7, 128KB
    (0x0808_0000, 0x2_0000), // sector 8, 128KB
    (0x080A_0000, 0x2_0000), // sector 9, 128KB
    (0x080C_0000, 0x2_0000), // sector 10, 128KB
    (0x080E_0000, 0x2_0000), // sector 11, 128KB
    // Bank 1
    (0x0810_0000, 0x4000),   // sector 12, 16KB
    (0x0810_4000, 0x4000),   // sector 13, 16KB
    (0x0810_8000, 0x4000),   // sector 14, 16KB
    (0x0810_C000, 0x4000),   // sector 15, 16KB
    (0x0811_0000, 0x1_0000), // sector 16, 64KB
    (0x0812_0000, 0x2_0000), // sector 17, 128KB
    (0x0814_0000, 0x2_0000), // sector 18, 128KB
    (0x0816_0000, 0x2_0000), // sector 19, 128KB
    (0x0818_0000, 0x2_0000), // sector 20, 128KB
    (0x081A_0000, 0x2_0000), // sector 21, 128KB
    (0x081C_0000, 0x2_0000), // sector 22, 128KB
    (0x081E_0000, 0x2_0000), // sector 23, 128KB
];

/// Two-bank non-uniform sector map for the GD32F4xx
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BankedSectors;

impl SectorMap for BankedSectors {
    fn base(&self) -> u32 {
        FLASH_BASE
    }

    fn total_size(&self) -> u32 {
        FLASH_SIZE
    }

    fn unit_containing(&self, address: u32) -> Option<EraseUnit> {
        SECTORS
            .iter()
            .enumerate()
            .find(|(_, (start, size))| address >= *start && address < start + size)
            .map(|(index, (start, size))| EraseUnit {
                index: index as u32,
                start: *start,
                size: *size,
            })
    }

    fn hardware_code(&self, unit: &EraseUnit) -> u32 {
        match unit.index {
            0..=11 => unit.index,
            // Bank 1 sector-select codes are offset by 4 (hardware
            // command encoding, codes 16-27)
            12..=23 => unit.index + 4,
            _ => panic!("sector index {} outside the device table", unit.index),
        }
    }
}

/// GD32F4xx flash memory controller
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
        let value = self.read_reg(FMC_CTL);
        self.write_reg(FMC_CTL, (value & !clear) | set);
    }

    /// Poll until the controller leaves busy or the iteration cap is
    /// exhausted, then translate the latched flags
    fn wait_done(&mut self) -> FmcStatus {
        let mut timeout = TIMEOUT_COUNT;
        while self.read_reg(FMC_STAT) & STAT_BUSY != 0 {
            timeout -= 1;
            if timeout == 0 {
                return FmcStatus::Busy;
            }
        }

        if self.read_reg(FMC_STAT) & STAT_ERRORS != 0 {
            return FmcStatus::Fault;
        }
        FmcStatus::Ready
    }
}

impl FmcBus for Fmc {
    fn unlock(&mut self) {
        if self.read_reg(FMC_CTL) & CTL_LK != 0 {
            self.write_reg(FMC_KEY, UNLOCK_KEY0);
            self.write_reg(FMC_KEY, UNLOCK_KEY1);
        }
    }

    fn lock(&mut self) {
        self.modify_ctl(CTL_LK, 0);
    }

    fn clear_flags(&mut self) {
        // Write-one-to-clear
        self.write_reg(FMC_STAT, STAT_END | STAT_ERRORS);
    }

    fn program_word(&mut self, address: u32, word: u32) -> FmcStatus {
        self.modify_ctl(CTL_PG | CTL_PSZ_WORD, CTL_PSZ_MASK);
        // safety: the driver core validated `address` against the
        // sector map before entering the critical section
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
        // `code` is the sector-select value for CTL.SN
        self.modify_ctl(
            CTL_SER | (code << CTL_SN_SHIFT),
            CTL_SN_MASK,
        );
        self.modify_ctl(CTL_START, 0);
        let status = self.wait_done();
        self.modify_ctl(0, CTL_SER | CTL_SN_MASK);

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_contiguous_and_covers_region() {
        let mut expected = FLASH_BASE;
        for (start, size) in SECTORS {
            assert_eq!(start, expected);
            expected = start + size;
        }
        assert_eq!(expected, FLASH_BASE + FLASH_SIZE);
    }

    #[test]
    fn test_lookup_lands_on_sector_boundaries() {
        let map = BankedSectors;
        assert_eq!(map.unit_containing(0x0800_0000).unwrap().index, 0);
        assert_eq!(map.unit_containing(0x0800_3FFF).unwrap().index, 0);
        assert_eq!(map.unit_containing(0x0800_4000).unwrap().index, 1);
        assert_eq!(map.unit_containing(0x0800_FFFF).unwrap().index, 3);
        assert_eq!(map.unit_containing(0x0801_0000).unwrap().index, 4);
        assert_eq!(map.unit_containing(0x0801_FFFF).unwrap().index, 4);
        assert_eq!(map.unit_containing(0x0802_0000).unwrap().index, 5);
        assert_eq!(map.unit_containing(0x080F_FFFF).unwrap().index, 11);
        assert_eq!(map.unit_containing(0x0810_0000).unwrap().index, 12);
        assert_eq!(map.unit_containing(0x081F_FFFF).unwrap().index, 23);
    }

    #[test]
    fn test_lookup_outside_region_misses() {
        let map = BankedSectors;
        assert_eq!(map.unit_containing(FLASH_BASE - 1), None);
        assert_eq!(map.unit_containing(FLASH_BASE + FLASH_SIZE), None);
    }

    #[test]
    fn test_bank0_codes_map_directly() {
        let map = BankedSectors;
        for index in 0..12 {
            let unit = map.unit_containing(SECTORS[index].0).unwrap();
            assert_eq!(map.hardware_code(&unit), index as u32);
        }
    }

    #[test]
    fn test_bank1_codes_jump_by_four() {
        let map = BankedSectors;
        let first = map.unit_containing(0x0810_0000).unwrap();
        assert_eq!(map.hardware_code(&first), 16);
        let last = map.unit_containing(0x081F_FFFF).unwrap();
        assert_eq!(map.hardware_code(&last), 27);
    }

    #[test]
    #[should_panic(expected = "outside the device table")]
    fn test_code_for_index_past_table_panics() {
        let bogus = EraseUnit {
            index: 24,
            start: FLASH_BASE + FLASH_SIZE,
            size: 0x4000,
        };
        BankedSectors.hardware_code(&bogus);
    }

    #[test]
    fn test_mixed_size_span_scenario() {
        // [0x08000000, 0x08020000) intersects the four 16KB sectors
        // and the 64KB sector, exactly
        let map = BankedSectors;
        let first = map.unit_containing(0x0800_0000).unwrap();
        let last = map.unit_containing(0x0802_0000 - 1).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(last.index, 4);
        assert_eq!(last.end() - first.start, 0x2_0000);
    }
}

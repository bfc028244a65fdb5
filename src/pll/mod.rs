//! Clock generator chips on the SMBus.
//!
//! A PLL selects its FSB/SDRAM/PCI clocks from a small table indexed by a key whose bits are
//! scattered across one configuration register. All registers are reached with block-data
//! transfers: the chip answers a block read with its register file starting at register 0.

use core::fmt;

use tracing::{debug, error, info};

use crate::{smbus::SmBus, Error, Result};

pub mod freq_entry;

pub use freq_entry::{FreqEntry, FreqRequest, ParseFreqError};

/// Where the clock generators answer on the SMBus.
pub const SLAVE_ADDRESS: u8 = 0x69;
/// Command byte of every block transfer to the chip.
pub const COMMAND: u8 = 0x00;

/// A clock generator definition. Instances only live in the static catalogue.
#[derive(Debug)]
pub struct Pll {
    pub name: &'static str,
    /// Register holding the key bits.
    pub key_register: u8,
    /// Bit `i` of the key is bit `key_bits[i]` of the key register.
    pub key_bits: &'static [u8],
    /// Key to clocks, in key order.
    pub freq_table: &'static [(u8, FreqEntry)],
    /// Register and bit that enable the chip's SMBus interface.
    pub enable_register: u8,
    pub enable_bit: u8,
}

impl Pll {
    /// Number of distinct keys the key bits can express.
    pub fn key_space(&self) -> usize {
        1 << self.key_bits.len()
    }

    /// Gathers the scattered key bits out of a key register value.
    pub fn get_key(&self, register: u8) -> u8 {
        self.key_bits
            .iter()
            .enumerate()
            .fold(0, |key, (index, bit)| key | ((register >> bit) & 1) << index)
    }

    /// Scatters `key` into `register`, leaving every bit that is not a key bit alone.
    pub fn encode_key(&self, register: u8, key: u8) -> u8 {
        self.key_bits
            .iter()
            .enumerate()
            .fold(register, |register, (index, bit)| {
                let mask = 1 << bit;
                if (key >> index) & 1 == 1 {
                    register | mask
                } else {
                    register & !mask
                }
            })
    }

    /// First key whose table entry matches `entry` within tolerance.
    pub fn lookup_key(&self, entry: &FreqEntry) -> Option<u8> {
        self.freq_table
            .iter()
            .find(|(_, candidate)| candidate == entry)
            .map(|(key, _)| *key)
    }

    pub fn entry(&self, key: u8) -> Option<FreqEntry> {
        self.freq_table
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, entry)| *entry)
    }

    /// Reads the chip's register file and picks out `register`.
    fn read_register(&self, bus: &mut impl SmBus, register: u8) -> Result<(Vec<u8>, u8)> {
        let block = bus.read_block_data(SLAVE_ADDRESS, COMMAND).map_err(|e| {
            error!("{}: could not read block (register {:#04x})", self.name, register);
            e
        })?;
        debug!("{}: register file {:02x?}", self.name, block);

        match block.get(usize::from(register)) {
            Some(value) => {
                let value = *value;
                Ok((block, value))
            }
            None => {
                error!(
                    "{}: block of {} bytes does not reach register {:#04x}",
                    self.name,
                    block.len(),
                    register
                );
                Err(Error::ShortBlock {
                    register,
                    len: block.len(),
                })
            }
        }
    }

    /// Read-modify-write of one register. The chip only takes block writes from register 0, so
    /// the registers in front of `register` are written back with the values just read.
    fn update_register(
        &self,
        bus: &mut impl SmBus,
        register: u8,
        update: impl FnOnce(u8) -> u8,
    ) -> Result<u8> {
        let (mut block, old) = self.read_register(bus, register)?;
        let index = usize::from(register);
        let new = update(old);
        block.truncate(index + 1);
        block[index] = new;

        debug!(
            "{}: register {:#04x} {:#04x} -> {:#04x}",
            self.name, register, old, new
        );
        bus.write_block_data(SLAVE_ADDRESS, COMMAND, &block)
            .map_err(|e| {
                error!("{}: failed to write register {:#04x}", self.name, register);
                e
            })?;
        Ok(new)
    }

    /// Decodes the current clocks from the key register.
    pub fn get_fsb(&self, bus: &mut impl SmBus) -> Result<FreqEntry> {
        let (_, register) = self.read_register(bus, self.key_register)?;
        let key = self.get_key(register);
        debug!("{}: key register {:#04x}, key {}", self.name, register, key);

        self.entry(key).ok_or_else(|| {
            error!("{}: key {} not found in the frequency table", self.name, key);
            error!("{}", self.freq_table());
            Error::UnknownKey {
                key,
                value: register,
            }
        })
    }

    /// Programs the key for `entry` and re-enables the SMBus interface. Returns the key.
    pub fn set_fsb(&self, entry: &FreqEntry, bus: &mut impl SmBus) -> Result<u8> {
        let key = self.lookup_key(entry).ok_or_else(|| {
            error!("{}: {} not found in the frequency table", self.name, entry);
            error!("{}", self.freq_table());
            Error::UnmappedFrequency { entry: *entry }
        })?;
        debug!("{}: key {} for {}", self.name, key, entry);

        let register = self.update_register(bus, self.key_register, |old| {
            self.encode_key(old, key)
        })?;
        info!("{}: new key register {:#04x}", self.name, register);

        self.set_enabled(bus)?;
        Ok(key)
    }

    pub fn get_enabled(&self, bus: &mut impl SmBus) -> Result<bool> {
        let (_, register) = self.read_register(bus, self.enable_register)?;
        let enabled = register & self.enable_mask() != 0;
        debug!("{}: enabled = {}", self.name, enabled);
        Ok(enabled)
    }

    /// Sets the enable bit. There is deliberately no way to clear it.
    pub fn set_enabled(&self, bus: &mut impl SmBus) -> Result<()> {
        let mask = self.enable_mask();
        self.update_register(bus, self.enable_register, |old| old | mask)?;
        Ok(())
    }

    fn enable_mask(&self) -> u8 {
        1 << self.enable_bit
    }

    /// Presence probe: a quick write to the chip's address.
    pub fn check(&self, bus: &mut impl SmBus) -> Result<()> {
        bus.write_quick(SLAVE_ADDRESS).map_err(|e| {
            error!("{}: quick write failed", self.name);
            e
        })
    }

    pub fn freq_table(&self) -> FreqTable<'_> {
        FreqTable(self)
    }
}

impl fmt::Display for Pll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Printable frequency table of a [`Pll`].
pub struct FreqTable<'a>(&'a Pll);

impl fmt::Display for FreqTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FreqTable FSB/SDRAM/PCI   Divider")?;
        for (key, entry) in self.0.freq_table {
            write!(f, "\n{:>2}    : {}", key, entry)?;
        }
        Ok(())
    }
}

/// Winbond W83194R-630A, the clock generator found on SiS 630/540 boards.
pub const W83194R_630A: Pll = Pll {
    name: "W83194R-630A",
    key_register: 0,
    key_bits: &[4, 5, 6, 2],
    freq_table: &[
        (0, FreqEntry::new(66.8, 100.2, 33.4)),
        (1, FreqEntry::new(100.2, 100.2, 33.4)),
        (2, FreqEntry::new(83.3, 83.3, 33.2)),
        (3, FreqEntry::new(133.6, 100.2, 33.4)),
        (4, FreqEntry::new(75.0, 75.0, 37.5)),
        (5, FreqEntry::new(100.2, 133.6, 33.4)),
        (6, FreqEntry::new(100.2, 150.3, 33.4)),
        (7, FreqEntry::new(133.6, 133.6, 33.4)),
        (8, FreqEntry::new(66.8, 66.8, 33.4)),
        (9, FreqEntry::new(97.0, 97.0, 32.3)),
        (10, FreqEntry::new(97.0, 129.3, 32.3)),
        (11, FreqEntry::new(95.2, 95.2, 31.7)),
        (12, FreqEntry::new(140.0, 140.0, 35.0)),
        (13, FreqEntry::new(112.0, 112.0, 37.3)),
        (14, FreqEntry::new(96.2, 96.2, 32.1)),
        (15, FreqEntry::new(166.0, 166.0, 33.3)),
    ],
    enable_register: 0,
    enable_bit: 3,
};

pub static PLLS: &[Pll] = &[W83194R_630A];

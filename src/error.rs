use thiserror::Error;

use crate::{pci::config_space::Bdf, pll::freq_entry::FreqEntry};

#[derive(Error, Debug)]
pub enum Error {
    #[error("{name} at {bdf}: found vendor ID {found:#06x}, expected {expected:#06x}")]
    VendorMismatch {
        name: &'static str,
        bdf: Bdf,
        expected: u16,
        found: u16,
    },
    #[error("{name} at {bdf}: found device ID {found:#06x}, expected {expected:#06x}")]
    DeviceMismatch {
        name: &'static str,
        bdf: Bdf,
        expected: u16,
        found: u16,
    },
    #[error("no supported host bridge found")]
    HostBridgeNotFound,
    #[error("could not enable ACPI (BIOS control register {value:#04x})")]
    AcpiNotEnabled { value: u8 },
    #[error("bad SMBus base address {address:#06x} in LPC register {register:#04x}")]
    InvalidSmbusBase { register: u8, address: u16 },
    #[error("SMBus host or slave busy (control register {control:#04x})")]
    Busy { control: u8 },
    #[error("SMBus transfer failed (status register {status:#04x})")]
    TransferFailed { status: u8 },
    #[error("SMBus transfer timeout (status register {status:#04x})")]
    Timeout { status: u8 },
    #[error("block of {len} bytes exceeds the SMBus limit of 32")]
    BlockTooLarge { len: usize },
    #[error("block read returned {len} bytes, register {register:#04x} is out of range")]
    ShortBlock { register: u8, len: usize },
    #[error("key {key} (register value {value:#04x}) is not in the frequency table")]
    UnknownKey { key: u8, value: u8 },
    #[error("{entry} is not in the frequency table")]
    UnmappedFrequency { entry: FreqEntry },
    #[error("PLL '{0}' not supported")]
    UnsupportedPll(String),
    #[error("port I/O not permitted")]
    PortAccess(#[source] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

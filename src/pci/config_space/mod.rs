use core::fmt;

use modular_bitfield::{
    bitfield,
    specifiers::{B3, B5, B7, B8},
};
use tracing::debug;

use crate::{x86::PortIo, Error, Result};

use super::PciConfig;

mod macros;

pub const BUS_RANGE: core::ops::RangeInclusive<u8> = 0..=255;
pub const DEVICE_INDEX_RANGE: core::ops::Range<u8> = 0..32;
pub const FUNCTION_INDEX_RANGE: core::ops::Range<u8> = 0..8;

pub const VENDOR_ID_OFFSET: u8 = 0x0;
pub const DEVICE_ID_OFFSET: u8 = 0x2;

/// Layout of the CONFIG_ADDRESS port (configuration mechanism #1).
#[bitfield(bits = 32)]
#[repr(u32)]
#[derive(Clone, Copy, Debug)]
pub struct ConfigAddress {
    /// Dword aligned, the low two bits select the byte lane on the data port instead.
    pub register: B8,
    pub function: B3,
    pub device: B5,
    pub bus: B8,
    #[skip]
    __: B7,
    pub enabled: bool,
}

/// Geographical address of a PCI function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bdf {
    bus: u8,
    device: u8,
    function: u8,
}

impl Bdf {
    /// Device and function are truncated to their 5 and 3 bit widths.
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self {
            bus,
            device: device & 0x1f,
            function: function & 0x07,
        }
    }

    pub const fn bus(&self) -> u8 {
        self.bus
    }

    pub const fn device(&self) -> u8 {
        self.device
    }

    pub const fn function(&self) -> u8 {
        self.function
    }

    /// The value written to CONFIG_ADDRESS to reach `register` of this function.
    pub fn config_address(&self, register: u8) -> u32 {
        ConfigAddress::new()
            .with_register(register & 0xfc)
            .with_function(self.function)
            .with_device(self.device)
            .with_bus(self.bus)
            .with_enabled(true)
            .into()
    }

    /// Every possible function address, ascending by bus, device, then function.
    pub fn all() -> impl Iterator<Item = Bdf> {
        BUS_RANGE.flat_map(|bus| {
            DEVICE_INDEX_RANGE.flat_map(move |device| {
                FUNCTION_INDEX_RANGE.map(move |function| Bdf::new(bus, device, function))
            })
        })
    }
}

impl fmt::Display for Bdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VendorDeviceId {
    pub vendor_id: u16,
    pub device_id: u16,
}

impl VendorDeviceId {
    pub const fn new(vendor_id: u16, device_id: u16) -> Self {
        Self {
            vendor_id,
            device_id,
        }
    }
}

impl fmt::Display for VendorDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.device_id)
    }
}

/// A named PCI function that is expected at a fixed address.
///
/// The address comes from the catalogue, the IDs are what confirm the function is really there.
#[derive(Clone, Copy, Debug)]
pub struct FunctionBlock {
    pub name: &'static str,
    pub bdf: Bdf,
    pub id: VendorDeviceId,
}

impl PartialEq for FunctionBlock {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl FunctionBlock {
    pub const fn new(name: &'static str, vendor_id: u16, device_id: u16, bdf: Bdf) -> Self {
        Self {
            name,
            bdf,
            id: VendorDeviceId::new(vendor_id, device_id),
        }
    }

    /// Reads the vendor and device IDs back from `bdf` and compares them with the catalogue.
    /// The device ID is only read once the vendor matched.
    pub fn verify<P: PortIo>(&self, pci: &PciConfig<P>) -> Result<()> {
        let vendor_id = pci.get_vendor_id(self.bdf);
        if vendor_id != self.id.vendor_id {
            debug!(
                "{} at {}: vendor {:#06x}, expected {:#06x}",
                self.name, self.bdf, vendor_id, self.id.vendor_id
            );
            return Err(Error::VendorMismatch {
                name: self.name,
                bdf: self.bdf,
                expected: self.id.vendor_id,
                found: vendor_id,
            });
        }

        let device_id = pci.get_device_id(self.bdf);
        if device_id != self.id.device_id {
            debug!(
                "{} at {}: device {:#06x}, expected {:#06x}",
                self.name, self.bdf, device_id, self.id.device_id
            );
            return Err(Error::DeviceMismatch {
                name: self.name,
                bdf: self.bdf,
                expected: self.id.device_id,
                found: device_id,
            });
        }

        Ok(())
    }
}

impl fmt::Display for FunctionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.name, self.id, self.bdf)
    }
}

/*
   read here for more info:
       https://www.ics.uci.edu/~harris/ics216/pci/PCI_22.pdf
       https://en.wikipedia.org/wiki/PCI_configuration_space
*/

use crate::{impl_access_at_offset, x86::PortIo};

use self::config_space::{Bdf, VendorDeviceId, DEVICE_ID_OFFSET, VENDOR_ID_OFFSET};

pub mod config_space;
pub mod drivers;

pub const PCI_CONFIG_ADDRESS: u16 = 0xCF8;
pub const PCI_CONFIG_DATA: u16 = 0xCFC;

pub const PCI_INVALID_VENDOR: u16 = u16::MAX;

/// Configuration space access through the CONFIG_ADDRESS / CONFIG_DATA port pair.
///
/// Nothing is cached: every call is a fresh address write followed by a data access.
#[derive(Clone, Debug)]
pub struct PciConfig<P> {
    ports: P,
}

impl_access_at_offset!(u8);
impl_access_at_offset!(u32);

impl<P: PortIo> PciConfig<P> {
    pub fn new(ports: P) -> Self {
        Self { ports }
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    /// Little-endian composition of two byte reads.
    pub fn read_u16(&self, bdf: Bdf, register: u8) -> u16 {
        let low = self.read_u8(bdf, register);
        let high = self.read_u8(bdf, register.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    pub fn write_u16(&self, bdf: Bdf, register: u8, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_u8(bdf, register, low);
        self.write_u8(bdf, register.wrapping_add(1), high);
    }

    pub fn get_vendor_id(&self, bdf: Bdf) -> u16 {
        self.read_u16(bdf, VENDOR_ID_OFFSET)
    }

    pub fn get_device_id(&self, bdf: Bdf) -> u16 {
        self.read_u16(bdf, DEVICE_ID_OFFSET)
    }

    /// Both IDs from a single dword read.
    pub fn get_vendor_device_id(&self, bdf: Bdf) -> VendorDeviceId {
        let dword = self.read_u32(bdf, VENDOR_ID_OFFSET);
        VendorDeviceId::new(dword as u16, (dword >> 16) as u16)
    }

    /// Every function that answers on the bus.
    pub fn list_devices(&self) -> Vec<(Bdf, VendorDeviceId)> {
        let mut result = Vec::new();
        for_each_bdf(|bdf| {
            let id = self.get_vendor_device_id(bdf);
            if id.vendor_id != PCI_INVALID_VENDOR {
                result.push((bdf, id));
            }
            false
        });

        result
    }
}

/// Runs `visit` on every BDF in ascending order until it returns `true`.
pub fn for_each_bdf(mut visit: impl FnMut(Bdf) -> bool) {
    for bdf in Bdf::all() {
        if visit(bdf) {
            return;
        }
    }
}

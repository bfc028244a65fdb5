// SiS 540 host bridge. The SMBus host sits in the south bridge's ACPI I/O block, whose base is
// programmed into the LPC bridge function (00:01.0).

use bitflags::bitflags;
use tracing::{debug, error, info};

use crate::{
    pci::{
        config_space::{Bdf, FunctionBlock},
        PciConfig,
    },
    x86::PortIo,
    Error, Result,
};

use super::{BridgeKind, HostBridge};

pub const SIS_VENDOR_ID: u16 = 0x1039;
pub const SIS540_DEVICE_ID: u16 = 0x0540;
pub const SIS_LPC_DEVICE_ID: u16 = 0x0008;

pub const LPC_BIOS_CONTROL: u8 = 0x40;
pub const LPC_ACPI_BASE_ADDRESS: u8 = 0x74;

bitflags! {
    pub struct BiosControl: u8 {
        const ACPI_ENABLE = 1 << 7;
    }
}

pub const SIS_LPC: FunctionBlock =
    FunctionBlock::new("SiSLPC", SIS_VENDOR_ID, SIS_LPC_DEVICE_ID, Bdf::new(0, 1, 0));

pub const SIS540_BRIDGE_ENTRY: HostBridge = HostBridge {
    block: FunctionBlock::new("SiS540", SIS_VENDOR_ID, SIS540_DEVICE_ID, Bdf::new(0, 0, 0)),
    kind: BridgeKind::Sis540 { lpc: SIS_LPC },
};

/// Turns ACPI decoding on in the LPC bridge if the firmware left it off.
fn enable_acpi<P: PortIo>(lpc: &FunctionBlock, pci: &PciConfig<P>) -> Result<()> {
    let mut raw = pci.read_u8(lpc.bdf, LPC_BIOS_CONTROL);
    debug!("BIOS control register = {:#04x}", raw);

    if !BiosControl::from_bits_truncate(raw).contains(BiosControl::ACPI_ENABLE) {
        pci.write_u8(lpc.bdf, LPC_BIOS_CONTROL, raw | BiosControl::ACPI_ENABLE.bits());
        raw = pci.read_u8(lpc.bdf, LPC_BIOS_CONTROL);
        debug!("BIOS control register after enable = {:#04x}", raw);
    }

    if !BiosControl::from_bits_truncate(raw).contains(BiosControl::ACPI_ENABLE) {
        error!("could not enable ACPI");
        return Err(Error::AcpiNotEnabled { value: raw });
    }
    Ok(())
}

pub fn smbus_base_address<P: PortIo>(lpc: &FunctionBlock, pci: &PciConfig<P>) -> Result<u16> {
    lpc.verify(pci).map_err(|e| {
        error!("{}", e);
        e
    })?;
    enable_acpi(lpc, pci)?;

    let address = pci.read_u16(lpc.bdf, LPC_ACPI_BASE_ADDRESS);
    if address == 0 || address == u16::MAX {
        error!(
            "found bad SMBus address {:#06x} in LPC register {:#04x}",
            address, LPC_ACPI_BASE_ADDRESS
        );
        return Err(Error::InvalidSmbusBase {
            register: LPC_ACPI_BASE_ADDRESS,
            address,
        });
    }

    info!("Found SMBus addr: {:#06x}", address);
    Ok(address)
}

use core::fmt;

use tracing::info;

use crate::{delay::Delay, smbus::SisSmbus, x86::PortIo, Result};

use self::sis540::SIS540_BRIDGE_ENTRY;

use super::{config_space::FunctionBlock, PciConfig};

pub mod sis540;

/// Chip-specific part of a host bridge: how it exposes the SMBus base address.
#[derive(Clone, Copy, Debug)]
pub enum BridgeKind {
    /// The base lives in the ACPI I/O window of a companion LPC function.
    Sis540 { lpc: FunctionBlock },
}

#[derive(Clone, Copy, Debug)]
pub struct HostBridge {
    pub block: FunctionBlock,
    pub kind: BridgeKind,
}

impl HostBridge {
    pub fn name(&self) -> &'static str {
        self.block.name
    }

    /// Both IDs read back from the catalogue address match.
    pub fn is_present<P: PortIo>(&self, pci: &PciConfig<P>) -> bool {
        self.block.verify(pci).is_ok()
    }

    /// Does whatever the chip needs to expose its SMBus and returns the I/O base.
    pub fn smbus_base_address<P: PortIo>(&self, pci: &PciConfig<P>) -> Result<u16> {
        match &self.kind {
            BridgeKind::Sis540 { lpc } => sis540::smbus_base_address(lpc, pci),
        }
    }

    /// Discovers the SMBus base and hands back an engine bound to it, sharing the port backend.
    pub fn init_smbus<P, D>(&self, pci: &PciConfig<P>, delay: D) -> Result<SisSmbus<P, D>>
    where
        P: PortIo + Clone,
        D: Delay,
    {
        let base = self.smbus_base_address(pci)?;
        let smbus = SisSmbus::new(pci.ports().clone(), base, delay);
        info!("SMBus initialized: {}", smbus);
        Ok(smbus)
    }
}

impl fmt::Display for HostBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.block)?;
        match &self.kind {
            BridgeKind::Sis540 { lpc } => write!(f, ", SMBus through {}", lpc),
        }
    }
}

pub static HOST_BRIDGES: &[HostBridge] = &[SIS540_BRIDGE_ENTRY];

//! The catalogue of supported host bridges and clock generators.

use tracing::{error, info};

use crate::{
    pci::{
        drivers::{HostBridge, HOST_BRIDGES},
        PciConfig,
    },
    pll::{Pll, PLLS},
    x86::PortIo,
    Error, Result,
};

/// Built once at startup and only read afterwards.
#[derive(Clone, Copy, Debug)]
pub struct Chips {
    host_bridges: &'static [HostBridge],
    plls: &'static [Pll],
}

impl Default for Chips {
    fn default() -> Self {
        Self::new()
    }
}

impl Chips {
    pub fn new() -> Self {
        Self::with_catalogue(HOST_BRIDGES, PLLS)
    }

    pub fn with_catalogue(host_bridges: &'static [HostBridge], plls: &'static [Pll]) -> Self {
        Self { host_bridges, plls }
    }

    pub fn host_bridges(&self) -> &'static [HostBridge] {
        self.host_bridges
    }

    pub fn plls(&self) -> &'static [Pll] {
        self.plls
    }

    /// First catalogue bridge whose vendor and device IDs read back at its address.
    pub fn find_host_bridge<P: PortIo>(&self, pci: &PciConfig<P>) -> Result<&'static HostBridge> {
        match self.host_bridges.iter().find(|bridge| bridge.is_present(pci)) {
            Some(bridge) => {
                info!("Host bridge found: {}", bridge);
                Ok(bridge)
            }
            None => {
                error!("failed to find a supported host bridge");
                for bridge in self.host_bridges {
                    error!("  supported: {}", bridge);
                }
                Err(Error::HostBridgeNotFound)
            }
        }
    }

    /// Case-insensitive lookup by chip name.
    pub fn find_pll(&self, name: &str) -> Result<&'static Pll> {
        self.plls
            .iter()
            .find(|pll| pll.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnsupportedPll(name.to_owned()))
    }

    pub fn support_pll(&self, name: &str) -> bool {
        self.find_pll(name).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pll_lookup_ignores_case() {
        let chips = Chips::new();
        assert_eq!(chips.find_pll("w83194r-630a").unwrap().name, "W83194R-630A");
        assert!(chips.support_pll("W83194R-630A"));
        assert!(!chips.support_pll("ICS9248"));
        assert!(matches!(
            chips.find_pll("ICS9248"),
            Err(Error::UnsupportedPll(name)) if name == "ICS9248"
        ));
    }

    #[test]
    fn catalogue_holds_the_sis540() {
        let chips = Chips::default();
        assert_eq!(chips.host_bridges().len(), 1);
        assert_eq!(chips.host_bridges()[0].name(), "SiS540");
        assert_eq!(
            chips.host_bridges()[0].to_string(),
            "SiS540 (1039:0540) at 00:00.0, SMBus through SiSLPC (1039:0008) at 00:01.0"
        );
    }
}

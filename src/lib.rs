//! Reads and reprograms the clock generator of SiS 540 boards over the chipset's SMBus.
//!
//! Layers, bottom up: port I/O ([`x86`]), PCI configuration space ([`pci`]), the SiS SMBus host
//! ([`smbus`]), clock generator models ([`pll`]), and the catalogue tying them together
//! ([`chips`]).

pub mod chips;
pub mod delay;
pub mod error;
pub mod pci;
pub mod pll;
pub mod smbus;
pub mod x86;

pub use error::{Error, Result};

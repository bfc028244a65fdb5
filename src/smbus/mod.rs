//! System Management Bus host access.
//!
//! [`SmBus`] is the protocol surface the PLL model is written against; [`sis::SisSmbus`] is the
//! only host controller implementation.

use crate::Result;

pub mod registers;
pub mod sis;

pub use registers::TransferType;
pub use sis::SisSmbus;

/// Largest payload of a block transfer.
pub const BLOCK_MAX: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// The SMBus transfer protocols, addressed by 7-bit slave address.
///
/// Every call runs one complete host transaction. Failures come back as `Err` after the host
/// has been left with its sticky status bits cleared.
pub trait SmBus {
    /// Presence check with the read bit set, no data.
    fn read_quick(&mut self, address: u8) -> Result<()>;
    /// Presence check with the write bit set, no data.
    fn write_quick(&mut self, address: u8) -> Result<()>;
    /// Receive byte.
    fn read_byte(&mut self, address: u8) -> Result<u8>;
    /// Send byte: `command` is the only byte on the wire after the address.
    fn write_byte(&mut self, address: u8, command: u8) -> Result<()>;
    fn read_byte_data(&mut self, address: u8, command: u8) -> Result<u8>;
    fn write_byte_data(&mut self, address: u8, command: u8, value: u8) -> Result<()>;
    /// Up to [`BLOCK_MAX`] bytes, as many as the slave reports.
    fn read_block_data(&mut self, address: u8, command: u8) -> Result<Vec<u8>>;
    fn write_block_data(&mut self, address: u8, command: u8, data: &[u8]) -> Result<()>;
}

impl<S: SmBus + ?Sized> SmBus for &mut S {
    fn read_quick(&mut self, address: u8) -> Result<()> {
        (**self).read_quick(address)
    }

    fn write_quick(&mut self, address: u8) -> Result<()> {
        (**self).write_quick(address)
    }

    fn read_byte(&mut self, address: u8) -> Result<u8> {
        (**self).read_byte(address)
    }

    fn write_byte(&mut self, address: u8, command: u8) -> Result<()> {
        (**self).write_byte(address, command)
    }

    fn read_byte_data(&mut self, address: u8, command: u8) -> Result<u8> {
        (**self).read_byte_data(address, command)
    }

    fn write_byte_data(&mut self, address: u8, command: u8, value: u8) -> Result<()> {
        (**self).write_byte_data(address, command, value)
    }

    fn read_block_data(&mut self, address: u8, command: u8) -> Result<Vec<u8>> {
        (**self).read_block_data(address, command)
    }

    fn write_block_data(&mut self, address: u8, command: u8, data: &[u8]) -> Result<()> {
        (**self).write_block_data(address, command, data)
    }
}

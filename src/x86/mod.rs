//! Port-mapped I/O.
//!
//! Everything above this module talks to hardware through [`PortIo`], so the PCI accessor and
//! the SMBus engine can be driven by real `in`/`out` instructions, by [`NullPorts`] on machines
//! without the chipset, or by a simulated board in tests.

use std::rc::Rc;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod io;

/// The four port primitives the rest of the crate is built on.
///
/// Methods take `&self`: the port space is a single hardware resource and the crate only ever
/// drives it from one control-flow path at a time.
pub trait PortIo {
    fn read_u8(&self, port: u16) -> u8;
    fn read_u32(&self, port: u16) -> u32;
    fn write_u8(&self, port: u16, value: u8);
    fn write_u32(&self, port: u16, value: u32);
}

impl<T: PortIo + ?Sized> PortIo for &T {
    fn read_u8(&self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn read_u32(&self, port: u16) -> u32 {
        (**self).read_u32(port)
    }

    fn write_u8(&self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }

    fn write_u32(&self, port: u16, value: u32) {
        (**self).write_u32(port, value)
    }
}

impl<T: PortIo + ?Sized> PortIo for Rc<T> {
    fn read_u8(&self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn read_u32(&self, port: u16) -> u32 {
        (**self).read_u32(port)
    }

    fn write_u8(&self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }

    fn write_u32(&self, port: u16, value: u32) {
        (**self).write_u32(port, value)
    }
}

/// Ports on a machine without the hardware: writes vanish, reads return zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPorts;

impl PortIo for NullPorts {
    fn read_u8(&self, _port: u16) -> u8 {
        0
    }

    fn read_u32(&self, _port: u16) -> u32 {
        0
    }

    fn write_u8(&self, _port: u16, _value: u8) {}

    fn write_u32(&self, _port: u16, _value: u32) {}
}

/// Real `in`/`out` instructions.
///
/// Only obtainable through [`RawPorts::acquire`], which makes sure the process may execute them.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Clone, Copy, Debug)]
pub struct RawPorts {
    _private: (),
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl RawPorts {
    /// Raises the I/O privilege level so every port is reachable (the SMBus block lives above
    /// 0x3ff, out of reach of `ioperm`).
    #[cfg(target_os = "linux")]
    pub fn acquire() -> crate::Result<Self> {
        if unsafe { libc::iopl(3) } < 0 {
            return Err(crate::Error::PortAccess(std::io::Error::last_os_error()));
        }
        tracing::debug!("iopl(3) granted");
        Ok(Self { _private: () })
    }

    /// Without an OS-level gate the caller is trusted to already run with I/O privilege.
    #[cfg(not(target_os = "linux"))]
    pub fn acquire() -> crate::Result<Self> {
        Ok(Self { _private: () })
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for RawPorts {
    fn read_u8(&self, port: u16) -> u8 {
        unsafe { io::io_in_u8(port) }
    }

    fn read_u32(&self, port: u16) -> u32 {
        unsafe { io::io_in_u32(port) }
    }

    fn write_u8(&self, port: u16, value: u8) {
        unsafe { io::io_out_u8(port, value) }
    }

    fn write_u32(&self, port: u16, value: u32) {
        unsafe { io::io_out_u32(port, value) }
    }
}

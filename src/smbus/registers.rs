//! SiS 540/630 SMBus host register file.
//!
//! Offsets are relative to the ACPI I/O base discovered through the LPC bridge; the SMBus block
//! starts 0x80 into that space.
//!
//! The whole register file is listed, including registers and transfer types the host driver
//! never touches (enable, packet count, the slave-side registers, word data).

use core::marker::PhantomData;

use bitflags::bitflags;
use modular_bitfield::{
    bitfield,
    specifiers::{B1, B2, B7},
    BitfieldSpecifier,
};

use crate::x86::PortIo;

/// Anything that fits in one of the 8-bit SMBus registers.
pub trait RegisterValue: Copy {
    fn from_raw(raw: u8) -> Self;
    fn into_raw(self) -> u8;
}

impl RegisterValue for u8 {
    fn from_raw(raw: u8) -> Self {
        raw
    }

    fn into_raw(self) -> u8 {
        self
    }
}

/// A typed 8-bit port at a fixed offset from the SMBus base.
#[derive(Debug)]
pub struct IoRegister<T> {
    offset: u16,
    _value: PhantomData<T>,
}

impl<T> Clone for IoRegister<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IoRegister<T> {}

impl<T: RegisterValue> IoRegister<T> {
    pub const fn new(offset: u16) -> Self {
        Self {
            offset,
            _value: PhantomData,
        }
    }

    pub const fn offset(&self) -> u16 {
        self.offset
    }

    pub fn port(&self, base: u16) -> u16 {
        base.wrapping_add(self.offset)
    }

    pub fn read(&self, ports: &impl PortIo, base: u16) -> T {
        T::from_raw(ports.read_u8(self.port(base)))
    }

    pub fn write(&self, ports: &impl PortIo, base: u16, value: T) {
        ports.write_u8(self.port(base), value.into_raw())
    }
}

bitflags! {
    #[derive(Default)]
    pub struct Control: u8 {
        const HOST_BUSY = 1 << 0;
        const SLAVE_BUSY = 1 << 1;
        const HOST_MASTER_TIMEOUT = 1 << 6;

        const BUSY = Self::HOST_BUSY.bits | Self::SLAVE_BUSY.bits;
    }

    /// Write one to clear.
    #[derive(Default)]
    pub struct Status: u8 {
        const DEVICE_ERROR = 1 << 1;
        const COLLISION = 1 << 2;
        const TRANSFER_COMPLETE = 1 << 3;
        const BLOCK_FINISHED = 1 << 4;

        const ERRORS = Self::DEVICE_ERROR.bits | Self::COLLISION.bits;
    }
}

impl RegisterValue for Control {
    fn from_raw(raw: u8) -> Self {
        // Unnamed bits are written back untouched.
        unsafe { Control::from_bits_unchecked(raw) }
    }

    fn into_raw(self) -> u8 {
        self.bits()
    }
}

impl RegisterValue for Status {
    fn from_raw(raw: u8) -> Self {
        unsafe { Status::from_bits_unchecked(raw) }
    }

    fn into_raw(self) -> u8 {
        self.bits()
    }
}

/// Status bits kept (and so cleared) by the pre-transfer write. Bits 7, 6, 5 and 0 are left alone.
pub const STATUS_PRE_TRANSFER_MASK: u8 = 0x1e;
/// Clears every sticky completion and error bit.
pub const STATUS_CLEAR_STICKY: u8 = 0xff;

#[derive(BitfieldSpecifier, Clone, Copy, Debug, PartialEq, Eq)]
#[bits = 3]
pub enum TransferType {
    Quick = 0b000,
    Byte = 0b001,
    ByteData = 0b010,
    WordData = 0b011,
    BlockData = 0b101,
}

#[bitfield]
#[repr(u8)]
#[derive(Clone, Copy, Debug)]
pub struct HostControl {
    #[bits = 3]
    pub transfer_type: TransferType,
    #[skip]
    __: B1,
    pub start: bool,
    pub kill: bool,
    #[skip]
    __: B2,
}

/// Contents of the address register: 7-bit slave address plus the read/write bit.
#[bitfield]
#[repr(u8)]
#[derive(Clone, Copy, Debug)]
pub struct SlaveAddress {
    pub read: bool,
    pub address: B7,
}

macro_rules! impl_register_value_for_bitfield {
    ($t:ty) => {
        impl RegisterValue for $t {
            fn from_raw(raw: u8) -> Self {
                <$t>::from(raw)
            }

            fn into_raw(self) -> u8 {
                u8::from(self)
            }
        }
    };
}

impl_register_value_for_bitfield!(HostControl);
impl_register_value_for_bitfield!(SlaveAddress);

pub const SMB_STATUS: IoRegister<Status> = IoRegister::new(0x80);
pub const SMB_ENABLE: IoRegister<u8> = IoRegister::new(0x81);
pub const SMB_CONTROL: IoRegister<Control> = IoRegister::new(0x82);
pub const SMB_HOST_CONTROL: IoRegister<HostControl> = IoRegister::new(0x83);
pub const SMB_ADDRESS: IoRegister<SlaveAddress> = IoRegister::new(0x84);
pub const SMB_COMMAND: IoRegister<u8> = IoRegister::new(0x85);
pub const SMB_PACKET_COUNT: IoRegister<u8> = IoRegister::new(0x86);
pub const SMB_BYTE_COUNT: IoRegister<u8> = IoRegister::new(0x87);
pub const SMB_DATA_WINDOW: u16 = 0x88;
pub const SMB_DEVICE_ADDRESS: IoRegister<u8> = IoRegister::new(0x90);
pub const SMB_DATA_BYTE_0: IoRegister<u8> = IoRegister::new(0x91);
pub const SMB_DATA_BYTE_1: IoRegister<u8> = IoRegister::new(0x92);
pub const SMB_SLAVE_STATUS: IoRegister<u8> = IoRegister::new(0x93);

/// Bytes visible at once in the block data window.
pub const DATA_WINDOW_LEN: usize = 8;

/// One byte of the 8-byte block data window.
pub const fn smb_data(index: usize) -> IoRegister<u8> {
    IoRegister::new(SMB_DATA_WINDOW + (index % DATA_WINDOW_LEN) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_control_packs_start_kill_and_type() {
        let start_block = HostControl::new()
            .with_start(true)
            .with_transfer_type(TransferType::BlockData);
        assert_eq!(u8::from(start_block), 0x15);

        let kill = HostControl::new()
            .with_kill(true)
            .with_transfer_type(TransferType::Quick);
        assert_eq!(u8::from(kill), 0x20);

        let decoded = HostControl::from(0x12);
        assert!(decoded.start());
        assert!(!decoded.kill());
        assert_eq!(decoded.transfer_type(), TransferType::ByteData);
    }

    #[test]
    fn slave_address_shifts_in_the_direction_bit() {
        let read = SlaveAddress::new().with_address(0x69).with_read(true);
        assert_eq!(u8::from(read), 0xd3);
        let write = SlaveAddress::new().with_address(0x69).with_read(false);
        assert_eq!(u8::from(write), 0xd2);
    }

    #[test]
    fn control_keeps_unnamed_bits() {
        let control = Control::from_raw(0xa3);
        assert!(control.intersects(Control::BUSY));
        assert_eq!((control - Control::HOST_MASTER_TIMEOUT).into_raw(), 0xa3);
        assert_eq!(
            Control::from_raw(0xc0)
                .difference(Control::HOST_MASTER_TIMEOUT)
                .into_raw(),
            0x80
        );
    }

    #[test]
    fn register_file_layout() {
        assert_eq!(SMB_ENABLE.offset(), 0x81);
        assert_eq!(SMB_PACKET_COUNT.offset(), 0x86);
        assert_eq!(SMB_DEVICE_ADDRESS.offset(), 0x90);
        assert_eq!(SMB_DATA_BYTE_0.offset(), 0x91);
        assert_eq!(SMB_DATA_BYTE_1.offset(), 0x92);
        assert_eq!(SMB_SLAVE_STATUS.offset(), 0x93);

        let start_word = HostControl::new()
            .with_start(true)
            .with_transfer_type(TransferType::WordData);
        assert_eq!(u8::from(start_word), 0x13);
    }

    #[test]
    fn data_window_wraps_every_eight_bytes() {
        assert_eq!(smb_data(0).offset(), 0x88);
        assert_eq!(smb_data(7).offset(), 0x8f);
        assert_eq!(smb_data(9).offset(), 0x89);
    }
}

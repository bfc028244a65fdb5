//! SiS 540/630 SMBus host controller.
//!
//! One transaction is: wait for the host and slave to go idle (killing a wedged transfer if
//! needed), clear the flags left over from the previous transfer, program address, command and
//! data, start, then poll the status register. Whatever the outcome, the sticky status bits are
//! cleared before returning.

use core::fmt;

use tracing::{debug, error};

use crate::{delay::Delay, x86::PortIo, Error, Result};

use super::{
    registers::{
        smb_data, Control, HostControl, RegisterValue, SlaveAddress, Status, TransferType,
        DATA_WINDOW_LEN, SMB_ADDRESS, SMB_BYTE_COUNT, SMB_COMMAND, SMB_CONTROL, SMB_HOST_CONTROL,
        SMB_STATUS, STATUS_CLEAR_STICKY, STATUS_PRE_TRANSFER_MASK,
    },
    Direction, SmBus, BLOCK_MAX,
};

/// Wait after asserting kill before looking at the busy bits again.
pub const KILL_DELAY_MS: u32 = 100;
/// Further busy checks after the kill before giving up.
pub const BUSY_RETRIES: u32 = 10;
pub const BUSY_DELAY_MS: u32 = 100;
/// Status polls before a transfer counts as timed out.
pub const TRANSFER_TIMEOUT: u32 = 40;
pub const POLL_DELAY_MS: u32 = 100;

pub struct SisSmbus<P, D> {
    ports: P,
    delay: D,
    base: u16,
}

impl<P: PortIo, D: Delay> SisSmbus<P, D> {
    pub const NAME: &'static str = "SiSSMBus";

    /// `base` is the ACPI I/O base read from the LPC bridge.
    pub fn new(ports: P, base: u16, delay: D) -> Self {
        Self { ports, delay, base }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    fn status(&self) -> Status {
        SMB_STATUS.read(&self.ports, self.base)
    }

    fn write_status(&self, value: u8) {
        SMB_STATUS.write(&self.ports, self.base, Status::from_raw(value))
    }

    fn control(&self) -> Control {
        SMB_CONTROL.read(&self.ports, self.base)
    }

    fn set_control(&self, control: Control) {
        SMB_CONTROL.write(&self.ports, self.base, control)
    }

    fn set_host_control(&self, host_control: HostControl) {
        SMB_HOST_CONTROL.write(&self.ports, self.base, host_control)
    }

    fn set_address(&self, address: u8, direction: Direction) {
        let value = SlaveAddress::new()
            .with_address(address & 0x7f)
            .with_read(direction == Direction::Read);
        debug!("address register <- {:#04x}", u8::from(value));
        SMB_ADDRESS.write(&self.ports, self.base, value)
    }

    fn set_command(&self, command: u8) {
        SMB_COMMAND.write(&self.ports, self.base, command)
    }

    fn byte_count(&self) -> u8 {
        SMB_BYTE_COUNT.read(&self.ports, self.base)
    }

    fn set_byte_count(&self, count: u8) {
        SMB_BYTE_COUNT.write(&self.ports, self.base, count)
    }

    fn data(&self, index: usize) -> u8 {
        smb_data(index).read(&self.ports, self.base)
    }

    fn set_data(&self, index: usize, value: u8) {
        smb_data(index).write(&self.ports, self.base, value)
    }

    /// Lets the controller stage the next group of the block data window.
    fn rearm_block(&self) {
        self.write_status(Status::BLOCK_FINISHED.bits())
    }

    /// Returns the idle control register value, killing a stuck transfer on the way if needed.
    fn wait_until_idle(&mut self) -> Result<Control> {
        let mut control = self.control();
        if !control.intersects(Control::BUSY) {
            return Ok(control);
        }

        debug!("host or slave busy ({:#04x}), killing transfer", control.bits());
        self.set_host_control(
            HostControl::new()
                .with_kill(true)
                .with_transfer_type(TransferType::Quick),
        );
        self.delay.delay_ms(KILL_DELAY_MS);
        control = self.control();

        for _ in 0..BUSY_RETRIES {
            if !control.intersects(Control::BUSY) {
                return Ok(control);
            }
            self.delay.delay_ms(BUSY_DELAY_MS);
            control = self.control();
        }

        if control.intersects(Control::BUSY) {
            error!("host or slave busy (control {:#04x})", control.bits());
            return Err(Error::Busy {
                control: control.bits(),
            });
        }
        Ok(control)
    }

    /// Polls until the transfer completes, or for block transfers until the current group of the
    /// data window is done.
    fn wait_for_completion(&mut self, transfer_type: TransferType) -> Result<()> {
        let mut status = Status::empty();
        for _ in 0..TRANSFER_TIMEOUT {
            self.delay.delay_ms(POLL_DELAY_MS);
            status = self.status();
            if status.intersects(Status::ERRORS) {
                error!("transfer failed (status {:#04x})", status.bits());
                return Err(Error::TransferFailed {
                    status: status.bits(),
                });
            }
            if status.contains(Status::TRANSFER_COMPLETE)
                || (transfer_type == TransferType::BlockData
                    && status.contains(Status::BLOCK_FINISHED))
            {
                return Ok(());
            }
        }

        error!("transfer timeout (status {:#04x})", status.bits());
        Err(Error::Timeout {
            status: status.bits(),
        })
    }

    /// Idle check, flag clearing, `program`, start, poll.
    fn start(&mut self, transfer_type: TransferType, program: impl FnOnce(&Self)) -> Result<()> {
        let control = self.wait_until_idle()?;

        self.set_control(control - Control::HOST_MASTER_TIMEOUT);
        let status = self.status().bits();
        self.write_status(status & STATUS_PRE_TRANSFER_MASK);

        program(&*self);
        self.set_host_control(
            HostControl::new()
                .with_start(true)
                .with_transfer_type(transfer_type),
        );

        self.wait_for_completion(transfer_type)
    }

    /// Runs `f` and leaves the status register clean, whether `f` succeeded or not.
    fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        self.write_status(STATUS_CLEAR_STICKY);
        debug!("transaction finished: {}", if result.is_ok() { "ok" } else { "failed" });
        result
    }
}

impl<P: PortIo, D: Delay> SmBus for SisSmbus<P, D> {
    fn read_quick(&mut self, address: u8) -> Result<()> {
        debug!("SMBus read_quick(address={:#04x})", address);
        self.transaction(|bus| {
            bus.start(TransferType::Quick, |bus| {
                bus.set_address(address, Direction::Read)
            })
        })
    }

    fn write_quick(&mut self, address: u8) -> Result<()> {
        debug!("SMBus write_quick(address={:#04x})", address);
        self.transaction(|bus| {
            bus.start(TransferType::Quick, |bus| {
                bus.set_address(address, Direction::Write)
            })
        })
    }

    fn read_byte(&mut self, address: u8) -> Result<u8> {
        debug!("SMBus read_byte(address={:#04x})", address);
        self.transaction(|bus| {
            bus.start(TransferType::Byte, |bus| {
                bus.set_address(address, Direction::Read)
            })?;
            Ok(bus.data(0))
        })
    }

    fn write_byte(&mut self, address: u8, command: u8) -> Result<()> {
        debug!(
            "SMBus write_byte(address={:#04x}, command={:#04x})",
            address, command
        );
        self.transaction(|bus| {
            bus.start(TransferType::Byte, |bus| {
                bus.set_command(command);
                bus.set_address(address, Direction::Write);
            })
        })
    }

    fn read_byte_data(&mut self, address: u8, command: u8) -> Result<u8> {
        debug!(
            "SMBus read_byte_data(address={:#04x}, command={:#04x})",
            address, command
        );
        self.transaction(|bus| {
            bus.start(TransferType::ByteData, |bus| {
                bus.set_command(command);
                bus.set_address(address, Direction::Read);
            })?;
            Ok(bus.data(0))
        })
    }

    fn write_byte_data(&mut self, address: u8, command: u8, value: u8) -> Result<()> {
        debug!(
            "SMBus write_byte_data(address={:#04x}, command={:#04x}, value={:#04x})",
            address, command, value
        );
        self.transaction(|bus| {
            bus.start(TransferType::ByteData, |bus| {
                bus.set_command(command);
                bus.set_data(0, value);
                bus.set_address(address, Direction::Write);
            })
        })
    }

    fn read_block_data(&mut self, address: u8, command: u8) -> Result<Vec<u8>> {
        debug!(
            "SMBus read_block_data(address={:#04x}, command={:#04x})",
            address, command
        );
        self.transaction(|bus| {
            bus.start(TransferType::BlockData, |bus| {
                bus.set_command(command);
                bus.set_address(address, Direction::Read);
            })?;

            let len = usize::from(bus.byte_count()).min(BLOCK_MAX);
            let mut block = Vec::with_capacity(len);
            for index in 0..len {
                let offset = index % DATA_WINDOW_LEN;
                if offset == 0 && index != 0 {
                    bus.wait_for_completion(TransferType::BlockData)?;
                }
                block.push(bus.data(offset));
                if offset == DATA_WINDOW_LEN - 1 {
                    bus.rearm_block();
                }
            }

            debug!("SMBus read {} bytes: {:02x?}", block.len(), block);
            Ok(block)
        })
    }

    fn write_block_data(&mut self, address: u8, command: u8, data: &[u8]) -> Result<()> {
        debug!(
            "SMBus write_block_data(address={:#04x}, command={:#04x}, data={:02x?})",
            address, command, data
        );
        if data.len() > BLOCK_MAX {
            return Err(Error::BlockTooLarge { len: data.len() });
        }

        self.transaction(|bus| {
            let mut groups = data.chunks(DATA_WINDOW_LEN);
            let first = groups.next().unwrap_or_default();
            bus.start(TransferType::BlockData, |bus| {
                bus.set_command(command);
                bus.set_byte_count(data.len() as u8);
                for (index, byte) in first.iter().enumerate() {
                    bus.set_data(index, *byte);
                }
                bus.set_address(address, Direction::Write);
            })?;

            for group in groups {
                for (index, byte) in group.iter().enumerate() {
                    bus.set_data(index, *byte);
                }
                bus.rearm_block();
                bus.wait_for_completion(TransferType::BlockData)?;
            }
            Ok(())
        })
    }
}

impl<P, D> fmt::Display for SisSmbus<P, D>
where
    P: PortIo,
    D: Delay,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BaseAddr: {:#06x}", Self::NAME, self.base)
    }
}

impl<P, D> fmt::Debug for SisSmbus<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SisSmbus")
            .field("base", &format_args!("{:#06x}", self.base))
            .finish()
    }
}

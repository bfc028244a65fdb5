#![allow(dead_code)]

//! A simulated SiS 540 board: PCI configuration space for the host bridge and the LPC bridge,
//! the SiS SMBus host register file, and a W83194R-630A answering at 0x69.

use std::{cell::RefCell, collections::BTreeMap};

use sisfsb::{delay::Delay, x86::PortIo};

pub const CONFIG_ADDRESS: u16 = 0xcf8;
pub const CONFIG_DATA: u16 = 0xcfc;
pub const SMBUS_BASE: u16 = 0x0880;
pub const PLL_ADDRESS: u8 = 0x69;

pub const SMB_STS: u16 = 0x80;
pub const SMB_CNT: u16 = 0x82;
pub const SMB_HOST_CNT: u16 = 0x83;
pub const SMB_ADDR: u16 = 0x84;
pub const SMB_CMD: u16 = 0x85;
pub const SMB_COUNT: u16 = 0x87;
pub const SMB_BYTE0: u16 = 0x88;

const HOST_BUSY: u8 = 0x01;
const SLAVE_BUSY: u8 = 0x02;
const DEVICE_ERROR: u8 = 0x02;
const TRANSFER_COMPLETE: u8 = 0x08;
const BLOCK_FINISHED: u8 = 0x10;
const START: u8 = 0x10;
const KILL: u8 = 0x20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    In8(u16, u8),
    In32(u16, u32),
    Out8(u16, u8),
    Out32(u16, u32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BusyMode {
    #[default]
    Idle,
    /// Both busy bits stay up until a kill is issued.
    UntilKill,
    /// Only the slave busy bit is up, until a kill is issued.
    SlaveUntilKill,
    SlaveForever,
    /// Both busy bits are up for the first `n` reads of the control register.
    ForReads(usize),
    Forever,
}

#[derive(Debug, Default)]
pub struct Board {
    pub config_address: u32,
    pub functions: BTreeMap<(u8, u8, u8), [u8; 256]>,
    /// Writes to the LPC BIOS control register are dropped.
    pub bios_control_locked: bool,

    pub smbus_base: u16,
    pub smbus: [u8; 0x20],
    pub busy: BusyMode,
    pub killed: bool,
    pub kills: usize,
    pub control_reads: usize,
    pub starts: usize,
    /// Every transfer ends with the device error bit.
    pub fail_transfers: bool,
    /// Transfers never complete.
    pub stall_transfers: bool,

    /// Register file the PLL returns for a block read.
    pub pll: Vec<u8>,
    block: Vec<u8>,
    block_pos: usize,
    block_expected: usize,
    block_writing: bool,

    pub log: Vec<Access>,
}

impl Board {
    fn function(&self) -> Option<((u8, u8, u8), usize)> {
        let address = self.config_address;
        if address & 0x8000_0000 == 0 {
            return None;
        }
        let bdf = (
            (address >> 16) as u8,
            ((address >> 11) & 0x1f) as u8,
            ((address >> 8) & 0x7) as u8,
        );
        Some((bdf, (address & 0xfc) as usize))
    }

    fn config_read(&self, lane: usize) -> u8 {
        match self.function() {
            Some((bdf, register)) => self
                .functions
                .get(&bdf)
                .map_or(0xff, |space| space[register + lane]),
            None => 0xff,
        }
    }

    fn config_write(&mut self, lane: usize, value: u8) {
        let Some((bdf, register)) = self.function() else {
            return;
        };
        let register = register + lane;
        if self.bios_control_locked && bdf == (0, 1, 0) && register == 0x40 {
            return;
        }
        if let Some(space) = self.functions.get_mut(&bdf) {
            space[register] = value;
        }
    }

    fn smbus_offset(&self, port: u16) -> Option<usize> {
        let offset = port.checked_sub(self.smbus_base)?;
        (0x80..0xa0).contains(&offset).then(|| usize::from(offset - 0x80))
    }

    fn busy_bits(&self) -> u8 {
        match self.busy {
            BusyMode::Idle => 0,
            BusyMode::UntilKill | BusyMode::SlaveUntilKill if self.killed => 0,
            BusyMode::SlaveUntilKill | BusyMode::SlaveForever => SLAVE_BUSY,
            BusyMode::ForReads(n) if self.control_reads > n => 0,
            BusyMode::UntilKill | BusyMode::ForReads(_) | BusyMode::Forever => {
                HOST_BUSY | SLAVE_BUSY
            }
        }
    }

    fn smbus_read(&mut self, index: usize) -> u8 {
        if index == usize::from(SMB_CNT - 0x80) {
            self.control_reads += 1;
            self.smbus[index] | self.busy_bits()
        } else {
            self.smbus[index]
        }
    }

    fn smbus_write(&mut self, index: usize, value: u8) {
        match index {
            0x00 => {
                self.smbus[0] &= !value;
                if value & BLOCK_FINISHED != 0 {
                    self.next_block_group();
                }
            }
            0x03 => {
                self.smbus[3] = value;
                if value & KILL != 0 {
                    self.killed = true;
                    self.kills += 1;
                }
                if value & START != 0 {
                    self.start(value & 0x07);
                }
            }
            _ => self.smbus[index] = value,
        }
    }

    pub fn status(&self) -> u8 {
        self.smbus[0]
    }

    fn window(&mut self) -> &mut [u8] {
        &mut self.smbus[0x08..0x10]
    }

    fn stage_read_group(&mut self) {
        let end = (self.block_pos + 8).min(self.block.len());
        for (index, byte) in self.block[self.block_pos..end].to_vec().into_iter().enumerate() {
            self.window()[index] = byte;
        }
        self.block_pos = end;
        self.smbus[0] |= BLOCK_FINISHED;
        if self.block_pos >= self.block.len() {
            self.smbus[0] |= TRANSFER_COMPLETE;
        }
    }

    fn take_write_group(&mut self) {
        let take = (self.block_expected - self.block.len()).min(8);
        let group = self.window()[..take].to_vec();
        self.block.extend(group);
        self.smbus[0] |= BLOCK_FINISHED;
        if self.block.len() >= self.block_expected {
            for (register, byte) in self.block.clone().into_iter().enumerate() {
                if register < self.pll.len() {
                    self.pll[register] = byte;
                }
            }
            self.smbus[0] |= TRANSFER_COMPLETE;
        }
    }

    fn next_block_group(&mut self) {
        if self.block_writing {
            if self.block.len() < self.block_expected {
                self.take_write_group();
            }
        } else if self.block_pos < self.block.len() {
            self.stage_read_group();
        }
    }

    fn start(&mut self, transfer_type: u8) {
        self.starts += 1;
        self.block.clear();
        self.block_pos = 0;
        self.block_expected = 0;
        self.block_writing = false;

        if self.stall_transfers {
            return;
        }
        let address = self.smbus[0x04] >> 1;
        let read = self.smbus[0x04] & 1 == 1;
        if self.fail_transfers || address != PLL_ADDRESS {
            self.smbus[0] |= DEVICE_ERROR;
            return;
        }

        let command = usize::from(self.smbus[0x05]);
        match (transfer_type, read) {
            (0, _) => self.smbus[0] |= TRANSFER_COMPLETE,
            (1, true) => {
                self.smbus[0x08] = self.pll.first().copied().unwrap_or(0xff);
                self.smbus[0] |= TRANSFER_COMPLETE;
            }
            (1, false) => self.smbus[0] |= TRANSFER_COMPLETE,
            (2, true) => {
                self.smbus[0x08] = self.pll.get(command).copied().unwrap_or(0xff);
                self.smbus[0] |= TRANSFER_COMPLETE;
            }
            (2, false) => {
                let value = self.smbus[0x08];
                if let Some(register) = self.pll.get_mut(command) {
                    *register = value;
                }
                self.smbus[0] |= TRANSFER_COMPLETE;
            }
            (5, true) => {
                self.block = self.pll.clone();
                self.smbus[0x07] = self.block.len() as u8;
                self.stage_read_group();
            }
            (5, false) => {
                self.block_writing = true;
                self.block_expected = usize::from(self.smbus[0x07]);
                self.take_write_group();
            }
            _ => self.smbus[0] |= DEVICE_ERROR,
        }
    }
}

/// Shared through `&` or `Rc` so tests can look inside after driving it.
#[derive(Debug, Default)]
pub struct SimulatedBoard {
    pub state: RefCell<Board>,
}

impl SimulatedBoard {
    /// SiS 540 with ACPI already enabled, SMBus at 0x0880 and the PLL on key 0, interface enabled.
    pub fn sis540() -> Self {
        let mut host = [0xffu8; 256];
        host[..4].copy_from_slice(&[0x39, 0x10, 0x40, 0x05]);

        let mut lpc = [0u8; 256];
        lpc[..4].copy_from_slice(&[0x39, 0x10, 0x08, 0x00]);
        lpc[0x40] = 0x80;
        lpc[0x74..0x76].copy_from_slice(&SMBUS_BASE.to_le_bytes());

        let mut functions = BTreeMap::new();
        functions.insert((0, 0, 0), host);
        functions.insert((0, 1, 0), lpc);

        Self {
            state: RefCell::new(Board {
                functions,
                smbus_base: SMBUS_BASE,
                pll: vec![0x08, 0x00, 0xdf, 0xff, 0xff, 0x0b],
                ..Default::default()
            }),
        }
    }

    /// Only the SMBus host, no PCI functions.
    pub fn smbus_only() -> Self {
        Self {
            state: RefCell::new(Board {
                smbus_base: SMBUS_BASE,
                pll: vec![0x08, 0x00, 0xdf, 0xff, 0xff, 0x0b],
                ..Default::default()
            }),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut Board) -> T) -> T {
        f(&mut self.state.borrow_mut())
    }

    pub fn lpc_byte(&self, register: usize) -> u8 {
        self.state.borrow().functions[&(0, 1, 0)][register]
    }

    pub fn set_lpc_byte(&self, register: usize, value: u8) {
        self.with(|board| {
            if let Some(space) = board.functions.get_mut(&(0, 1, 0)) {
                space[register] = value;
            }
        })
    }

    /// Values written to one SMBus register, in order.
    pub fn smbus_writes(&self, offset: u16) -> Vec<u8> {
        let port = SMBUS_BASE + offset;
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|access| match access {
                Access::Out8(p, value) if *p == port => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn status(&self) -> u8 {
        self.state.borrow().status()
    }

    pub fn pll(&self) -> Vec<u8> {
        self.state.borrow().pll.clone()
    }
}

impl PortIo for SimulatedBoard {
    fn read_u8(&self, port: u16) -> u8 {
        let mut board = self.state.borrow_mut();
        let value = if (CONFIG_DATA..CONFIG_DATA + 4).contains(&port) {
            board.config_read(usize::from(port - CONFIG_DATA))
        } else if let Some(index) = board.smbus_offset(port) {
            board.smbus_read(index)
        } else {
            0xff
        };
        board.log.push(Access::In8(port, value));
        value
    }

    fn read_u32(&self, port: u16) -> u32 {
        let mut board = self.state.borrow_mut();
        let value = match port {
            CONFIG_ADDRESS => board.config_address,
            CONFIG_DATA => u32::from_le_bytes([
                board.config_read(0),
                board.config_read(1),
                board.config_read(2),
                board.config_read(3),
            ]),
            _ => u32::MAX,
        };
        board.log.push(Access::In32(port, value));
        value
    }

    fn write_u8(&self, port: u16, value: u8) {
        let mut board = self.state.borrow_mut();
        board.log.push(Access::Out8(port, value));
        if (CONFIG_DATA..CONFIG_DATA + 4).contains(&port) {
            board.config_write(usize::from(port - CONFIG_DATA), value);
        } else if let Some(index) = board.smbus_offset(port) {
            board.smbus_write(index, value);
        }
    }

    fn write_u32(&self, port: u16, value: u32) {
        let mut board = self.state.borrow_mut();
        board.log.push(Access::Out32(port, value));
        match port {
            CONFIG_ADDRESS => board.config_address = value,
            CONFIG_DATA => {
                for (lane, byte) in value.to_le_bytes().into_iter().enumerate() {
                    board.config_write(lane, byte);
                }
            }
            _ => {}
        }
    }
}

/// Records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub calls: Vec<u32>,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u32 {
        self.calls.iter().sum()
    }
}

impl Delay for RecordingDelay {
    fn delay_ms(&mut self, millis: u32) {
        self.calls.push(millis);
    }
}

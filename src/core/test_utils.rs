/// Shared helpers for the core tests.

use super::{Arch, Cpu};
use crate::bus::Bus;

pub const CODE_BASE: u32 = 0x100;

/// Flat little-endian RAM with a configurable wait-state count.
pub struct TestBus {
    pub mem: Vec<u8>,
    pub wait: i64,
}

impl TestBus {
    pub fn new() -> Self {
        TestBus {
            mem: vec![0; 64 * 1024],
            wait: 0,
        }
    }
}

impl Bus for TestBus {
    fn read8(&mut self, addr: u32) -> u8 {
        self.mem[addr as usize]
    }
    fn write8(&mut self, addr: u32, data: u8) {
        self.mem[addr as usize] = data;
    }

    fn read16(&mut self, addr: u32) -> u16 {
        u16::from(self.read8(addr)) | (u16::from(self.read8(addr + 1)) << 8)
    }
    fn write16(&mut self, addr: u32, data: u16) {
        self.write8(addr, data as u8);
        self.write8(addr + 1, (data >> 8) as u8);
    }

    fn read32(&mut self, addr: u32) -> u32 {
        u32::from(self.read16(addr)) | (u32::from(self.read16(addr + 2)) << 16)
    }
    fn write32(&mut self, addr: u32, data: u32) {
        self.write16(addr, data as u16);
        self.write16(addr + 2, (data >> 16) as u16);
    }

    fn wait_states(&self) -> i64 {
        self.wait
    }
}

/// A CPU in Thumb state with `code` assembled at CODE_BASE.
pub fn thumb_cpu(arch: Arch, code: &[u16]) -> Cpu<TestBus> {
    let mut bus = TestBus::new();
    for (i, op) in code.iter().enumerate() {
        bus.write16(CODE_BASE + (i as u32) * 2, *op);
    }
    let mut cpu = Cpu::new(arch, bus);
    cpu.cpsr.set_t(true);
    cpu.set_pc(CODE_BASE);
    cpu
}

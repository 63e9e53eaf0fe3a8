use crate::Handler;
use alloc::collections::BTreeMap;

/// A [`Handler`] over sparse in-memory address and port spaces, so region accesses made
/// during tests round-trip instead of touching hardware.
pub(crate) struct TestHandler {
    memory: BTreeMap<usize, u8>,
    ports: BTreeMap<u16, u8>,
}

impl TestHandler {
    pub(crate) fn new() -> TestHandler {
        TestHandler { memory: BTreeMap::new(), ports: BTreeMap::new() }
    }
}

impl Handler for TestHandler {
    fn read_u8(&mut self, address: usize) -> u8 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    fn read_u16(&mut self, address: usize) -> u16 {
        u16::from_le_bytes([self.read_u8(address), self.read_u8(address + 1)])
    }

    fn read_u32(&mut self, address: usize) -> u32 {
        u32::from_le_bytes([
            self.read_u8(address),
            self.read_u8(address + 1),
            self.read_u8(address + 2),
            self.read_u8(address + 3),
        ])
    }

    fn read_u64(&mut self, address: usize) -> u64 {
        (self.read_u32(address) as u64) | ((self.read_u32(address + 4) as u64) << 32)
    }

    fn write_u8(&mut self, address: usize, value: u8) {
        self.memory.insert(address, value);
    }

    fn write_u16(&mut self, address: usize, value: u16) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.write_u8(address + i, *byte);
        }
    }

    fn write_u32(&mut self, address: usize, value: u32) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.write_u8(address + i, *byte);
        }
    }

    fn write_u64(&mut self, address: usize, value: u64) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.write_u8(address + i, *byte);
        }
    }

    fn read_io_u8(&mut self, port: u16) -> u8 {
        self.ports.get(&port).copied().unwrap_or(0)
    }

    fn read_io_u16(&mut self, port: u16) -> u16 {
        u16::from_le_bytes([self.read_io_u8(port), self.read_io_u8(port + 1)])
    }

    fn read_io_u32(&mut self, port: u16) -> u32 {
        u32::from_le_bytes([
            self.read_io_u8(port),
            self.read_io_u8(port + 1),
            self.read_io_u8(port + 2),
            self.read_io_u8(port + 3),
        ])
    }

    fn write_io_u8(&mut self, port: u16, value: u8) {
        self.ports.insert(port, value);
    }

    fn write_io_u16(&mut self, port: u16, value: u16) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.write_io_u8(port + i as u16, *byte);
        }
    }

    fn write_io_u32(&mut self, port: u16, value: u32) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.write_io_u8(port + i as u16, *byte);
        }
    }
}

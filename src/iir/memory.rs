//! Synchronous block memory with a single engine port.
use alloc::{vec, vec::Vec};

/// One clock cycle worth of engine port signals.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Port {
    pub adr: usize,
    pub dat_w: u64,
    pub we: bool,
}

impl Port {
    pub fn read(adr: usize) -> Self {
        Self {
            adr,
            ..Default::default()
        }
    }
}

/// Block memory with one cycle read latency.
///
/// The port is write-first: a read of the address being written returns
/// the new data in the next cycle. Host access through [`Memory::read`] and
/// [`Memory::write`] bypasses the port and must only happen between cycles.
#[derive(Clone, Debug)]
pub struct Memory {
    words: Vec<u64>,
    dat_r: u64,
}

impl Memory {
    pub fn new(depth: usize) -> Self {
        Self {
            words: vec![0; depth],
            dat_r: 0,
        }
    }

    /// Registered read data, addressed by the previous cycle's port.
    pub fn dat_r(&self) -> u64 {
        self.dat_r
    }

    /// Clock the engine port.
    pub fn clock(&mut self, port: Port) {
        let word = &mut self.words[port.adr];
        if port.we {
            *word = port.dat_w;
        }
        self.dat_r = *word;
    }

    pub fn read(&self, adr: usize) -> u64 {
        self.words[adr]
    }

    pub fn write(&mut self, adr: usize, value: u64) {
        self.words[adr] = value;
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }
}

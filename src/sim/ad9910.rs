//! AD9910 serial port receiver model.
use alloc::{vec, vec::Vec};

use ad9910::{Instruction, Profile};

use crate::dds::Dds;

pub struct Ad9910 {
    width: u32,
    shift: Vec<u128>,
    count: Vec<u32>,
    cs: bool,
    sck: bool,
    profiles: Vec<Option<(Instruction, Profile)>>,
    errors: usize,
}

impl Ad9910 {
    pub fn new(channels: usize, width: u32) -> Self {
        Self {
            width,
            shift: vec![0; channels],
            count: vec![0; channels],
            cs: false,
            sck: false,
            profiles: vec![None; channels],
            errors: 0,
        }
    }

    /// Last profile made effective by IO_UPDATE.
    pub fn profile(&self, channel: usize) -> Option<(Instruction, Profile)> {
        self.profiles[channel]
    }

    /// Number of malformed transfers received.
    pub fn errors(&self) -> usize {
        self.errors
    }

    fn latch(&mut self, channel: usize) {
        if self.count[channel] != self.width || self.width != ad9910::FRAME_BITS
        {
            self.errors += 1;
            return;
        }
        let mut frame = [0; 9];
        frame.copy_from_slice(&self.shift[channel].to_be_bytes()[7..]);
        match ad9910::decode(&frame) {
            Ok(p) => self.profiles[channel] = Some(p),
            Err(e) => {
                log::warn!("Channel {channel}: {e}");
                self.errors += 1;
            }
        }
    }

    /// Sample the serial bus of the servo.
    pub fn tick(&mut self, dds: &Dds) {
        let cs = !dds.cs_n();
        if cs && !self.cs {
            self.shift.iter_mut().for_each(|sr| *sr = 0);
            self.count.iter_mut().for_each(|n| *n = 0);
        }
        if cs && dds.sck() && !self.sck {
            for (channel, (sr, n)) in
                self.shift.iter_mut().zip(self.count.iter_mut()).enumerate()
            {
                *sr = *sr << 1 | dds.mosi(channel) as u128;
                *n += 1;
            }
        }
        if dds.io_update() {
            for channel in 0..self.shift.len() {
                self.latch(channel);
            }
        }
        self.cs = cs;
        self.sck = dds.sck();
    }
}

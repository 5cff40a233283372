//! DDS profile serializer.
//!
//! # Design
//! All channels are written in parallel: one MOSI line per channel with a
//! shared chip select and serial clock. A frame is the AD9910 instruction
//! byte for a single tone profile write followed by the assembled profile
//! word, MSB first. Each bit is presented for a setup slot (SCK low) and a
//! hold slot (SCK high) of `clk` cycles each. The receiver samples on the
//! rising SCK edge. A final setup slot closes the transfer.
//!
//! IO_UPDATE is pulsed for one cycle on the rising edge of the (optionally
//! delayed) done signal to make the new profile effective.
use alloc::{vec, vec::Vec};
use arbitrary_int::u3;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{at_most, positive, Error},
    design_parameters,
    iir::DdsWord,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdsParams {
    /// Frame width including the instruction byte
    pub width: u32,
    /// Number of channels
    pub channels: usize,
    /// SCK half period in system clock cycles
    pub clk: u32,
    /// IO_UPDATE delay after the end of the transfer
    pub io_update_delay: u32,
}

impl Default for DdsParams {
    fn default() -> Self {
        use design_parameters::*;
        Self {
            width: DDS_WIDTH,
            channels: ADC_CHANNELS,
            clk: DDS_CLK_DIV,
            io_update_delay: DDS_IO_UPDATE_DELAY,
        }
    }
}

impl DdsParams {
    pub fn validate(&self) -> Result<(), Error> {
        positive("width", self.width)?;
        positive("channels", self.channels)?;
        positive("clk", self.clk)?;
        at_most("width", self.width, 128)?;
        at_most("io_update_delay", self.io_update_delay, 62)?;
        if self.width <= 8 {
            return Err(Error::Widths("DDS width > 8"));
        }
        Ok(())
    }

    /// Cycles from an accepted start until `done` is asserted again.
    pub fn latency(&self) -> u32 {
        (2 * self.width + 1) * self.clk + 1
    }

    /// Minimum spacing of starts: the IO_UPDATE pulse of a transfer must
    /// not fall into the next one.
    pub fn period(&self) -> u32 {
        self.latency() + self.io_update_delay
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Setup,
    Hold,
}

pub struct Dds {
    params: DdsParams,
    cmd: u8,
    state: State,
    count: u32,
    bits: u32,
    data: Vec<u128>,
    // done of previous cycles, bit i: i + 1 cycles ago
    history: u64,
}

impl Dds {
    pub fn new(params: DdsParams) -> Result<Self, Error> {
        params.validate()?;
        log::debug!(
            "DDS: {} bit frames, {} cycles",
            params.width,
            params.latency()
        );
        Ok(Self {
            params,
            cmd: ad9910::Instruction::write_profile(u3::new(0)).raw_value(),
            state: State::Idle,
            count: 0,
            bits: 0,
            data: vec![0; params.channels],
            history: u64::MAX,
        })
    }

    pub fn params(&self) -> &DdsParams {
        &self.params
    }

    pub fn done(&self) -> bool {
        self.state == State::Idle
    }

    /// Chip select, active low.
    pub fn cs_n(&self) -> bool {
        self.state == State::Idle
    }

    pub fn sck(&self) -> bool {
        self.state == State::Hold
    }

    pub fn mosi(&self, channel: usize) -> bool {
        (self.data[channel] >> (self.params.width - 1)) & 1 != 0
    }

    pub fn io_update(&self) -> bool {
        match self.params.io_update_delay {
            0 => self.done() && self.history & 1 == 0,
            d => (self.history >> (d - 1)) & 3 == 1,
        }
    }

    /// Advance by one clock cycle.
    ///
    /// # Args
    /// * `start`: Begin a transfer, only accepted when done
    /// * `words`: Assembled output words, latched on start
    /// * `word`: Output word field width
    pub fn tick(&mut self, start: bool, words: &[DdsWord], word: u32) {
        debug_assert!(!start || self.done(), "DDS started while busy");
        let ce = self.count == 0;
        let mut reload = false;
        let mut next = self.state;
        match self.state {
            State::Idle => {
                if start {
                    reload = true;
                    next = State::Setup;
                }
            }
            State::Setup => {
                if self.bits == 0 {
                    next = State::Idle;
                } else {
                    reload = true;
                    next = State::Hold;
                }
            }
            State::Hold => {
                reload = true;
                next = State::Setup;
            }
        }

        self.history = self.history << 1 | self.done() as u64;
        if ce {
            match self.state {
                State::Idle if start => {
                    let w = self.params.width;
                    let m = u128::MAX >> (128 - w);
                    for (d, p) in self.data.iter_mut().zip(words) {
                        *d = ((self.cmd as u128) << (w - 8) | p.raw(word)) & m;
                    }
                    self.bits = w;
                }
                State::Hold => {
                    self.bits -= 1;
                    for d in self.data.iter_mut() {
                        *d <<= 1;
                    }
                }
                _ => {}
            }
            self.state = next;
            if reload {
                self.count = self.params.clk - 1;
            }
        } else {
            self.count -= 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn transfer(params: DdsParams) -> (Option<u32>, Vec<u32>, Vec<u128>) {
        let mut dds = Dds::new(params).unwrap();
        let words = vec![
            DdsWord {
                ftw0: 0x1727,
                ftw1: 0x1929,
                pow: 0x1333,
                asf: 0x0143,
            };
            params.channels
        ];
        let mut updates = vec![];
        let mut frame = vec![0u128; params.channels];
        dds.tick(true, &words, 16);
        let mut t = 1;
        let mut sck = false;
        let mut done = None;
        while t < 2 * params.latency() {
            if dds.sck() && !sck {
                assert!(!dds.cs_n());
                for (i, f) in frame.iter_mut().enumerate() {
                    *f = *f << 1 | dds.mosi(i) as u128;
                }
            }
            sck = dds.sck();
            if dds.io_update() {
                updates.push(t);
            }
            if dds.done() {
                done.get_or_insert(t);
            }
            dds.tick(false, &words, 16);
            t += 1;
        }
        (done, updates, frame)
    }

    #[test]
    fn frame() {
        for clk in [1, 2, 5] {
            let p = DdsParams {
                clk,
                ..Default::default()
            };
            let (done, updates, frame) = transfer(p);
            assert_eq!(done, Some(p.latency()));
            assert_eq!(updates, vec![p.latency()]);
            for f in frame {
                assert_eq!(f, 0x0e_0143_1333_1929_1727);
            }
        }
    }

    #[test]
    fn io_update_delay() {
        let p = DdsParams {
            io_update_delay: 3,
            ..Default::default()
        };
        let (done, updates, _) = transfer(p);
        assert_eq!(done, Some(p.latency()));
        assert_eq!(updates, vec![p.latency() + 3]);
        assert_eq!(p.period(), p.latency() + 3);
    }

    #[test]
    #[should_panic(expected = "DDS started while busy")]
    fn start_while_busy() {
        let mut dds = Dds::new(DdsParams::default()).unwrap();
        let words = [DdsWord::default(); 8];
        dds.tick(true, &words, 16);
        dds.tick(true, &words, 16);
    }
}

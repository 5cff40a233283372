//! Multi-lane DDR ADC acquisition controller (LTC2320 family).
//!
//! # Design
//! A sampling cycle is sequenced by a single down counter which reloads
//! from a per state value whenever it expires:
//!
//! * CONVERT_HOLD: `cnv` asserted for `t_cnvh` cycles
//! * CONVERT: the conversion takes `t_conv` cycles
//! * READ: `sck` runs for `t_read = width * channels / lanes / 2` cycles
//! * ROUND_TRIP: `t_rtt` cycles to collect the last bits returning from
//!   the ADC
//!
//! The serial clock enable is registered, so it is raised one cycle early,
//! in the last CONVERT cycle, and dropped in the last READ cycle.
//!
//! Data returns on one line per lane with a clock echoed by the ADC. Both
//! edges carry a bit, so each returned clock cycle shifts two bits per lane
//! into the lane shift register while `reading`. After a complete cycle a
//! lane holds `channels / lanes` samples back to back, the first channel
//! in the most significant bits.
//!
//! # Limitations
//! The returned clock is assumed to be phase aligned to the system clock
//! with a round trip delay of at most `t_rtt` cycles. Bits arriving outside
//! the `reading` window are lost.
use alloc::{vec, vec::Vec};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{at_most, positive, Error},
    design_parameters,
    tools::{mask, sext},
};

/// Deserializer lane register width.
const LANE_BITS: usize = 128;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcParams {
    /// Number of channels
    pub channels: usize,
    /// Number of DDR data lanes
    pub lanes: usize,
    /// Sample width
    pub width: u32,
    /// CNV high time
    pub t_cnvh: u32,
    /// Conversion time
    pub t_conv: u32,
    /// Maximum serial clock round trip time
    pub t_rtt: u32,
}

impl Default for AdcParams {
    fn default() -> Self {
        use design_parameters::*;
        Self {
            channels: ADC_CHANNELS,
            lanes: ADC_LANES,
            width: ADC_WIDTH,
            t_cnvh: ADC_T_CNVH,
            t_conv: ADC_T_CONV,
            t_rtt: ADC_T_RTT,
        }
    }
}

impl AdcParams {
    pub fn validate(&self) -> Result<(), Error> {
        positive("channels", self.channels)?;
        positive("lanes", self.lanes)?;
        positive("width", self.width)?;
        positive("t_cnvh", self.t_cnvh)?;
        positive("t_conv", self.t_conv)?;
        positive("t_rtt", self.t_rtt)?;
        at_most("width", self.width, 32)?;
        let bits = self.width as usize * self.channels;
        if self.channels % self.lanes != 0 || bits % (2 * self.lanes) != 0 {
            return Err(Error::LaneSplit {
                channels: self.channels,
                lanes: self.lanes,
                width: self.width,
            });
        }
        if self.lane_bits() > LANE_BITS {
            return Err(Error::LaneWidth(self.lane_bits()));
        }
        Ok(())
    }

    /// Bits transferred per lane and cycle.
    pub fn lane_bits(&self) -> usize {
        self.width as usize * self.channels / self.lanes
    }

    /// Serial clock cycles per sampling cycle.
    pub fn t_read(&self) -> u32 {
        (self.lane_bits() / 2) as u32
    }

    /// Cycles from an accepted start until `done` is asserted again.
    pub fn latency(&self) -> u32 {
        1 + self.t_cnvh + self.t_conv + self.t_read() + self.t_rtt
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Idle,
    ConvertHold,
    Convert,
    Read,
    RoundTrip,
}

pub struct Adc {
    params: AdcParams,
    state: State,
    count: u32,
    sck_en: bool,
    lanes: Vec<u128>,
}

impl Adc {
    pub fn new(params: AdcParams) -> Result<Self, Error> {
        params.validate()?;
        log::debug!(
            "ADC: {} channels on {} lanes, {} cycles",
            params.channels,
            params.lanes,
            params.latency()
        );
        Ok(Self {
            params,
            state: State::Idle,
            count: 0,
            sck_en: false,
            lanes: vec![0; params.lanes],
        })
    }

    pub fn params(&self) -> &AdcParams {
        &self.params
    }

    pub fn done(&self) -> bool {
        self.state == State::Idle
    }

    /// Returned data is accepted.
    pub fn reading(&self) -> bool {
        matches!(self.state, State::Read | State::RoundTrip)
    }

    /// Conversion start strobe.
    pub fn cnv(&self) -> bool {
        self.state == State::ConvertHold
    }

    /// Serial clock output: one pulse per cycle while asserted.
    pub fn sck(&self) -> bool {
        self.sck_en
    }

    /// Deserialized sample of a channel, sign extended.
    pub fn sample(&self, channel: usize) -> i32 {
        let k = self.params.channels / self.params.lanes;
        let lane = self.lanes[channel / k];
        let pos = (k - 1 - channel % k) as u32 * self.params.width;
        sext((lane >> pos) as u64 & mask(self.params.width), self.params.width)
            as i32
    }

    /// Advance by one clock cycle.
    ///
    /// # Args
    /// * `start`: Begin a sampling cycle, only accepted when done
    /// * `ret`: Two bits (first bit in bit 1) per lane returned this cycle
    pub fn tick(&mut self, start: bool, ret: Option<&[u8]>) {
        debug_assert!(!start || self.done(), "ADC started while busy");
        let p = &self.params;
        let count_done = self.count == 0;
        let mut load = 0;
        let mut sck_en = false;
        let mut next = self.state;
        match self.state {
            State::Idle => {
                if start {
                    load = p.t_cnvh - 1;
                    next = State::ConvertHold;
                }
            }
            State::ConvertHold => {
                load = p.t_conv - 1;
                if count_done {
                    next = State::Convert;
                }
            }
            State::Convert => {
                load = p.t_read() - 1;
                if count_done {
                    sck_en = true;
                    next = State::Read;
                }
            }
            State::Read => {
                load = p.t_rtt - 1;
                if count_done {
                    next = State::RoundTrip;
                } else {
                    sck_en = true;
                }
            }
            State::RoundTrip => {
                if count_done {
                    next = State::Idle;
                }
            }
        }

        if let (true, Some(bits)) = (self.reading(), ret) {
            let m = if p.lane_bits() >= LANE_BITS {
                u128::MAX
            } else {
                (1u128 << p.lane_bits()) - 1
            };
            for (lane, b) in self.lanes.iter_mut().zip(bits) {
                *lane = ((*lane << 2) | (*b & 3) as u128) & m;
            }
        }

        self.count = if count_done { load } else { self.count - 1 };
        self.sck_en = sck_en;
        self.state = next;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timing() {
        let p = AdcParams::default();
        let mut adc = Adc::new(p).unwrap();
        assert!(adc.done());
        adc.tick(true, None);
        let (mut busy, mut cnv, mut sck, mut reading) = (0, 0, 0, 0);
        while !adc.done() {
            busy += 1;
            cnv += adc.cnv() as u32;
            sck += adc.sck() as u32;
            reading += adc.reading() as u32;
            adc.tick(false, None);
        }
        assert_eq!(busy, 4 + 57 + 16 + 4);
        assert_eq!(busy + 1, p.latency());
        assert_eq!(cnv, p.t_cnvh);
        assert_eq!(sck, p.t_read());
        assert_eq!(reading, p.t_read() + p.t_rtt);
    }

    #[test]
    fn sck_inside_reading() {
        let mut adc = Adc::new(AdcParams::default()).unwrap();
        adc.tick(true, None);
        while !adc.done() {
            // every pulse returns within t_rtt while still reading
            if adc.sck() {
                assert!(adc.reading());
            }
            adc.tick(false, None);
        }
    }

    #[test]
    fn deserialize() {
        let p = AdcParams {
            channels: 4,
            lanes: 2,
            width: 4,
            ..Default::default()
        };
        let mut adc = Adc::new(p).unwrap();
        // lane 0: channels 0, 1; lane 1: channels 2, 3
        let words: [u8; 2] = [0x7a, 0x3f];
        adc.tick(true, None);
        let mut n = 0;
        while !adc.done() {
            let ret = if adc.reading() && n < p.t_read() {
                let s = 6 - 2 * n;
                n += 1;
                Some([(words[0] >> s) & 3, (words[1] >> s) & 3])
            } else {
                None
            };
            adc.tick(false, ret.as_ref().map(|r| &r[..]));
        }
        assert_eq!(n, 4);
        assert_eq!(adc.sample(0), 7);
        assert_eq!(adc.sample(1), -6);
        assert_eq!(adc.sample(2), 3);
        assert_eq!(adc.sample(3), -1);
    }

    #[test]
    fn config() {
        let p = AdcParams {
            lanes: 16,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(Error::LaneSplit { .. })));
        let p = AdcParams {
            lanes: 1,
            channels: 16,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(Error::LaneWidth(256))));
        let p = AdcParams {
            t_conv: 0,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(Error::Zero("t_conv"))));
    }

    #[test]
    #[should_panic(expected = "ADC started while busy")]
    fn start_while_busy() {
        let mut adc = Adc::new(AdcParams::default()).unwrap();
        adc.tick(true, None);
        adc.tick(true, None);
    }
}

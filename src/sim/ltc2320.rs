//! Behavioral model of an LTC2320 style multi-lane ADC and its serial
//! clock round trip.
use alloc::{collections::VecDeque, vec, vec::Vec};

use crate::{adc::AdcParams, tools::mask};

pub struct Ltc2320 {
    params: AdcParams,
    inputs: Vec<i32>,
    shift: Vec<u128>,
    cnv: bool,
    // returned data in flight, oldest first
    flight: VecDeque<Option<Vec<u8>>>,
}

impl Ltc2320 {
    /// # Args
    /// * `params`: Must match the acquisition controller
    /// * `rtt`: Serial clock to data round trip delay in cycles
    pub fn new(params: AdcParams, rtt: u32) -> Self {
        Self {
            params,
            inputs: vec![0; params.channels],
            shift: vec![0; params.lanes],
            cnv: false,
            flight: (0..rtt).map(|_| None).collect(),
        }
    }

    /// Analog input, as an ADC code.
    pub fn set_input(&mut self, channel: usize, code: i32) {
        self.inputs[channel] = code;
    }

    fn convert(&mut self) {
        let k = self.params.channels / self.params.lanes;
        let w = self.params.width;
        for (lane, sr) in self.shift.iter_mut().enumerate() {
            *sr = self.inputs[lane * k..(lane + 1) * k]
                .iter()
                .fold(0u128, |sr, &x| sr << w | (x as u64 & mask(w)) as u128);
        }
    }

    /// Advance by one clock cycle.
    ///
    /// # Args
    /// * `cnv`: Conversion start, sampled on the rising edge
    /// * `sck`: Serial clock pulse in this cycle
    ///
    /// # Returns
    /// Two bits per lane arriving back at the controller in this cycle.
    pub fn tick(&mut self, cnv: bool, sck: bool) -> Option<Vec<u8>> {
        if cnv && !self.cnv {
            self.convert();
        }
        self.cnv = cnv;
        let top = self.params.lane_bits() as u32 - 2;
        let bits = sck.then(|| {
            self.shift
                .iter_mut()
                .map(|sr| {
                    let b = (*sr >> top) as u8 & 3;
                    *sr <<= 2;
                    b
                })
                .collect()
        });
        self.flight.push_back(bits);
        self.flight.pop_front().flatten()
    }
}

//! ADC -> IIR -> DDS servo with overlapping stages.
//!
//! # Design
//! The sampling period `t_cycle` is the latency of the slowest stage. A
//! down counter of that length starts an ADC acquisition whenever it
//! expires while `start` is held. The stages then hand the sample on with
//! a two bit token:
//!
//! * bit 0 is set when the ADC starts and cleared when it is done; the IIR
//!   starts when the token is present and the ADC is done,
//! * bit 1 takes bit 0 when the IIR starts and is cleared while it is
//!   shifting; the DDS transfer starts on the first shifting cycle.
//!
//! While the DDS transfers the output of sample `n`, the ADC already
//! acquires sample `n + 1`. The IIR finishes its shift stage before the
//! next sample is loaded, so each stage sees at most one sample in
//! flight.
//!
//! # Tick model
//! Each cycle first evaluates every stage's outputs from the current
//! registers and then clocks all stages with those values, so no stage
//! observes another stage's update of the same cycle.
use crate::{
    adc::Adc,
    configuration::{Error, ServoConfig},
    dds::Dds,
    design_parameters::SYS_CLK,
    iir::Iir,
};
use fugit::HertzU32 as Hertz;

pub struct Servo {
    config: ServoConfig,
    adc: Adc,
    iir: Iir,
    dds: Dds,
    t_cycle: u32,
    count: u32,
    token: [bool; 2],
}

impl Servo {
    pub fn new(config: ServoConfig) -> Result<Self, Error> {
        config.validate()?;
        let t_cycle = config.t_cycle();
        log::info!(
            "Servo: t_cycle {t_cycle} (ADC {}, IIR {} + {}, DDS {}), {} Hz",
            config.adc.latency(),
            config.iir.latency(),
            config.iir.shift_cycles(),
            config.dds.period(),
            Self::rate(t_cycle).to_Hz()
        );
        Ok(Self {
            config,
            adc: Adc::new(config.adc)?,
            iir: Iir::new(config.iir)?,
            dds: Dds::new(config.dds)?,
            t_cycle,
            count: 0,
            token: [false; 2],
        })
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    /// Sampling period in system clock cycles.
    pub fn t_cycle(&self) -> u32 {
        self.t_cycle
    }

    fn rate(t_cycle: u32) -> Hertz {
        Hertz::from_raw(SYS_CLK.to_Hz() / t_cycle)
    }

    /// Sample rate at the system clock.
    pub fn sample_rate(&self) -> Hertz {
        Self::rate(self.t_cycle)
    }

    pub fn adc(&self) -> &Adc {
        &self.adc
    }

    pub fn iir(&self) -> &Iir {
        &self.iir
    }

    /// Host access to coefficients, state and channel control.
    pub fn iir_mut(&mut self) -> &mut Iir {
        &mut self.iir
    }

    pub fn dds(&self) -> &Dds {
        &self.dds
    }

    /// The output of the last sample has been transferred.
    pub fn done(&self) -> bool {
        self.dds.done()
    }

    /// Start conditions of the three stages for this cycle.
    fn starts(&self, start: bool) -> (bool, bool, bool) {
        (
            start && self.count == 0,
            self.token[0] && self.adc.done(),
            self.token[1] && self.iir.shifting(),
        )
    }

    /// An acquisition starts in this cycle.
    pub fn adc_start(&self, start: bool) -> bool {
        self.starts(start).0
    }

    /// Advance by one clock cycle.
    ///
    /// # Args
    /// * `start`: Keep sampling
    /// * `ret`: ADC data returned this cycle, see [`Adc::tick`]
    pub fn tick(&mut self, start: bool, ret: Option<&[u8]>) {
        let (adc_start, iir_start, dds_start) = self.starts(start);
        let adc_done = self.adc.done();
        let shifting = self.iir.shifting();

        for channel in 0..self.config.adc.channels {
            self.iir.set_adc(channel, self.adc.sample(channel));
        }
        self.dds
            .tick(dds_start, self.iir.dds(), self.config.iir.word);
        self.iir.tick(iir_start);
        self.adc.tick(adc_start, ret);

        if self.count != 0 {
            self.count -= 1;
        }
        let token0 = self.token[0];
        if adc_done {
            self.token[0] = false;
        }
        if adc_start {
            self.count = self.t_cycle - 1;
            self.token[0] = true;
        }
        if shifting {
            self.token[1] = false;
        }
        if iir_start {
            self.token[1] = token0;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn period() {
        let mut config = ServoConfig::default();
        let servo = Servo::new(config).unwrap();
        assert_eq!(servo.t_cycle(), 146);
        assert_eq!(servo.sample_rate(), Hertz::from_raw(856_164));

        config.dds.io_update_delay = 5;
        let servo = Servo::new(config).unwrap();
        assert_eq!(servo.t_cycle(), 146 + 5);
    }

    #[test]
    fn token() {
        let mut servo = Servo::new(ServoConfig::default()).unwrap();
        assert!(servo.adc_start(true));
        assert!(!servo.adc_start(false));
        servo.tick(true, None);
        // the period counter runs, no restart before t_cycle
        for _ in 1..servo.t_cycle() {
            assert!(!servo.adc_start(true));
            servo.tick(true, None);
        }
        assert!(servo.adc_start(true));
    }
}

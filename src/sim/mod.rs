//! The servo with models of the ADC and DDS devices attached.
mod ad9910;
mod ltc2320;
pub use self::ad9910::Ad9910;
pub use ltc2320::Ltc2320;

use ::ad9910::Profile;

use crate::{
    configuration::{Error, ServoConfig},
    servo::Servo,
};

pub struct Bench {
    servo: Servo,
    adc: Ltc2320,
    dds: Ad9910,
    ticks: u64,
}

impl Bench {
    /// # Args
    /// * `config`: Servo configuration
    /// * `rtt`: ADC clock round trip in cycles, at most `config.adc.t_rtt`
    pub fn new(config: ServoConfig, rtt: u32) -> Result<Self, Error> {
        if rtt > config.adc.t_rtt {
            return Err(Error::TooWide {
                name: "rtt",
                value: rtt,
                max: config.adc.t_rtt,
            });
        }
        Ok(Self {
            servo: Servo::new(config)?,
            adc: Ltc2320::new(config.adc, rtt),
            dds: Ad9910::new(config.dds.channels, config.dds.width),
            ticks: 0,
        })
    }

    pub fn servo(&self) -> &Servo {
        &self.servo
    }

    pub fn servo_mut(&mut self) -> &mut Servo {
        &mut self.servo
    }

    /// Analog ADC input as a code.
    pub fn set_input(&mut self, channel: usize, code: i32) {
        self.adc.set_input(channel, code);
    }

    /// The profile currently active in a DDS channel.
    pub fn profile(&self, channel: usize) -> Option<Profile> {
        self.dds.profile(channel).map(|(_, p)| p)
    }

    /// Number of malformed DDS transfers.
    pub fn errors(&self) -> usize {
        self.dds.errors()
    }

    /// Clock cycles since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance by one clock cycle.
    ///
    /// # Returns
    /// IO_UPDATE was asserted in this cycle.
    pub fn tick(&mut self, start: bool) -> bool {
        let ret = self.adc.tick(self.servo.adc().cnv(), self.servo.adc().sck());
        self.dds.tick(self.servo.dds());
        let update = self.servo.dds().io_update();
        self.servo.tick(start, ret.as_deref());
        self.ticks += 1;
        update
    }

    /// Process one sample: start an acquisition and run until the DDS
    /// output is updated.
    ///
    /// # Returns
    /// Number of cycles from start to IO_UPDATE.
    pub fn sample(&mut self) -> u32 {
        self.tick(true);
        let mut ticks = 1;
        while !self.tick(false) {
            ticks += 1;
        }
        ticks
    }
}

//! Construction time parameters of the servo and their validation.
use serde::{Deserialize, Serialize};

use crate::{adc::AdcParams, dds::DdsParams, iir::IirWidths};

/// Inconsistent or unsupported parameters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} must be positive")]
    Zero(&'static str),
    #[error("{width} bit x {channels} channels do not split into {lanes} DDR lanes")]
    LaneSplit {
        channels: usize,
        lanes: usize,
        width: u32,
    },
    #[error("{0} bits per lane exceed the deserializer")]
    LaneWidth(usize),
    #[error("{name} width {value} exceeds {max}")]
    TooWide {
        name: &'static str,
        value: u32,
        max: u32,
    },
    #[error("Width constraint violated: {0}")]
    Widths(&'static str),
    #[error("Channel count mismatch: ADC {adc}, IIR {iir}, DDS {dds}")]
    ChannelCount { adc: usize, iir: usize, dds: usize },
    #[error("DDS frame of {width} bits does not hold the instruction and 4 x {word} bit words")]
    FrameWidth { width: u32, word: u32 },
    #[error("No slack for the shift stage: {t_iir} + {t_shift} >= {t_cycle}")]
    ShiftSlack {
        t_iir: u32,
        t_shift: u32,
        t_cycle: u32,
    },
    #[error("Invalid JSON configuration: {0:?}")]
    Json(serde_json_core::de::Error),
    #[error("Serializing configuration: {0:?}")]
    Serialize(serde_json_core::ser::Error),
}

/// Reject a zero parameter.
pub(crate) fn positive<T: Default + PartialEq>(
    name: &'static str,
    value: T,
) -> Result<(), Error> {
    if value == T::default() {
        Err(Error::Zero(name))
    } else {
        Ok(())
    }
}

/// Reject a width beyond what the model can represent.
pub(crate) fn at_most(
    name: &'static str,
    value: u32,
    max: u32,
) -> Result<(), Error> {
    if value > max {
        Err(Error::TooWide { name, value, max })
    } else {
        Ok(())
    }
}

/// Parameters of the complete servo.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub adc: AdcParams,
    pub iir: IirWidths,
    pub dds: DdsParams,
}

impl ServoConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    ///
    /// # Args
    /// * `json`: e.g. `{"iir": {"channel": 2}, "dds": {"clk": 2}}`
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let (config, _) =
            serde_json_core::from_str::<Self>(json).map_err(Error::Json)?;
        Ok(config)
    }

    pub fn to_json<const N: usize>(
        &self,
    ) -> Result<heapless::String<N>, Error> {
        serde_json_core::to_string(self).map_err(Error::Serialize)
    }

    /// Check each stage and their mutual consistency.
    pub fn validate(&self) -> Result<(), Error> {
        self.adc.validate()?;
        self.iir.validate()?;
        self.dds.validate()?;

        let (adc, iir, dds) =
            (self.adc.channels, self.iir.channels(), self.dds.channels);
        if adc != iir || dds != iir {
            return Err(Error::ChannelCount { adc, iir, dds });
        }
        if self.adc.width != self.iir.adc {
            return Err(Error::Widths("ADC sample width == IIR adc width"));
        }
        if self.dds.width != 8 + 4 * self.iir.word {
            return Err(Error::FrameWidth {
                width: self.dds.width,
                word: self.iir.word,
            });
        }
        let t_iir = self.iir.latency();
        let t_shift = self.iir.shift_cycles();
        let t_cycle = self.t_cycle();
        if t_iir + t_shift >= t_cycle {
            return Err(Error::ShiftSlack {
                t_iir,
                t_shift,
                t_cycle,
            });
        }
        Ok(())
    }

    /// Sampling period in system clock cycles: the longest stage latency.
    /// The output stage includes the IO_UPDATE delay.
    pub fn t_cycle(&self) -> u32 {
        self.adc
            .latency()
            .max(self.iir.latency())
            .max(self.dds.period())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::design_parameters::*;

    #[test]
    fn defaults() {
        let c = ServoConfig::default();
        c.validate().unwrap();
        assert_eq!(c.adc.latency(), 4 + 57 + 16 + 4 + 1);
        assert_eq!(c.iir.latency(), 5 * 8 + 10);
        assert_eq!(c.dds.latency(), (2 * 72 + 1) + 1);
        assert_eq!(c.t_cycle(), 146);
        assert_eq!(c.iir.adc, ADC_WIDTH);
    }

    #[test]
    fn json() {
        let c = ServoConfig::from_json(
            r#"{"adc": {"t_conv": 80}, "dds": {"clk": 2, "io_update_delay": 3}}"#,
        )
        .unwrap();
        assert_eq!(c.adc.t_conv, 80);
        assert_eq!(c.adc.t_cnvh, ADC_T_CNVH);
        assert_eq!(c.dds.clk, 2);
        assert_eq!(c.dds.io_update_delay, 3);
        assert_eq!(c.t_cycle(), (2 * 72 + 1) * 2 + 1 + 3);
        assert_eq!(c.iir, IirWidths::default());
        c.validate().unwrap();

        let s = c.to_json::<512>().unwrap();
        assert_eq!(ServoConfig::from_json(&s).unwrap(), c);

        assert!(matches!(
            ServoConfig::from_json(r#"{"adc": {"lanes": "four"}}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn rejects() {
        let mut c = ServoConfig::default();
        c.adc.t_rtt = 0;
        assert!(matches!(c.validate(), Err(Error::Zero("t_rtt"))));

        let mut c = ServoConfig::default();
        c.adc.lanes = 3;
        assert!(matches!(c.validate(), Err(Error::LaneSplit { .. })));

        let mut c = ServoConfig::default();
        c.iir.accu = 45;
        assert!(matches!(c.validate(), Err(Error::Widths(_))));

        let mut c = ServoConfig::default();
        c.iir.channel = 2;
        assert!(matches!(
            c.validate(),
            Err(Error::ChannelCount {
                adc: 8,
                iir: 4,
                dds: 8
            })
        ));

        let mut c = ServoConfig::default();
        c.dds.width = 64;
        assert!(matches!(c.validate(), Err(Error::FrameWidth { .. })));

        // A fast output stage leaves no room to shift before the next load.
        let mut c = ServoConfig::default();
        c.adc.t_conv = 1;
        c.adc.t_cnvh = 1;
        c.adc.t_rtt = 1;
        c.iir.word = 4;
        c.iir.asf = 4;
        c.dds.width = 8 + 16;
        assert!(matches!(c.validate(), Err(Error::ShiftSlack { .. })));
    }
}

#![no_std]

use arbitrary_int::{u14, u3, Number};
use bitbybit::{bitenum, bitfield};
use num_traits::float::FloatCore;

#[bitenum(u5)]
#[derive(PartialEq, Debug)]
pub enum Addr {
    Cfr1 = 0x00,
    Cfr2 = 0x01,
    Cfr3 = 0x02,
    AuxDac = 0x03,
    IoUpdateRate = 0x04,
    Ftw = 0x07,
    Pow = 0x08,
    Asf = 0x09,
    MultichipSync = 0x0a,
    RampLimit = 0x0b,
    RampStep = 0x0c,
    RampRate = 0x0d,
    Profile0 = 0x0e,
    Profile1 = 0x0f,
    Profile2 = 0x10,
    Profile3 = 0x11,
    Profile4 = 0x12,
    Profile5 = 0x13,
    Profile6 = 0x14,
    Profile7 = 0x15,
    Ram = 0x16,
}

impl Addr {
    /// Single tone profile register for the given profile pin state.
    pub fn profile(profile: u3) -> Self {
        match profile.value() {
            0 => Self::Profile0,
            1 => Self::Profile1,
            2 => Self::Profile2,
            3 => Self::Profile3,
            4 => Self::Profile4,
            5 => Self::Profile5,
            6 => Self::Profile6,
            _ => Self::Profile7,
        }
    }

    pub fn is_profile(&self) -> bool {
        matches!(
            self,
            Self::Profile0
                | Self::Profile1
                | Self::Profile2
                | Self::Profile3
                | Self::Profile4
                | Self::Profile5
                | Self::Profile6
                | Self::Profile7
        )
    }
}

/// Serial instruction byte preceding every register transfer.
#[bitfield(u8)]
#[derive(Debug, PartialEq)]
pub struct Instruction {
    #[bits(0..=4, rw)]
    pub addr: Option<Addr>,
    #[bit(7, rw)]
    pub read: bool,
}

impl Instruction {
    /// Write instruction for a single tone profile register.
    pub fn write_profile(profile: u3) -> Self {
        Self::new_with_raw_value(0)
            .with_addr(Addr::profile(profile))
            .with_read(false)
    }
}

/// Single tone profile register contents.
#[bitfield(u64, default = 0)]
#[derive(Debug, PartialEq)]
pub struct Profile {
    #[bits(0..=31, rw)]
    pub ftw: u32,
    #[bits(32..=47, rw)]
    pub pow: u16,
    #[bits(48..=61, rw)]
    pub asf: u14,
}

/// Instruction byte plus profile register, MSB first.
pub const FRAME_BITS: u32 = 8 + 64;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid instruction {0:#04x}")]
    Instruction(u8),
    #[error("Not a profile register write {0:#04x}")]
    NotProfile(u8),
}

/// Serialize a profile write into the bytes shifted out on the serial bus.
pub fn encode(insn: Instruction, profile: Profile) -> [u8; 9] {
    let mut frame = [0; 9];
    frame[0] = insn.raw_value();
    frame[1..].copy_from_slice(&profile.raw_value().to_be_bytes());
    frame
}

/// Parse a received profile register write.
pub fn decode(frame: &[u8; 9]) -> Result<(Instruction, Profile), Error> {
    let insn = Instruction::new_with_raw_value(frame[0]);
    match insn.addr() {
        Err(_) => return Err(Error::Instruction(frame[0])),
        Ok(addr) if insn.read() || !addr.is_profile() => {
            return Err(Error::NotProfile(frame[0]))
        }
        Ok(_) => {}
    }
    let mut raw = [0; 8];
    raw.copy_from_slice(&frame[1..]);
    Ok((insn, Profile::new_with_raw_value(u64::from_be_bytes(raw))))
}

impl Profile {
    /// Single tone profile from physical units.
    ///
    /// # Args
    /// * `frequency`: Output frequency, aliased into `0..sysclk`
    /// * `phase`: Phase offset in turns
    /// * `amplitude`: Full scale fraction, clamped to `0..=1`
    /// * `sysclk`: DDS core clock
    pub fn from_units(
        frequency: f64,
        phase: f32,
        amplitude: f32,
        sysclk: f64,
    ) -> Self {
        Self::new_with_raw_value(0)
            .with_ftw(ftw(frequency, sysclk))
            .with_pow(pow(phase))
            .with_asf(asf(amplitude))
    }

    /// Output frequency for the DDS core clock `sysclk`.
    pub fn frequency(&self, sysclk: f64) -> f64 {
        self.ftw() as f64 * sysclk / (1u64 << 32) as f64
    }

    /// Phase offset in turns.
    pub fn phase(&self) -> f32 {
        self.pow() as f32 / (1u32 << 16) as f32
    }

    /// Amplitude as a fraction of full scale.
    pub fn amplitude(&self) -> f32 {
        self.asf().value() as f32 / u14::MAX.value() as f32
    }
}

/// Frequency tuning word, wrapping modulo `sysclk`.
pub fn ftw(frequency: f64, sysclk: f64) -> u32 {
    let turns = frequency / sysclk;
    ((turns - turns.floor()) * (1u64 << 32) as f64).round() as u64 as u32
}

/// Phase offset word for a phase in turns, wrapping modulo one turn.
pub fn pow(phase: f32) -> u16 {
    ((phase - phase.floor()) * (1u32 << 16) as f32).round() as u32 as u16
}

/// Amplitude scale factor for a full scale fraction.
pub fn asf(amplitude: f32) -> u14 {
    let max = u14::MAX.value();
    u14::new((amplitude.clamp(0., 1.) * max as f32).round() as u16)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instruction() {
        assert_eq!(Instruction::write_profile(u3::new(0)).raw_value(), 0x0e);
        assert_eq!(Instruction::write_profile(u3::new(7)).raw_value(), 0x15);
        let insn = Instruction::new_with_raw_value(0x8e);
        assert!(insn.read());
        assert_eq!(insn.addr(), Ok(Addr::Profile0));
        let insn = Instruction::new_with_raw_value(0x05);
        assert!(insn.addr().is_err());
        let insn = Instruction::write_profile(u3::new(5));
        assert_eq!(insn.addr(), Ok(Addr::Profile5));
        assert!(!insn.read());
    }

    #[test]
    fn profile_layout() {
        let p = Profile::default()
            .with_ftw(0x1929_1727)
            .with_pow(0x1333)
            .with_asf(u14::new(0x3fff));
        assert_eq!(p.raw_value(), 0x3fff_1333_1929_1727);
    }

    #[test]
    fn frame() {
        let insn = Instruction::write_profile(u3::new(0));
        let p = Profile::new_with_raw_value(0x0123_4567_89ab_cdef);
        let frame = encode(insn, p);
        assert_eq!(frame[0], 0x0e);
        assert_eq!(frame[1], 0x01);
        assert_eq!(decode(&frame), Ok((insn, p)));
        let mut bad = frame;
        bad[0] = 0x07;
        assert_eq!(decode(&bad), Err(Error::NotProfile(0x07)));
        bad[0] = 0x1f;
        assert_eq!(decode(&bad), Err(Error::Instruction(0x1f)));
    }

    #[test]
    fn conversions() {
        assert_eq!(ftw(250e6, 1e9), 1 << 30);
        assert_eq!(ftw(-250e6, 1e9), 3 << 30);
        assert_eq!(ftw(1e9, 1e9), 0);
        assert_eq!(pow(0.5), 1 << 15);
        assert_eq!(pow(-0.25), 3 << 14);
        assert_eq!(asf(2.), u14::MAX);
        assert_eq!(asf(-1.), u14::new(0));

        let p = Profile::from_units(100e6, 0.25, 0.5, 1e9);
        assert!((p.frequency(1e9) - 100e6).abs() < 1.);
        assert_eq!(p.phase(), 0.25);
        assert!((p.amplitude() - 0.5).abs() < 1e-4);
    }
}

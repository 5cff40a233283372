//! Pipelined multi-channel, multi-profile fixed point IIR filter engine.
//!
//! # Design
//! A single pre-adder/multiplier/accumulator ([`dsp::Dsp`]) is shared by
//! all channels. Each channel occupies it for four cycles (phases) in which
//! the three products of
//!
//! `y0 = clip((a1*(0 - y1) + b0*(offset - x0) + b1*(offset - x1)) >> shift)`
//!
//! are issued. The computation of a channel is spread across three pipeline
//! stages of four cycles each: stage 0 issues the products and fetches
//! `pow`, stage 1 fetches the frequency tuning words, stage 2 writes `y0`
//! back and derives the amplitude. The channel and profile pointers and the
//! stage activity bits move through fixed depth pipeline registers.
//!
//! Coefficients and filter state live in two synchronous memories with a
//! single engine port each ([`memory::Memory`]). Addresses are pure
//! functions of the phase, channel and profile.
//!
//! A full cycle consists of
//! * LOAD: one tick per channel, storing the ADC samples as `x0`,
//! * PROCESS: four ticks per channel plus nine ticks of pipeline drain,
//! * SHIFT: two ticks per channel, copying `x0` to `x1`.
//!
//! # Coefficient memory
//! Each (channel, profile) owns four `2 * coeff` bit words holding two
//! fields each, in the order `ftw1 b1 pow cfg offset a1 ftw0 b0` (low half
//! first). The first field of each pair is an output word, the second is
//! consumed by the multiplier (`cfg` by the address logic).
//!
//! # State memory
//! `y1` per (channel, profile) at the bottom, followed by `x0, x1` pairs
//! per channel.
//!
//! # Limitations
//! The host must not write the coefficients of an active profile while
//! processing, and must not access `x` state while loading or shifting.
use alloc::{vec, vec::Vec};

use bitbybit::bitfield;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::{
    configuration::{self, at_most, positive},
    design_parameters,
    tools::{mask, sext},
};

pub mod dsp;
pub mod memory;
mod pi;
pub use pi::*;

use dsp::Dsp;
use memory::{Memory, Port};

/// Bit widths and counts of the filter engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IirWidths {
    /// State (x0, x1, y1) width
    pub state: u32,
    /// Coefficient width
    pub coeff: u32,
    /// Accumulator width
    pub accu: u32,
    /// ADC sample width
    pub adc: u32,
    /// Output word width (ftw0, ftw1, pow)
    pub word: u32,
    /// Amplitude scale factor width
    pub asf: u32,
    /// Fixed point scaling of a1, b0, b1
    pub shift: u32,
    /// log2 of the channel count
    pub channel: u32,
    /// log2 of the profile count per channel
    pub profile: u32,
}

impl Default for IirWidths {
    fn default() -> Self {
        use design_parameters::*;
        Self {
            state: IIR_STATE,
            coeff: IIR_COEFF,
            accu: IIR_ACCU,
            adc: ADC_WIDTH,
            word: IIR_WORD,
            asf: IIR_ASF,
            shift: IIR_SHIFT,
            channel: IIR_CHANNEL,
            profile: IIR_PROFILE,
        }
    }
}

impl IirWidths {
    pub fn validate(&self) -> Result<(), configuration::Error> {
        use configuration::Error;
        positive("state", self.state)?;
        positive("coeff", self.coeff)?;
        positive("accu", self.accu)?;
        positive("adc", self.adc)?;
        positive("word", self.word)?;
        positive("asf", self.asf)?;
        positive("shift", self.shift)?;
        positive("channel", self.channel)?;
        positive("profile", self.profile)?;
        at_most("state", self.state, 32)?;
        at_most("coeff", self.coeff, 32)?;
        at_most("accu", self.accu, 64)?;
        // cfg.sel addresses the channel
        at_most("channel", self.channel, 8)?;
        at_most("profile", self.profile, 8)?;

        let checks = [
            (self.word <= self.coeff, "word <= coeff"),
            (
                self.state + self.coeff + 3 <= self.accu,
                "state + coeff + 3 <= accu",
            ),
            (self.accu > self.state + self.shift, "accu > state + shift"),
            (self.coeff < self.state, "coeff < state"),
            (self.adc < self.state, "adc < state"),
            (self.asf < self.state, "asf < state"),
            (self.asf <= self.word, "asf <= word"),
        ];
        for (ok, msg) in checks {
            if !ok {
                return Err(Error::Widths(msg));
            }
        }
        Ok(())
    }

    pub fn channels(&self) -> usize {
        1 << self.channel
    }

    pub fn profiles(&self) -> usize {
        1 << self.profile
    }

    /// Cycles from an accepted start to the first shifting cycle.
    pub fn latency(&self) -> u32 {
        let n = self.channels() as u32;
        1 + n + 4 * n + 9
    }

    /// Duration of the shift stage.
    pub fn shift_cycles(&self) -> u32 {
        2 << self.channel
    }
}

/// Coefficient memory fields.
///
/// The discriminant is the field index: the memory word offset is
/// `index >> 1`, the upper half is selected by `index & 1`.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    IntoPrimitive,
    TryFromPrimitive,
    EnumIter,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Coeff {
    Ftw1 = 0,
    B1 = 1,
    Pow = 2,
    Cfg = 3,
    Offset = 4,
    A1 = 5,
    Ftw0 = 6,
    B0 = 7,
}

impl Coeff {
    /// Memory address and upper half flag.
    pub fn location(
        self,
        channel: usize,
        profile: usize,
        profile_bits: u32,
    ) -> (usize, bool) {
        let index = u8::from(self) as usize;
        (
            (channel << (profile_bits + 2)) | (profile << 2) | (index >> 1),
            index & 1 != 0,
        )
    }

    /// Whether the field is a two's complement filter coefficient.
    pub fn is_signed(self) -> bool {
        matches!(self, Self::B1 | Self::Offset | Self::A1 | Self::B0)
    }
}

/// Filter state kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum StateKind {
    /// Previous output, per channel and profile.
    Y1,
    /// Current input, per channel.
    X0,
    /// Previous input, per channel.
    X1,
}

/// Profile configuration word.
#[bitfield(u16, default = 0)]
#[derive(Debug, PartialEq)]
pub struct Cfg {
    // Input channel feeding x0/x1
    #[bits(0..=7, rw)]
    pub sel: u8,
    // Soft start delay in cycles
    #[bits(8..=15, rw)]
    pub dly: u8,
}

/// Per channel control, updated by the host between cycles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCtrl {
    pub profile: usize,
    pub en_out: bool,
    pub en_iir: bool,
}

/// Output word of a channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DdsWord {
    pub ftw0: u32,
    pub ftw1: u32,
    pub pow: u32,
    pub asf: u32,
}

impl DdsWord {
    /// Concatenation `asf:pow:ftw1:ftw0` with `word` bits per field.
    pub fn raw(&self, word: u32) -> u128 {
        self.ftw0 as u128
            | (self.ftw1 as u128) << word
            | (self.pow as u128) << (2 * word)
            | (self.asf as u128) << (3 * word)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Channel {0} out of range")]
    Channel(usize),
    #[error("Profile {0} out of range")]
    Profile(usize),
    #[error("y1 requires a profile")]
    MissingProfile,
    #[error("x0/x1 are not per profile")]
    UnexpectedProfile,
    #[error("Coefficient table length {0} does not match the memory")]
    TableSize(usize),
    #[error("Coefficient {value} out of range for {width} bits")]
    CoefficientRange { value: f64, width: u32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Fsm {
    Idle,
    Load,
    Process,
    Shift,
}

/// State memory operand by phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Operand {
    /// y0 of the channel in stage 2
    WriteBack,
    /// y1 of the channel in stage 0
    OldY,
    /// x0 of the selected input
    FreshX,
    /// x1 of the selected input
    AgedX,
}

impl From<usize> for Operand {
    fn from(phase: usize) -> Self {
        match phase & 3 {
            0 => Self::WriteBack,
            1 => Self::OldY,
            2 => Self::FreshX,
            _ => Self::AgedX,
        }
    }
}

pub struct Iir {
    widths: IirWidths,
    m_coeff: Memory,
    m_state: Memory,
    dsp: Dsp,
    ctrl: Vec<ChannelCtrl>,
    adc: Vec<i32>,
    dds: Vec<DdsWord>,
    dlys: Vec<u8>,
    fsm: Fsm,
    state: usize,
    // stage activity, bit i: stage i
    stage: u8,
    // channel in stage 1 and 2
    channel: [usize; 2],
    // profile in stage 0 and 1
    profile: [usize; 2],
    // latched at phase 0
    dly: u8,
    en_out: bool,
    en_iir: bool,
    // latched at phase 2
    sel: usize,
    en: [bool; 2],
}

impl Iir {
    pub fn new(widths: IirWidths) -> Result<Self, configuration::Error> {
        widths.validate()?;
        let n = widths.channels();
        let p = widths.profiles();
        log::debug!(
            "IIR: {n} channels, {p} profiles, {} cycles to shift",
            widths.latency()
        );
        Ok(Self {
            widths,
            m_coeff: Memory::new(4 * n * p),
            m_state: Memory::new(n * p + 2 * n),
            dsp: Dsp::new(&widths),
            ctrl: vec![ChannelCtrl::default(); n],
            adc: vec![0; n],
            dds: vec![DdsWord::default(); n],
            dlys: vec![0; n],
            fsm: Fsm::Idle,
            state: 0,
            stage: 0,
            channel: [0; 2],
            profile: [0; 2],
            dly: 0,
            en_out: false,
            en_iir: false,
            sel: 0,
            en: [false; 2],
        })
    }

    pub fn widths(&self) -> &IirWidths {
        &self.widths
    }

    pub fn done(&self) -> bool {
        self.fsm == Fsm::Idle
    }

    pub fn loading(&self) -> bool {
        self.fsm == Fsm::Load
    }

    pub fn processing(&self) -> bool {
        self.fsm == Fsm::Process
    }

    pub fn shifting(&self) -> bool {
        self.fsm == Fsm::Shift
    }

    fn check_channel(&self, channel: usize) -> Result<(), Error> {
        if channel < self.widths.channels() {
            Ok(())
        } else {
            Err(Error::Channel(channel))
        }
    }

    fn check_profile(&self, profile: usize) -> Result<(), Error> {
        if profile < self.widths.profiles() {
            Ok(())
        } else {
            Err(Error::Profile(profile))
        }
    }

    /// Present an ADC sample. Only sampled while loading.
    pub fn set_adc(&mut self, channel: usize, sample: i32) {
        self.adc[channel] = sample;
    }

    pub fn ctrl(&self, channel: usize) -> Result<ChannelCtrl, Error> {
        self.check_channel(channel)?;
        Ok(self.ctrl[channel])
    }

    pub fn set_ctrl(
        &mut self,
        channel: usize,
        ctrl: ChannelCtrl,
    ) -> Result<(), Error> {
        self.check_channel(channel)?;
        self.check_profile(ctrl.profile)?;
        self.ctrl[channel] = ctrl;
        Ok(())
    }

    /// Assembled output words, updated while processing.
    pub fn dds(&self) -> &[DdsWord] {
        &self.dds
    }

    /// Soft start counter of a channel.
    pub fn delay(&self, channel: usize) -> Result<u8, Error> {
        self.check_channel(channel)?;
        Ok(self.dlys[channel])
    }

    /// Write a coefficient memory field.
    ///
    /// # Args
    /// * `channel`: Output channel
    /// * `profile`: Profile of that channel
    /// * `coeff`: Field
    /// * `value`: Truncated to the coefficient width
    pub fn set_coeff(
        &mut self,
        channel: usize,
        profile: usize,
        coeff: Coeff,
        value: i32,
    ) -> Result<(), Error> {
        self.check_channel(channel)?;
        self.check_profile(profile)?;
        let w = self.widths.coeff;
        let (adr, high) = coeff.location(channel, profile, self.widths.profile);
        let value = value as u64 & mask(w);
        let word = self.m_coeff.read(adr);
        let word = if high {
            (word & mask(w)) | (value << w)
        } else {
            (word & !mask(w)) | value
        };
        log::trace!("coeff {channel}/{profile} {}: {value:#x}", coeff.as_ref());
        self.m_coeff.write(adr, word);
        Ok(())
    }

    /// Read back the raw (masked) bits of a coefficient memory field.
    pub fn get_coeff(
        &self,
        channel: usize,
        profile: usize,
        coeff: Coeff,
    ) -> Result<u32, Error> {
        self.check_channel(channel)?;
        self.check_profile(profile)?;
        let w = self.widths.coeff;
        let (adr, high) = coeff.location(channel, profile, self.widths.profile);
        let word = self.m_coeff.read(adr);
        let value = if high { word >> w } else { word };
        Ok((value & mask(w)) as u32)
    }

    /// Read a coefficient memory field, sign extended for the filter
    /// coefficients.
    pub fn get_coeff_signed(
        &self,
        channel: usize,
        profile: usize,
        coeff: Coeff,
    ) -> Result<i32, Error> {
        let raw = self.get_coeff(channel, profile, coeff)?;
        Ok(if coeff.is_signed() {
            sext(raw as u64, self.widths.coeff) as i32
        } else {
            raw as i32
        })
    }

    fn state_address(
        &self,
        channel: usize,
        profile: Option<usize>,
        kind: StateKind,
    ) -> Result<usize, Error> {
        self.check_channel(channel)?;
        match (kind, profile) {
            (StateKind::Y1, Some(profile)) => {
                self.check_profile(profile)?;
                Ok(self.y_address(channel, profile))
            }
            (StateKind::Y1, None) => Err(Error::MissingProfile),
            (_, Some(_)) => Err(Error::UnexpectedProfile),
            (StateKind::X0, None) => Ok(self.x_base() | channel << 1),
            (StateKind::X1, None) => Ok(self.x_base() | channel << 1 | 1),
        }
    }

    fn y_address(&self, channel: usize, profile: usize) -> usize {
        profile | channel << self.widths.profile
    }

    fn x_base(&self) -> usize {
        1 << (self.widths.profile + self.widths.channel)
    }

    /// Write filter state, truncated to the state width.
    pub fn set_state(
        &mut self,
        channel: usize,
        profile: Option<usize>,
        kind: StateKind,
        value: i32,
    ) -> Result<(), Error> {
        let adr = self.state_address(channel, profile, kind)?;
        debug_assert!(
            kind == StateKind::Y1 || !(self.loading() || self.shifting()),
            "x state access while loading or shifting"
        );
        self.m_state
            .write(adr, value as i64 as u64 & mask(self.widths.state));
        Ok(())
    }

    /// Read filter state, sign extended.
    pub fn get_state(
        &self,
        channel: usize,
        profile: Option<usize>,
        kind: StateKind,
    ) -> Result<i32, Error> {
        let adr = self.state_address(channel, profile, kind)?;
        debug_assert!(
            kind == StateKind::Y1 || !(self.loading() || self.shifting()),
            "x state access while loading or shifting"
        );
        Ok(sext(self.m_state.read(adr), self.widths.state) as i32)
    }

    /// Raw coefficient memory, in hardware layout.
    pub fn coeff_words(&self) -> &[u64] {
        self.m_coeff.words()
    }

    /// Restore a complete coefficient table saved with
    /// [`Iir::coeff_words`].
    pub fn load_coeff_words(&mut self, words: &[u64]) -> Result<(), Error> {
        let dst = self.m_coeff.words_mut();
        if words.len() != dst.len() {
            return Err(Error::TableSize(words.len()));
        }
        let m = mask(2 * self.widths.coeff);
        for (d, s) in dst.iter_mut().zip(words) {
            *d = s & m;
        }
        Ok(())
    }

    /// Start a cycle and clock the engine until it is done again.
    ///
    /// # Returns
    /// Number of clock cycles including the start cycle.
    pub fn run(&mut self) -> u32 {
        self.tick(true);
        let mut cycles = 1;
        while !self.done() {
            self.tick(false);
            cycles += 1;
        }
        cycles
    }

    /// Advance by one clock cycle.
    pub fn tick(&mut self, start: bool) {
        debug_assert!(!start || self.done(), "IIR started while busy");
        let w = self.widths;
        let n = w.channels();
        let phase = self.state & 3;
        let ch0 = (self.state >> 2) & (n - 1);
        let stage = [
            self.stage & 1 != 0,
            self.stage & 2 != 0,
            self.stage & 4 != 0,
        ];

        let mut state_clr = false;
        let mut stage_en = false;
        let mut fsm = self.fsm;
        match self.fsm {
            Fsm::Idle => {
                state_clr = true;
                if start {
                    fsm = Fsm::Load;
                }
            }
            Fsm::Load => {
                if self.state == n - 1 {
                    state_clr = true;
                    stage_en = true;
                    fsm = Fsm::Process;
                }
            }
            Fsm::Process => {
                if self.stage == 0 {
                    state_clr = true;
                    fsm = Fsm::Shift;
                }
            }
            Fsm::Shift => {
                if self.state == 2 * n - 1 {
                    fsm = Fsm::Idle;
                }
            }
        }

        // Coefficient port: low half is the output word/offset,
        // high half the multiplier operand/cfg.
        let cdat = self.m_coeff.dat_r();
        let c_lo = cdat & mask(w.coeff);
        let c_hi = (cdat >> w.coeff) & mask(w.coeff);
        let cfg = Cfg::new_with_raw_value(c_hi as u16);
        let sel_profile = cfg.sel() as usize & (n - 1);
        let word = c_lo as u32 & mask(w.word) as u32;
        // phase 0 fetches b1 of the channel leaving stage 0
        let coeff_channel = if phase == 0 { self.channel[0] } else { ch0 };
        let coeff_port = Port::read(
            coeff_channel << (w.profile + 2) | self.profile[0] << 2 | phase,
        );

        let sdat = self.m_state.dat_r();
        let base = self.x_base();
        let state_port = match self.fsm {
            Fsm::Idle => Port::default(),
            Fsm::Load => Port {
                adr: base | self.state << 1,
                dat_w: (sext(self.adc[self.state] as u64, w.adc)
                    << (w.state - w.adc - 1)) as u64
                    & mask(w.state),
                we: true,
            },
            Fsm::Process => {
                let adr = match Operand::from(phase) {
                    Operand::WriteBack => {
                        self.y_address(self.channel[1], self.profile[1])
                    }
                    Operand::OldY => self.y_address(ch0, self.profile[0]),
                    Operand::FreshX => base | sel_profile << 1,
                    Operand::AgedX => base | self.sel << 1 | 1,
                };
                Port {
                    adr,
                    dat_w: self.dsp.output() as u64 & mask(w.state),
                    we: phase == 0 && stage[2] && self.en[1],
                }
            }
            Fsm::Shift => Port {
                adr: base | self.state,
                dat_w: sdat,
                we: self.state & 1 != 0,
            },
        };

        let dsp_in = dsp::Inputs {
            state: sext(sdat, w.state),
            offset: if phase == 2 {
                0
            } else {
                sext(c_lo, w.coeff) << (w.state - w.coeff - 1)
            },
            coeff: sext(c_hi, w.coeff),
            accu_clr: phase == 0,
            offset_load: phase == 2 || phase == 3,
        };

        if stage[2] && phase == 0 && self.fsm == Fsm::Process {
            log::trace!(
                "ch {} profile {}: p {:#x} y0 {:#x} clip {} we {}",
                self.channel[1],
                self.profile[1],
                self.dsp.accumulator(),
                self.dsp.output(),
                self.dsp.clip(),
                self.en[1]
            );
        }

        let mut next_stage = self.stage;
        if stage_en {
            next_stage |= 1;
        }
        match phase {
            0 => {
                self.profile = [self.ctrl[ch0].profile, self.profile[0]];
                self.dly = self.dlys[ch0];
                self.en_out = self.ctrl[ch0].en_out;
                self.en_iir = self.ctrl[ch0].en_iir;
                if stage[1] {
                    self.dds[self.channel[0]].ftw0 = word;
                }
            }
            1 => {
                if stage[1] {
                    self.dds[self.channel[0]].ftw1 = word;
                }
                if stage[2] {
                    self.dds[self.channel[1]].asf = ((sdat
                        >> (w.state - w.asf - 1))
                        & mask(w.asf))
                        as u32;
                }
            }
            2 => {
                let mut en0 = false;
                if stage[0] {
                    self.dds[ch0].pow = word;
                    if !self.en_out {
                        self.dlys[ch0] = 0;
                    } else if self.dly < cfg.dly() {
                        self.dlys[ch0] = self.dly + 1;
                    } else if self.en_iir {
                        en0 = true;
                    }
                }
                self.en = [en0, self.en[0]];
                self.sel = sel_profile;
            }
            _ => {
                self.channel = [ch0, self.channel[0]];
                next_stage = (next_stage & 1) | ((self.stage << 1) & 0b110);
                if ch0 == n - 1 {
                    next_stage &= !1;
                }
            }
        }

        self.m_coeff.clock(coeff_port);
        self.m_state.clock(state_port);
        self.dsp.clock(dsp_in);
        self.stage = next_stage;
        self.state = if state_clr {
            0
        } else {
            (self.state + 1) & (4 * n - 1)
        };
        self.fsm = fsm;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    fn iir() -> Iir {
        Iir::new(IirWidths::default()).unwrap()
    }

    #[test]
    fn coeff_roundtrip() {
        let mut i = iir();
        let m = mask(i.widths().coeff) as u32;
        for (k, c) in Coeff::iter().enumerate() {
            for v in [0x1234 + k as i32, -3, 0x7fff_ffff] {
                i.set_coeff(3, 5, c, v).unwrap();
                assert_eq!(i.get_coeff(3, 5, c).unwrap(), v as u32 & m);
            }
        }
        // neighbours in the same word are untouched
        i.set_coeff(1, 2, Coeff::Ftw1, 0x155).unwrap();
        i.set_coeff(1, 2, Coeff::B1, -1).unwrap();
        assert_eq!(i.get_coeff(1, 2, Coeff::Ftw1).unwrap(), 0x155);
        assert_eq!(i.get_coeff_signed(1, 2, Coeff::B1).unwrap(), -1);
        assert_eq!(i.get_coeff_signed(1, 2, Coeff::Ftw1).unwrap(), 0x155);
    }

    #[test]
    fn coeff_layout() {
        let mut i = iir();
        i.set_coeff(2, 7, Coeff::Offset, 0x1531).unwrap();
        i.set_coeff(2, 7, Coeff::A1, 0x135).unwrap();
        let adr = 2 << (5 + 2) | 7 << 2 | 2;
        assert_eq!(i.coeff_words()[adr], 0x135 << 18 | 0x1531);
        assert_eq!("b0".parse::<Coeff>(), Ok(Coeff::B0));
        assert_eq!(Coeff::try_from(3u8), Ok(Coeff::Cfg));

        let words = i.coeff_words().to_vec();
        let mut j = iir();
        j.load_coeff_words(&words).unwrap();
        assert_eq!(j.get_coeff(2, 7, Coeff::A1).unwrap(), 0x135);
        assert_eq!(j.load_coeff_words(&words[1..]), Err(Error::TableSize(1023)));
    }

    #[test]
    fn state_access() {
        let mut i = iir();
        i.set_state(4, Some(3), StateKind::Y1, -5).unwrap();
        assert_eq!(i.get_state(4, Some(3), StateKind::Y1).unwrap(), -5);
        i.set_state(4, None, StateKind::X1, 0x743).unwrap();
        assert_eq!(i.get_state(4, None, StateKind::X1).unwrap(), 0x743);
        assert_eq!(i.get_state(4, None, StateKind::X0).unwrap(), 0);
        assert_eq!(
            i.get_state(4, None, StateKind::Y1),
            Err(Error::MissingProfile)
        );
        assert_eq!(
            i.set_state(4, Some(0), StateKind::X0, 1),
            Err(Error::UnexpectedProfile)
        );
        assert_eq!(
            i.set_state(8, None, StateKind::X0, 1),
            Err(Error::Channel(8))
        );
        assert_eq!(
            i.get_state(0, Some(32), StateKind::Y1),
            Err(Error::Profile(32))
        );
        assert_eq!(
            i.set_coeff(0, 32, Coeff::B0, 0),
            Err(Error::Profile(32))
        );
    }

    #[test]
    fn cycle_timing() {
        let mut i = iir();
        i.tick(true);
        let mut t = 1;
        let mut loading = 0;
        let mut processing = 0;
        let mut shifting = 0;
        let mut first_shift = None;
        while !i.done() {
            loading += i.loading() as u32;
            processing += i.processing() as u32;
            if i.shifting() {
                first_shift.get_or_insert(t);
                shifting += 1;
            }
            i.tick(false);
            t += 1;
        }
        assert_eq!((loading, processing, shifting), (8, 41, 16));
        assert_eq!(first_shift, Some(i.widths().latency()));
        assert_eq!(t, 7 * 8 + 10);
        assert_eq!(i.run(), 7 * 8 + 10);
    }

    #[test]
    fn shift() {
        let mut i = iir();
        for ch in 0..8 {
            i.set_adc(ch, ch as i32 - 4);
        }
        i.run();
        for ch in 0..8 {
            let x = (ch as i32 - 4) << 8;
            assert_eq!(i.get_state(ch, None, StateKind::X0).unwrap(), x);
            assert_eq!(i.get_state(ch, None, StateKind::X1).unwrap(), x);
        }
    }

    #[test]
    fn disabled_holds_output() {
        let mut i = iir();
        i.set_state(0, Some(0), StateKind::Y1, 0x1145).unwrap();
        i.set_coeff(0, 0, Coeff::B0, 1 << 11).unwrap();
        i.set_coeff(0, 0, Coeff::Pow, 0x1333).unwrap();
        i.set_ctrl(
            0,
            ChannelCtrl {
                profile: 0,
                en_out: true,
                en_iir: false,
            },
        )
        .unwrap();
        i.set_adc(0, -100);
        i.run();
        assert_eq!(i.get_state(0, Some(0), StateKind::Y1).unwrap(), 0x1145);
        let dds = i.dds()[0];
        assert_eq!(dds.pow, 0x1333);
        assert_eq!(dds.asf, 0x1145 >> 10);
    }

    #[test]
    #[should_panic(expected = "IIR started while busy")]
    fn start_while_busy() {
        let mut i = iir();
        i.tick(true);
        i.tick(true);
    }

    #[test]
    #[should_panic(expected = "x state access while loading or shifting")]
    fn x_access_while_loading() {
        let mut i = iir();
        i.tick(true);
        assert!(i.loading());
        i.get_state(0, None, StateKind::X0).ok();
    }

    #[test]
    fn y_access_while_busy() {
        let mut i = iir();
        i.tick(true);
        i.set_state(1, Some(2), StateKind::Y1, 7).unwrap();
        assert_eq!(i.get_state(1, Some(2), StateKind::Y1), Ok(7));
    }
}

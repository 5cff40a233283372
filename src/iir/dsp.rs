//! Multiplier with pre-adder and accumulator, registered at every stage.
//!
//! # Design
//! This is the common DSP slice structure: `p += (d - a) * b` with `a`,
//! `d`, `b`, `ad`, `m` and `p` all registered. A product therefore lands in
//! the accumulator three cycles after its operands are presented. The
//! accumulator is cleared instead of accumulating when `accu_clr` is
//! asserted. No rounding constant is injected.
//!
//! The output is `p >> shift` saturated to the non-negative half of the
//! state range: if any of the top `accu - state - shift + 1` accumulator
//! bits is set the output is pinned to zero (negative accumulator) or the
//! maximum positive state value.
use super::IirWidths;
use crate::tools::{mask, sext, wrap};

/// Combinatorial inputs for one cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Inputs {
    /// State memory read data, sign extended.
    pub state: i64,
    /// Offset, aligned to the state.
    pub offset: i64,
    /// Coefficient, sign extended.
    pub coeff: i64,
    pub accu_clr: bool,
    pub offset_load: bool,
}

#[derive(Clone, Debug)]
pub struct Dsp {
    state: u32,
    accu: u32,
    shift: u32,
    a: i64,
    d: i64,
    ad: i64,
    b: i64,
    m: i64,
    p: i64,
}

impl Dsp {
    pub fn new(widths: &IirWidths) -> Self {
        Self {
            state: widths.state,
            accu: widths.accu,
            shift: widths.shift,
            a: 0,
            d: 0,
            ad: 0,
            b: 0,
            m: 0,
            p: 0,
        }
    }

    /// Number of accumulator MSBs that must be clear for an unsaturated
    /// output.
    pub fn sign_bits(&self) -> u32 {
        self.accu - self.state - self.shift + 1
    }

    /// The accumulator register.
    pub fn accumulator(&self) -> i64 {
        self.p
    }

    /// Saturation indicator for the current accumulator.
    pub fn clip(&self) -> bool {
        let n = self.sign_bits();
        (self.p as u64 >> (self.accu - n)) & mask(n) != 0
    }

    /// Saturated and scaled accumulator, in `0..1 << (state - 1)`.
    pub fn output(&self) -> i64 {
        if self.clip() {
            if self.p < 0 {
                0
            } else {
                (1 << (self.state - 1)) - 1
            }
        } else {
            self.p >> self.shift
        }
    }

    /// Advance all pipeline registers.
    pub fn clock(&mut self, x: Inputs) {
        let p = if x.accu_clr {
            0
        } else {
            wrap(self.p.wrapping_add(self.m), self.accu)
        };
        self.p = p;
        self.m = wrap(self.ad * self.b, self.accu);
        self.b = x.coeff;
        self.ad = wrap(self.d - self.a, self.state);
        if x.offset_load {
            self.d = x.offset;
        }
        self.a = sext(x.state as u64, self.state);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dsp() -> Dsp {
        Dsp::new(&IirWidths::default())
    }

    #[test]
    fn latency() {
        let mut d = dsp();
        d.clock(Inputs {
            state: 3,
            offset: 10,
            offset_load: true,
            accu_clr: true,
            ..Default::default()
        });
        d.clock(Inputs {
            coeff: 5,
            ..Default::default()
        });
        d.clock(Inputs::default());
        assert_eq!(d.accumulator(), 0);
        d.clock(Inputs::default());
        assert_eq!(d.accumulator(), (10 - 3) * 5);
    }

    #[test]
    fn saturation() {
        let mut d = dsp();
        d.p = 1 << 40;
        assert!(d.clip());
        assert_eq!(d.output(), (1 << 24) - 1);
        d.p = -1;
        assert!(d.clip());
        assert_eq!(d.output(), 0);
        d.p = ((1 << 24) - 1) << 11;
        assert!(!d.clip());
        assert_eq!(d.output(), (1 << 24) - 1);
        d.p = (1 << 34) | 0x7ff;
        assert_eq!(d.output(), 1 << 23);
    }
}

use core::f64::consts::PI;
use num_traits::float::FloatCore;

use super::{Error, IirWidths};

/// Quantize to a signed fixed point integer.
///
/// # Args
/// * `value`: Real value
/// * `width`: Two's complement width of the result
/// * `shift`: Fractional bits
fn quantize(value: f64, width: u32, shift: u32) -> Result<i32, Error> {
    let i = (value * (1u64 << shift) as f64).round();
    let k = (1i64 << (width - 1)) as f64;
    if !(-k..k).contains(&i) {
        return Err(Error::CoefficientRange { value, width });
    }
    Ok(i as i32)
}

/// PI controller coefficients.
///
/// Transfer function `H(s) = k (s/(2 pi f) + 1)/(s/(2 pi f) + 1/g)`,
/// bilinear transform. With `g` infinite this is `k + 2 pi f k/s`.
///
/// # Args
/// * `widths`: Coefficient width and scaling of the filter engine
/// * `f`: Integrator corner (P zero) in units of the sample rate
/// * `k`: Proportional gain
/// * `g`: Integrator gain limit, `f64::INFINITY` for none
///
/// # Returns
/// `[a1, b0, b1]`
pub fn pi_coefficients(
    widths: &IirWidths,
    f: f64,
    k: f64,
    g: f64,
) -> Result<[i32; 3], Error> {
    let f = f * PI;
    let z = f / g + 1.;
    let a1 = quantize((f / g - 1.) / z, widths.coeff, widths.shift)?;
    // b0, b1 see the pre-adder halved input
    let b0 = quantize(k * (f + 1.) / z, widths.coeff, widths.shift + 1)?;
    let b1 = quantize(k * (f - 1.) / z, widths.coeff, widths.shift + 1)?;
    Ok([a1, b0, b1])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integrator() {
        let w = IirWidths::default();
        assert_eq!(
            pi_coefficients(&w, 0.005, 0.01, f64::INFINITY),
            Ok([-(1 << 11), 42, -40])
        );
    }

    #[test]
    fn limited() {
        let w = IirWidths::default();
        let [a1, b0, b1] = pi_coefficients(&w, 0.01, 1., 10.).unwrap();
        // pole inside the unit circle
        assert!(a1 > -(1 << 11) && a1 < 0);
        assert!(b0 > 0 && b1 < 0);
        assert!(b0 + b1 > 0);
    }

    #[test]
    fn range() {
        let w = IirWidths::default();
        assert!(matches!(
            pi_coefficients(&w, 0.005, 100., f64::INFINITY),
            Err(Error::CoefficientRange { width: 18, .. })
        ));
    }
}

/// Mask of the `width` least significant bits.
pub const fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Sign extend the `width` least significant bits of `value`.
///
/// # Args
/// * `value`: Raw bits, anything above `width` is ignored
/// * `width`: Two's complement width, `1..=64`
pub const fn sext(value: u64, width: u32) -> i64 {
    let s = 64 - width;
    ((value << s) as i64) >> s
}

/// Wrap a signed value into a two's complement integer of `width` bits.
pub const fn wrap(value: i64, width: u32) -> i64 {
    sext(value as u64, width)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sign_extension() {
        assert_eq!(mask(3), 0b111);
        assert_eq!(mask(64), u64::MAX);
        assert_eq!(sext(0x7fff, 16), 0x7fff);
        assert_eq!(sext(0x8000, 16), -0x8000);
        assert_eq!(sext(0x1_ffff, 16), -1);
        assert_eq!(sext(u64::MAX, 64), -1);
        assert_eq!(wrap(1 << 24, 25), -(1 << 24));
        assert_eq!(wrap(-(1 << 24) - 1, 25), (1 << 24) - 1);
    }
}

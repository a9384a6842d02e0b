//! 17.14 signed fixed-point arithmetic, used exclusively by
//! the MLFQ policy (`sched::mlfq`) for `recent_cpu` and `load_avg`.

const FRAC_BITS: u32 = 14;
const ONE: i64 = 1 << FRAC_BITS;

/// A Q17.14 fixed-point number backed by an `i64` so intermediate products
/// (which need the full 31+31 bits before the post-multiply shift) never
/// overflow a 32-bit host type the way the original 32-bit `int32_t` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fixed(i64);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);

    /// Truncating int -> fixed conversion.
    pub const fn from_int(n: i32) -> Fixed {
        Fixed((n as i64) * ONE)
    }

    /// Truncating fixed -> int conversion (round toward zero).
    pub const fn trunc_to_int(self) -> i32 {
        (self.0 / ONE) as i32
    }

    /// Round-to-nearest fixed -> int conversion.
    pub const fn round_to_int(self) -> i32 {
        if self.0 >= 0 {
            ((self.0 + ONE / 2) / ONE) as i32
        } else {
            ((self.0 - ONE / 2) / ONE) as i32
        }
    }

    /// `round(100*x)`, the representation every public MLFQ getter returns.
    pub const fn round_times_100(self) -> i32 {
        Fixed(self.0 * 100).round_to_int()
    }

    pub const fn add_int(self, n: i32) -> Fixed {
        Fixed(self.0 + (n as i64) * ONE)
    }

    pub const fn sub_int(self, n: i32) -> Fixed {
        Fixed(self.0 - (n as i64) * ONE)
    }

    pub const fn mul_int(self, n: i32) -> Fixed {
        Fixed(self.0 * n as i64)
    }

    pub const fn div_int(self, n: i32) -> Fixed {
        Fixed(self.0 / n as i64)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }
}

impl core::ops::Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl core::ops::Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl core::ops::Mul for Fixed {
    type Output = Fixed;
    /// Product is shifted right by `FRAC_BITS` after multiplying.
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed((((self.0 as i128) * (rhs.0 as i128)) >> FRAC_BITS) as i64)
    }
}

impl core::ops::Div for Fixed {
    type Output = Fixed;
    /// Dividend is shifted left by `FRAC_BITS` before dividing.
    fn div(self, rhs: Fixed) -> Fixed {
        Fixed((((self.0 as i128) << FRAC_BITS) / rhs.0 as i128) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_roundtrip() {
        assert_eq!(Fixed::from_int(59).trunc_to_int(), 59);
        assert_eq!(Fixed::from_int(-59).trunc_to_int(), -59);
    }

    #[test]
    fn rounding_matches_pintos_examples() {
        // 59/60 in fixed point, rounded, is 0 (fraction < 0.5).
        let f = Fixed::from_int(59) / Fixed::from_int(60);
        assert_eq!(f.round_to_int(), 1); // 0.9833.. rounds to 1
        let half = Fixed::from_int(1) / Fixed::from_int(2);
        assert_eq!(half.round_to_int(), 1); // round half away from zero
    }

    #[test]
    fn mul_div_preserve_scale() {
        let a = Fixed::from_int(3);
        let b = Fixed::from_int(2);
        assert_eq!((a * b).trunc_to_int(), 6);
        assert_eq!((a / b).round_to_int(), 2);
        assert_eq!((a / b).trunc_to_int(), 1); // 1.5 truncates to 1
    }

    #[test]
    fn add_sub_int_and_fixed() {
        let a = Fixed::from_int(10);
        assert_eq!(a.add_int(5).trunc_to_int(), 15);
        assert_eq!(a.sub_int(5).trunc_to_int(), 5);
        assert_eq!((a + Fixed::from_int(5)).trunc_to_int(), 15);
        assert_eq!((a - Fixed::from_int(5)).trunc_to_int(), 5);
    }

    #[test]
    fn times_100_matches_pintos_getter_contract() {
        let load = Fixed::from_int(1) / Fixed::from_int(3);
        // 0.333... * 100 rounds to 33.
        assert_eq!(load.round_times_100(), 33);
    }
}

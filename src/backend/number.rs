// src/backend/number.rs

use half::f16;
use std::cmp::{PartialEq, PartialOrd};
use std::default::Default;
use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Base trait for the element types a tensor can hold.
///
/// Only floating-point types make sense for normalization, so unlike a general
/// numeric trait this one is float-only and its conversions are infallible:
/// converting an `f64` into a narrower float rounds instead of failing.
pub trait Float:
    // Basic arithmetic operations
    Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self> +
    // Assignment operations
    AddAssign + SubAssign + MulAssign + DivAssign +
    // Negation
    Neg<Output = Self> +
    // Comparisons
    PartialOrd + PartialEq +
    // Essential traits
    Clone + Copy + Debug + Display + Default + Send + Sync + 'static
{
    /// Neutral element for addition (zero)
    fn zero() -> Self;

    /// Neutral element for multiplication (one)
    fn one() -> Self;

    /// Square root
    fn sqrt(self) -> Self;

    /// Absolute value
    fn abs(self) -> Self;

    /// Power using an integer exponent
    fn powi(self, exp: i32) -> Self;

    /// Converts to f64, used when statistics are accumulated in wide precision
    fn to_f64(self) -> f64;

    /// Converts from f64, rounding to the nearest representable value
    fn from_f64(value: f64) -> Self;

    /// Element counts show up as divisors in every mean.
    fn from_usize(value: usize) -> Self {
        Self::from_f64(value as f64)
    }

    /// Checks if it's finite
    fn is_finite(self) -> bool;

    /// Machine epsilon for this type
    fn epsilon() -> Self;

    /// Short name used in log lines and the CLI.
    fn type_name() -> &'static str;
}

impl Float for f64 {
    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    fn abs(self) -> Self {
        f64::abs(self)
    }
    fn powi(self, exp: i32) -> Self {
        f64::powi(self, exp)
    }
    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(value: f64) -> Self {
        value
    }
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
    fn epsilon() -> Self {
        f64::EPSILON
    }
    fn type_name() -> &'static str {
        "f64"
    }
}

impl Float for f32 {
    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }
    fn abs(self) -> Self {
        f32::abs(self)
    }
    fn powi(self, exp: i32) -> Self {
        f32::powi(self, exp)
    }
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(value: f64) -> Self {
        value as f32
    }
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
    fn epsilon() -> Self {
        f32::EPSILON
    }
    fn type_name() -> &'static str {
        "f32"
    }
}

// f16 has no native transcendental functions, so everything that is not plain
// arithmetic goes through f32 and is rounded back.
impl Float for f16 {
    fn zero() -> Self {
        f16::ZERO
    }
    fn one() -> Self {
        f16::ONE
    }
    fn sqrt(self) -> Self {
        f16::from_f32(self.to_f32().sqrt())
    }
    fn abs(self) -> Self {
        f16::from_f32(self.to_f32().abs())
    }
    fn powi(self, exp: i32) -> Self {
        f16::from_f32(self.to_f32().powi(exp))
    }
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }
    fn is_finite(self) -> bool {
        f16::is_finite(self)
    }
    fn epsilon() -> Self {
        f16::EPSILON
    }
    fn type_name() -> &'static str {
        "f16"
    }
}

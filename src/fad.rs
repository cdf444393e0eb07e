//! Scalar abstraction for plain and derivative-carrying arithmetic
//!
//! The projection and linearization routines are written once, generic over
//! [`FadScalar`]. They run either on plain `f64` or on [`Fad`], a forward-mode
//! dual number that carries `N` first derivatives alongside its value.
//!
//! Comparisons and branching always go through [`FadScalar::value`], never through
//! the derivative-carrying type itself.

use num_traits::{One, Zero};
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Number-like type usable by the generic numerical kernels
pub trait FadScalar:
    nalgebra::Scalar
    + Copy
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + From<f64>
    + fmt::Display
{
    /// The underlying value without derivative information
    fn value(&self) -> f64;

    /// Square root
    fn sqrt(self) -> Self;

    /// Absolute value
    fn abs(self) -> Self;

    /// Arccosine
    fn acos(self) -> Self;
}

impl FadScalar for f64 {
    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline]
    fn acos(self) -> Self {
        f64::acos(self)
    }
}

/// Forward-mode automatic differentiation type with `N` derivative directions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fad<const N: usize> {
    val: f64,
    dx: [f64; N],
}

impl<const N: usize> Fad<N> {
    /// A constant (all derivatives zero)
    pub fn constant(val: f64) -> Self {
        Self { val, dx: [0.0; N] }
    }

    /// The independent variable `index`, i.e. with unit derivative in direction `index`
    ///
    /// Panics if `index >= N`.
    pub fn variable(val: f64, index: usize) -> Self {
        let mut dx = [0.0; N];
        dx[index] = 1.0;
        Self { val, dx }
    }

    /// A value with prescribed derivatives
    pub fn with_gradient(val: f64, dx: [f64; N]) -> Self {
        Self { val, dx }
    }

    /// Derivative in direction `i`
    pub fn dx(&self, i: usize) -> f64 {
        self.dx[i]
    }

    /// All derivatives
    pub fn gradient(&self) -> &[f64; N] {
        &self.dx
    }

    /// Number of derivative directions
    pub const fn size() -> usize {
        N
    }

    fn map_dx(self, factor: f64) -> [f64; N] {
        let mut dx = self.dx;
        for d in dx.iter_mut() {
            *d *= factor;
        }
        dx
    }
}

impl<const N: usize> Default for Fad<N> {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl<const N: usize> From<f64> for Fad<N> {
    fn from(val: f64) -> Self {
        Self::constant(val)
    }
}

impl<const N: usize> fmt::Display for Fad<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.val)?;
        for (i, d) in self.dx.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl<const N: usize> Add for Fad<N> {
    type Output = Self;

    #[inline]
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<const N: usize> AddAssign for Fad<N> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.val += rhs.val;
        for (a, b) in self.dx.iter_mut().zip(rhs.dx.iter()) {
            *a += b;
        }
    }
}

impl<const N: usize> Sub for Fad<N> {
    type Output = Self;

    #[inline]
    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl<const N: usize> SubAssign for Fad<N> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.val -= rhs.val;
        for (a, b) in self.dx.iter_mut().zip(rhs.dx.iter()) {
            *a -= b;
        }
    }
}

impl<const N: usize> Mul for Fad<N> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let mut dx = [0.0; N];
        for i in 0..N {
            dx[i] = self.dx[i] * rhs.val + self.val * rhs.dx[i];
        }
        Self {
            val: self.val * rhs.val,
            dx,
        }
    }
}

impl<const N: usize> MulAssign for Fad<N> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<const N: usize> Div for Fad<N> {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.val;
        let val = self.val * inv;
        let mut dx = [0.0; N];
        for i in 0..N {
            dx[i] = (self.dx[i] - val * rhs.dx[i]) * inv;
        }
        Self { val, dx }
    }
}

impl<const N: usize> DivAssign for Fad<N> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<const N: usize> Neg for Fad<N> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            val: -self.val,
            dx: self.map_dx(-1.0),
        }
    }
}

impl<const N: usize> Zero for Fad<N> {
    fn zero() -> Self {
        Self::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.val == 0.0 && self.dx.iter().all(|d| *d == 0.0)
    }
}

impl<const N: usize> One for Fad<N> {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl<const N: usize> FadScalar for Fad<N> {
    #[inline]
    fn value(&self) -> f64 {
        self.val
    }

    fn sqrt(self) -> Self {
        let val = self.val.sqrt();
        // d sqrt(u) = du / (2 sqrt(u)); undefined at zero, keep it finite
        let factor = if val > 0.0 { 0.5 / val } else { 0.0 };
        Self {
            val,
            dx: self.map_dx(factor),
        }
    }

    fn abs(self) -> Self {
        if self.val < 0.0 {
            -self
        } else {
            self
        }
    }

    fn acos(self) -> Self {
        let root = (1.0 - self.val * self.val).sqrt();
        let factor = if root > 0.0 { -1.0 / root } else { 0.0 };
        Self {
            val: self.val.acos(),
            dx: self.map_dx(factor),
        }
    }
}

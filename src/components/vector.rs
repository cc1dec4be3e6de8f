//! Two-dimensional float vector.
//!
//! [`Vector`] is the value type behind positions, extents, velocities and
//! impulses. Arithmetic is componentwise; ordering compares lengths.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::error::EngineResult;
use crate::math;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
}

impl Vector {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn splat(d: f32) -> Self {
        Self { x: d, y: d }
    }

    pub fn length(&self) -> f32 {
        math::length(self.x, self.y)
    }

    /// Direction in degrees, measured from +X toward +Y.
    pub fn angle(&self) -> f32 {
        math::angle(self.x, self.y)
    }

    /// Unit vector in the same direction. A zero vector stays zero.
    pub fn unit(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return Self::ZERO;
        }
        *self * (1.0 / len)
    }

    /// Rotates counter-clockwise by `degrees`.
    pub fn rotate(&mut self, degrees: f32) {
        let (sin, cos) = (math::sine(degrees), math::cosine(degrees));
        let x = self.x * cos - self.y * sin;
        self.y = self.x * sin + self.y * cos;
        self.x = x;
    }

    /// Keeps the direction and sets the length.
    pub fn adjust(&mut self, length: f32) {
        *self = self.unit() * length;
    }

    pub fn interpolate(&mut self, other: Self, time: f32) {
        self.x = math::interpolate(self.x, other.x, time);
        self.y = math::interpolate(self.y, other.y, time);
    }

    pub fn clamp(&mut self, min: Self, max: Self) -> EngineResult<()> {
        self.x = math::clamp(self.x, min.x, max.x)?;
        self.y = math::clamp(self.y, min.y, max.y)?;
        Ok(())
    }

    /// Wraps each component into `[-limit, limit]`.
    pub fn normalize(&mut self, limit: Self) -> EngineResult<()> {
        self.x = math::normalize(self.x, limit.x)?;
        self.y = math::normalize(self.y, limit.y)?;
        Ok(())
    }

    pub fn average(a: Self, b: Self) -> Self {
        (a + b) * 0.5
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Componentwise product.
impl Mul for Vector {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Mul<f32> for Vector {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vector {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign<f32> for Vector {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.x, self.y)
    }
}

//! Scalar helpers shared by the geometry types and the script `math`/`geometry`
//! tables.
//!
//! Angles are in degrees throughout the engine.

use crate::error::{EngineError, EngineResult};

pub const PI: f32 = std::f32::consts::PI;

pub fn absolute(value: f32) -> f32 {
    value.abs()
}

/// Truncates toward zero.
pub fn round(value: f32) -> i64 {
    (value - value % 1.0) as i64
}

pub fn square_root(value: f32) -> EngineResult<f32> {
    if value < 0.0 {
        return Err(EngineError::validation("negative square root"));
    }
    Ok(value.sqrt())
}

pub fn power(value: f32, exponent: f32) -> f32 {
    value.powf(exponent)
}

pub fn average(a: f32, b: f32) -> f32 {
    (a + b) * 0.5
}

/// Geometric mean of two values.
pub fn geometric_average(x: f32, y: f32) -> EngineResult<f32> {
    square_root(x * y)
}

/// Clamps `value` into `[min, max]`.
///
/// A degenerate range (`min == max`) returns `min`; an inverted range is an error.
pub fn clamp(value: f32, min: f32, max: f32) -> EngineResult<f32> {
    if min == max {
        return Ok(min);
    }
    if min > max {
        return Err(EngineError::validation("invalid clamp limits"));
    }
    Ok(value.clamp(min, max))
}

/// Wraps `value` into `[-limit, limit]` in steps of `2 * limit`.
pub fn normalize(value: f32, limit: f32) -> EngineResult<f32> {
    if limit < 0.0 {
        return Err(EngineError::validation("invalid normalization limit"));
    }
    if limit == 0.0 {
        return Ok(0.0);
    }
    let period = limit * 2.0;
    let mut value = value;
    if value > limit {
        value -= ((value - limit) / period).ceil() * period;
    }
    if value < -limit {
        value += ((-limit - value) / period).ceil() * period;
    }
    Ok(value)
}

pub fn random(rng: &mut fastrand::Rng, min: f32, max: f32) -> EngineResult<f32> {
    if min > max {
        return Err(EngineError::validation("invalid random limits"));
    }
    Ok(min + rng.f32() * (max - min))
}

pub fn length(x: f32, y: f32) -> f32 {
    (x * x + y * y).sqrt()
}

pub fn angle(x: f32, y: f32) -> f32 {
    y.atan2(x).to_degrees()
}

pub fn sine(degrees: f32) -> f32 {
    degrees.to_radians().sin()
}

pub fn cosine(degrees: f32) -> f32 {
    degrees.to_radians().cos()
}

pub fn interpolate(a: f32, b: f32, time: f32) -> f32 {
    a * (1.0 - time) + b * time
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn clamp_degenerate_range_returns_min() {
        assert_eq!(clamp(5.0, 2.0, 2.0).unwrap(), 2.0);
    }

    #[test]
    fn clamp_inverted_range_is_rejected() {
        assert!(matches!(
            clamp(0.5, 1.0, 0.0),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn clamp_limits_both_sides() {
        assert_eq!(clamp(-3.0, 0.0, 1.0).unwrap(), 0.0);
        assert_eq!(clamp(3.0, 0.0, 1.0).unwrap(), 1.0);
        assert_eq!(clamp(0.25, 0.0, 1.0).unwrap(), 0.25);
    }

    #[test]
    fn normalize_wraps_into_symmetric_range() {
        assert!(approx_eq(normalize(190.0, 180.0).unwrap(), -170.0));
        assert!(approx_eq(normalize(-190.0, 180.0).unwrap(), 170.0));
        assert!(approx_eq(normalize(900.0, 180.0).unwrap(), 180.0));
        assert!(approx_eq(normalize(45.0, 180.0).unwrap(), 45.0));
    }

    #[test]
    fn normalize_rejects_negative_limit() {
        assert!(normalize(1.0, -1.0).is_err());
    }

    #[test]
    fn square_root_of_negative_is_rejected() {
        assert!(square_root(-1.0).is_err());
        assert!(approx_eq(square_root(9.0).unwrap(), 3.0));
    }

    #[test]
    fn round_truncates_toward_zero() {
        assert_eq!(round(2.7), 2);
        assert_eq!(round(-2.7), -2);
    }

    #[test]
    fn angle_is_in_degrees() {
        assert!(approx_eq(angle(0.0, 1.0), 90.0));
        assert!(approx_eq(angle(-1.0, 0.0), 180.0));
    }

    #[test]
    fn trig_takes_degrees() {
        assert!(approx_eq(sine(90.0), 1.0));
        assert!(approx_eq(cosine(180.0), -1.0));
    }

    #[test]
    fn random_stays_in_range() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..100 {
            let v = random(&mut rng, -2.0, 3.0).unwrap();
            assert!((-2.0..=3.0).contains(&v));
        }
        assert!(random(&mut rng, 1.0, 0.0).is_err());
    }

    #[test]
    fn interpolate_endpoints() {
        assert!(approx_eq(interpolate(2.0, 4.0, 0.0), 2.0));
        assert!(approx_eq(interpolate(2.0, 4.0, 1.0), 4.0));
        assert!(approx_eq(interpolate(2.0, 4.0, 0.5), 3.0));
    }
}

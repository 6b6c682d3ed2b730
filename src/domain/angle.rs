//! Accelerometer to Angle Conversion
//!
//! Turns a raw 3-axis acceleration sample into the two angle bytes sent
//! to the toy: one derived from the Y axis tilt, one from the Z axis tilt.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use thiserror::Error;
use tracing::trace;

/// Upper end of the angle range the hardware documents.
pub const DOCUMENTED_MAX_ANGLE: u8 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AngleError {
    #[error("Degenerate sample: acceleration vector has zero or non-finite magnitude")]
    DegenerateSample,
}

/// Angle bytes derived from one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnglePair {
    /// Y axis tilt, signed by the X axis turn direction
    pub y_axis: u8,
    /// Z axis tilt
    pub z_axis: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AngleConverter {
    clamp_to_documented_range: bool,
}

impl AngleConverter {
    pub fn new(clamp_to_documented_range: bool) -> Self {
        Self {
            clamp_to_documented_range,
        }
    }

    /// Convert an acceleration sample into angle bytes.
    pub fn axes_to_angles(&self, x: f32, y: f32, z: f32) -> Result<AnglePair, AngleError> {
        let (x, y, z) = (x as f64, y as f64, z as f64);
        let magnitude = (x * x + y * y + z * z).sqrt();

        if !magnitude.is_finite() || magnitude == 0.0 {
            return Err(AngleError::DegenerateSample);
        }

        // Left turn for negative X, right turn otherwise
        let direction = if x < 0.0 { -1.0 } else { 1.0 };

        let y_angle = unit_acos(y.abs() / magnitude);
        let converted_y = FRAC_PI_2 + direction * y_angle;

        let converted_z = unit_acos(z.abs() / magnitude);

        Ok(AnglePair {
            y_axis: self.limit(to_command_byte(converted_y)),
            z_axis: self.limit(to_command_byte(converted_z)),
        })
    }

    fn limit(&self, angle: u8) -> u8 {
        if angle > DOCUMENTED_MAX_ANGLE {
            trace!("Angle {} outside documented 0-{} range", angle, DOCUMENTED_MAX_ANGLE);
            if self.clamp_to_documented_range {
                return DOCUMENTED_MAX_ANGLE;
            }
        }
        angle
    }
}

/// Convert with the default (unclamped) converter.
pub fn axes_to_angles(x: f32, y: f32, z: f32) -> Result<AnglePair, AngleError> {
    AngleConverter::default().axes_to_angles(x, y, z)
}

/// Map a radian angle onto the toy's command range.
///
/// `floor((π/4 + a/2) * 180/π)`, then limited to a byte.
pub fn to_command_byte(radians: f64) -> u8 {
    let degrees = ((FRAC_PI_4 + radians / 2.0) * 180.0 / PI).floor();
    degrees.clamp(0.0, u8::MAX as f64) as u8
}

// Rounding can push |component| / magnitude a hair past 1.0
fn unit_acos(ratio: f64) -> f64 {
    ratio.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_vector_is_degenerate() {
        assert_eq!(axes_to_angles(0.0, 0.0, 0.0), Err(AngleError::DegenerateSample));
    }

    #[test]
    fn test_non_finite_is_degenerate() {
        assert_eq!(axes_to_angles(f32::NAN, 0.0, 1.0), Err(AngleError::DegenerateSample));
        assert_eq!(
            axes_to_angles(f32::INFINITY, 0.0, 1.0),
            Err(AngleError::DegenerateSample)
        );
    }

    #[test]
    fn test_sign_of_x_picks_turn_direction() {
        let right = axes_to_angles(1.0, 0.0, 0.0).unwrap();
        let left = axes_to_angles(-1.0, 0.0, 0.0).unwrap();

        assert!(right.y_axis > left.y_axis);
        assert!((134..=135).contains(&right.y_axis));
        assert!((44..=45).contains(&left.y_axis));

        // Z does not depend on direction
        assert_eq!(right.z_axis, left.z_axis);
    }

    #[test]
    fn test_direction_is_monotonic_in_sign_of_x() {
        for (y, z) in [(0.3f32, 0.5f32), (-0.8, 0.1), (0.0, 9.8)] {
            let right = axes_to_angles(0.5, y, z).unwrap();
            let left = axes_to_angles(-0.5, y, z).unwrap();
            assert!(right.y_axis >= left.y_axis);
        }
    }

    #[test]
    fn test_flat_device() {
        // Gravity straight along Z: no Y tilt, no Z angle.
        let angles = axes_to_angles(0.0, 0.0, 9.81).unwrap();
        assert!((134..=135).contains(&angles.y_axis));
        assert!((44..=45).contains(&angles.z_axis));
    }

    #[test]
    fn test_magnitude_does_not_matter() {
        assert_eq!(
            axes_to_angles(0.2, 0.4, 0.6).unwrap(),
            axes_to_angles(2.0, 4.0, 6.0).unwrap()
        );
    }

    #[test]
    fn test_to_command_byte_range() {
        assert!((89..=90).contains(&to_command_byte(PI / 2.0)));
        assert_eq!(to_command_byte(-10.0), 0);
        assert_eq!(to_command_byte(100.0), 255);
    }

    #[test]
    fn test_clamp_to_documented_range() {
        let converter = AngleConverter::new(true);
        let angles = converter.axes_to_angles(1.0, 0.0, 0.0).unwrap();
        assert_eq!(angles.y_axis, DOCUMENTED_MAX_ANGLE);
        assert_eq!(angles.z_axis, DOCUMENTED_MAX_ANGLE);
    }
}

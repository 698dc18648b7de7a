//! Compass heading alignment
//!
//! Fuses the absolute true heading with the tracking session's device
//! orientation into a rotation about the vertical axis that points a fixed
//! local reference axis at true north. The estimate is only trusted while the
//! device is held within a small attitude envelope.

use crate::core::TILT_LIMIT;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Cross-product magnitude below which the rotation sense is ambiguous
const SIGN_EPSILON: f32 = 1e-6;

/// Camera orientation as reported by tracking is a quarter turn off the device frame
pub fn device_orientation_from_camera(camera: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    camera * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2)
}

/// Produces heading alignment quaternions from device attitude and true heading
#[derive(Debug, Clone, Copy)]
pub struct HeadingAligner {
    tilt_limit: f32,
}

impl Default for HeadingAligner {
    fn default() -> Self {
        Self { tilt_limit: TILT_LIMIT }
    }
}

impl HeadingAligner {
    pub fn new(tilt_limit: f32) -> Self {
        Self { tilt_limit }
    }

    /// Whether the device attitude is inside the envelope where heading is reliable
    pub fn is_within_envelope(&self, device_orientation: &UnitQuaternion<f32>) -> bool {
        let up = device_orientation * Vector3::y();
        let back = device_orientation * Vector3::z();

        let tipped = up.y < self.tilt_limit;
        let rolled = back.y < self.tilt_limit;
        !tipped && !rolled
    }

    /// Compute the alignment for the current heading (degrees) and device orientation.
    ///
    /// Returns `None` when the heading is unknown, the device is outside the
    /// attitude envelope, or the geometry is degenerate. Callers keep their
    /// previous alignment in that case.
    pub fn align(
        &self,
        true_heading_degrees: Option<f64>,
        device_orientation: &UnitQuaternion<f32>,
    ) -> Option<UnitQuaternion<f32>> {
        let heading = true_heading_degrees?.to_radians() as f32;
        if !heading.is_finite() {
            return None;
        }

        if !self.is_within_envelope(device_orientation) {
            return None;
        }

        let up = device_orientation * Vector3::y();
        let projected = Vector3::new(up.x, 0.0, up.z);

        let local_heading = signed_angle(&Vector3::x(), &projected)?;
        let relative = normalize_radians(local_heading - heading);
        if relative.is_nan() {
            return None;
        }

        let down_axis = Unit::new_normalize(Vector3::new(0.0, -1.0, 0.0));
        Some(UnitQuaternion::from_axis_angle(&down_axis, relative))
    }
}

/// Signed angle from `a` to `b` about the global up axis
fn signed_angle(a: &Vector3<f32>, b: &Vector3<f32>) -> Option<f32> {
    let cosine = a.dot(b) / (a.norm() * b.norm());
    // NaN survives the clamp, so a zero-length projection is still caught
    let angle = cosine.clamp(-1.0, 1.0).acos();
    if angle.is_nan() {
        return None;
    }

    let direction = a.cross(b).dot(&Vector3::y());
    if direction.abs() <= SIGN_EPSILON && angle > SIGN_EPSILON {
        // Anti-parallel: the sign test cannot tell the rotation sense
        return None;
    }

    Some(if direction < 0.0 { angle } else { -angle })
}

/// Wrap an angle into [0, 2π)
fn normalize_radians(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Rotation3};
    use std::f32::consts::PI;

    /// Device orientation whose up axis is `j` and back axis is `k`
    fn orientation_from_axes(j: Vector3<f32>, k: Vector3<f32>) -> UnitQuaternion<f32> {
        let i = j.cross(&k);
        let basis = Matrix3::from_columns(&[i, j, k]);
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis))
    }

    fn expected(angle: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(Vector3::new(0.0, -1.0, 0.0)), angle)
    }

    #[test]
    fn test_missing_heading_returns_none() {
        let q = orientation_from_axes(Vector3::new(0.6, 0.8, 0.0), Vector3::new(-0.8, 0.6, 0.0));
        assert!(HeadingAligner::default().align(None, &q).is_none());
    }

    #[test]
    fn test_flat_device_is_outside_envelope() {
        // Identity: up axis vertical, back axis horizontal
        let aligner = HeadingAligner::default();
        assert!(aligner.align(Some(0.0), &UnitQuaternion::identity()).is_none());
    }

    #[test]
    fn test_tipped_device_is_outside_envelope() {
        let q = orientation_from_axes(Vector3::new(0.0, 0.05, 0.99875), Vector3::new(0.0, 0.99875, -0.05));
        assert!(!HeadingAligner::default().is_within_envelope(&q));
        assert!(HeadingAligner::default().align(Some(10.0), &q).is_none());
    }

    #[test]
    fn test_aligned_with_reference_axis() {
        let q = orientation_from_axes(Vector3::new(0.6, 0.8, 0.0), Vector3::new(-0.8, 0.6, 0.0));
        let alignment = HeadingAligner::default().align(Some(90.0), &q).unwrap();

        // 0 - π/2 wraps to 3π/2
        assert!(alignment.angle_to(&expected(3.0 * PI / 2.0)) < 1e-4);
    }

    #[test]
    fn test_rotation_sense_from_cross_product() {
        // Up axis projects onto +Z, a quarter turn from +X
        let q = orientation_from_axes(Vector3::new(0.0, 0.8, 0.6), Vector3::new(0.0, 0.6, -0.8));
        let alignment = HeadingAligner::default().align(Some(0.0), &q).unwrap();
        assert!(alignment.angle_to(&expected(FRAC_PI_2)) < 1e-4);

        // And onto -Z the other way
        let q = orientation_from_axes(Vector3::new(0.0, 0.8, -0.6), Vector3::new(0.0, 0.6, 0.8));
        let alignment = HeadingAligner::default().align(Some(0.0), &q).unwrap();
        assert!(alignment.angle_to(&expected(3.0 * FRAC_PI_2)) < 1e-4);
    }

    #[test]
    fn test_anti_parallel_projection_is_rejected() {
        let q = orientation_from_axes(Vector3::new(-0.6, 0.8, 0.0), Vector3::new(0.8, 0.6, 0.0));
        let result = HeadingAligner::default().align(Some(45.0), &q);
        assert!(result.is_none());
    }

    #[test]
    fn test_nan_heading_is_rejected() {
        let q = orientation_from_axes(Vector3::new(0.6, 0.8, 0.0), Vector3::new(-0.8, 0.6, 0.0));
        assert!(HeadingAligner::default().align(Some(f64::NAN), &q).is_none());
    }

    #[test]
    fn test_normalize_radians() {
        assert!((normalize_radians(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-6);
        assert!((normalize_radians(5.0 * PI) - PI).abs() < 1e-5);
        assert_eq!(normalize_radians(0.0), 0.0);
    }

    #[test]
    fn test_camera_quarter_turn() {
        let device = device_orientation_from_camera(&UnitQuaternion::identity());
        let up = device * Vector3::y();
        assert!((up - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-6);
    }
}

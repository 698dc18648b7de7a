//! Rigid transform helpers over column-major 4x4 matrices

use nalgebra::{Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Homogeneous transform in the local tracking frame (column-major)
pub type Transform = Matrix4<f32>;

/// Translation part of a transform (fourth column)
pub fn translation(transform: &Transform) -> Vector3<f32> {
    Vector3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}

/// Build a transform from a position and an orientation
pub fn from_pose(position: &Vector3<f32>, orientation: &UnitQuaternion<f32>) -> Transform {
    Translation3::from(*position).to_homogeneous() * orientation.to_homogeneous()
}

/// Rotation part of a transform, ignoring any scale
pub fn rotation(transform: &Transform) -> UnitQuaternion<f32> {
    let basis = transform.fixed_view::<3, 3>(0, 0).into_owned();
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&basis))
}

/// Inverse of a transform, `None` when the matrix is singular
pub fn rigid_inverse(transform: &Transform) -> Option<Transform> {
    transform.try_inverse()
}

/// Straight-line distance between the origins of two transforms
pub fn distance_between(a: &Transform, b: &Transform) -> f32 {
    (translation(a) - translation(b)).norm()
}

//! Translation/rotation/scale transforms and their 4x4 matrix algebra.
//!
//! Matrices use the column-vector convention: `world = parent * local`, so the
//! local transform of a child is `inverse(parent) * world`.

use nalgebra::{Matrix3, Matrix4, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Scale columns shorter than this decompose to a zero axis with identity rotation.
const DEGENERATE_AXIS: f32 = 1e-8;

/// A TRS transform. Scale components may be negative to express reflection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3<f32>,
    /// Unit quaternion; `q` and `-q` are the same orientation.
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn new(
        translation: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn from_rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Build from plain arrays; rotation is `[x, y, z, w]` and is normalized.
    /// A zero or non-finite quaternion becomes identity.
    pub fn from_arrays(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        let [x, y, z, w] = rotation;
        Self {
            translation: Vector3::from(translation),
            rotation: renormalize(Quaternion::new(w, x, y, z)),
            scale: Vector3::from(scale),
        }
    }

    /// `T * R * S` as a homogeneous matrix.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Decompose an affine matrix into TRS.
    ///
    /// Scale is taken from the column lengths of the upper 3x3 block. When that
    /// block has a negative determinant the X axis is flipped before the
    /// rotation is extracted, so mirrored matrices still yield a finite unit
    /// quaternion and recompose to the same matrix. Shear is discarded.
    pub fn from_matrix(m: &Matrix4<f32>) -> Self {
        let translation = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let mut basis: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let mut scale = Vector3::new(
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        );

        if scale.iter().any(|s| *s < DEGENERATE_AXIS) {
            return Self {
                translation,
                rotation: UnitQuaternion::identity(),
                scale,
            };
        }

        for axis in 0..3 {
            let len = scale[axis];
            basis.column_mut(axis).unscale_mut(len);
        }
        if basis.determinant() < 0.0 {
            scale.x = -scale.x;
            basis.column_mut(0).neg_mut();
        }

        let extracted =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));
        let rotation = renormalize(extracted.into_inner());

        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Matrix product `self * inner`: `inner` expressed inside this frame.
    pub fn compose(&self, inner: &Transform) -> Transform {
        Self::from_matrix(&(self.to_matrix() * inner.to_matrix()))
    }

    /// `inverse(parent_world) * child_world`, or `None` when the parent is singular.
    pub fn local_from(child_world: &Transform, parent_world: &Transform) -> Option<Transform> {
        let inv_parent = parent_world.to_matrix().try_inverse()?;
        Some(Self::from_matrix(&(inv_parent * child_world.to_matrix())))
    }

    pub fn inverse(&self) -> Option<Transform> {
        self.to_matrix().try_inverse().map(|m| Self::from_matrix(&m))
    }

    /// Map a point from this frame into the parent frame.
    pub fn transform_point(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.translation + self.rotation * self.scale.component_mul(p)
    }

    /// Tolerant comparison; `q` and `-q` compare equal.
    pub fn approx_eq(&self, other: &Transform, eps: f32) -> bool {
        let close = |a: &Vector3<f32>, b: &Vector3<f32>| (a - b).iter().all(|d| d.abs() <= eps);
        close(&self.translation, &other.translation)
            && close(&self.scale, &other.scale)
            && rotation_eq(&self.rotation, &other.rotation, eps)
    }

    pub fn is_finite(&self) -> bool {
        self.translation.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|v| v.is_finite())
    }
}

/// Compare two rotations up to the quaternion double cover.
pub fn rotation_eq(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, eps: f32) -> bool {
    let same = (a.coords - b.coords).iter().all(|d| d.abs() <= eps);
    let flipped = (a.coords + b.coords).iter().all(|d| d.abs() <= eps);
    same || flipped
}

fn renormalize(q: Quaternion<f32>) -> UnitQuaternion<f32> {
    let n = q.norm();
    if !n.is_finite() || n < DEGENERATE_AXIS {
        UnitQuaternion::identity()
    } else {
        UnitQuaternion::new_unchecked(q / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn sample() -> Transform {
        Transform::new(
            Vector3::new(1.0, -2.0, 0.5),
            UnitQuaternion::from_euler_angles(0.3, -0.7, 1.1),
            Vector3::new(1.5, 2.0, 0.75),
        )
    }

    #[test]
    fn matrix_round_trip() {
        let t = sample();
        let back = Transform::from_matrix(&t.to_matrix());
        assert!(back.approx_eq(&t, 1e-5), "{back:?} vs {t:?}");
    }

    #[test]
    fn compose_matches_matrix_product() {
        let a = Transform::new(
            Vector3::new(0.0, 1.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            Vector3::repeat(2.0),
        );
        let b = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0));
        let c = a.compose(&b);
        // b's +X offset is rotated onto +Y and doubled inside a's frame.
        assert_relative_eq!(c.translation, Vector3::new(0.0, 3.0, 0.0), epsilon = 1e-5);
        assert!(rotation_eq(&c.rotation, &a.rotation, 1e-5));
        assert_relative_eq!(c.scale, Vector3::repeat(2.0), epsilon = 1e-5);
    }

    #[test]
    fn local_from_inverts_compose() {
        let parent = sample();
        let local = Transform::new(
            Vector3::new(0.0, 0.4, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.2, 0.0),
            Vector3::repeat(1.0),
        );
        let parent_uniform = Transform {
            scale: Vector3::repeat(1.5),
            ..parent
        };
        let world = parent_uniform.compose(&local);
        let back = Transform::local_from(&world, &parent_uniform).unwrap();
        assert!(back.approx_eq(&local, 1e-5), "{back:?}");
    }

    #[test]
    fn local_from_singular_parent_is_none() {
        let parent = Transform {
            scale: Vector3::new(0.0, 1.0, 1.0),
            ..Transform::identity()
        };
        assert!(Transform::local_from(&Transform::identity(), &parent).is_none());
    }

    #[test]
    fn reflection_decomposes_to_finite_unit_quaternion() {
        let mirrored = Transform::new(
            Vector3::new(0.2, 0.0, -1.0),
            UnitQuaternion::from_euler_angles(0.4, 0.1, -0.9),
            Vector3::new(-1.0, 2.0, 3.0),
        );
        let m = mirrored.to_matrix();
        assert!(m.fixed_view::<3, 3>(0, 0).into_owned().determinant() < 0.0);

        let d = Transform::from_matrix(&m);
        assert!(d.is_finite());
        assert_relative_eq!(d.rotation.norm(), 1.0, epsilon = 1e-5);
        assert!(d.scale.x < 0.0);
        assert_relative_eq!(d.to_matrix(), m, epsilon = 1e-5);
    }

    #[test]
    fn reflection_on_other_axis_recomposes() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, -2.0));
        let d = Transform::from_matrix(&m);
        assert!(d.is_finite());
        assert_relative_eq!(d.to_matrix(), m, epsilon = 1e-5);
    }

    #[test]
    fn zero_scale_axis_stays_finite() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(0.0, 1.0, 1.0));
        let d = Transform::from_matrix(&m);
        assert!(d.is_finite());
        assert_eq!(d.rotation, UnitQuaternion::identity());
    }

    #[test]
    fn negated_quaternion_is_equal() {
        let t = sample();
        let flipped = Transform {
            rotation: UnitQuaternion::new_unchecked(-t.rotation.into_inner()),
            ..t
        };
        assert!(t.approx_eq(&flipped, 1e-6));
        assert!(!t.approx_eq(&Transform { rotation: UnitQuaternion::identity(), ..t }, 1e-3));
    }

    #[test]
    fn transform_point_matches_matrix() {
        let t = sample();
        let p = Vector3::new(0.3, -0.1, 2.0);
        let via_matrix = t.to_matrix().transform_point(&p.into());
        assert_relative_eq!(t.transform_point(&p), via_matrix.coords, epsilon = 1e-5);
    }

    #[test]
    fn json_shape_is_plain_arrays() {
        let t = Transform::from_arrays([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0]);
        let v = serde_json::to_value(t).unwrap();
        assert_eq!(v["translation"], serde_json::json!([1.0, 2.0, 3.0]));
        assert_eq!(v["rotation"], serde_json::json!([0.0, 0.0, 0.0, 1.0]));
        let back: Transform = serde_json::from_value(v).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn zero_quaternion_from_arrays_is_identity() {
        let t = Transform::from_arrays([0.0, 1.0, 0.0], [0.0; 4], [1.0; 3]);
        assert!(t.is_finite());
        assert_eq!(t.rotation, UnitQuaternion::identity());

        let nan = Transform::from_arrays([0.0; 3], [f32::NAN, 0.0, 0.0, 1.0], [1.0; 3]);
        assert_eq!(nan.rotation, UnitQuaternion::identity());

        let scaled = Transform::from_arrays([0.0; 3], [0.0, 0.0, 0.0, 2.0], [1.0; 3]);
        assert!(rotation_eq(&scaled.rotation, &UnitQuaternion::identity(), 1e-6));
    }
}

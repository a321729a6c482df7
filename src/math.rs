//! Transform helpers used by the scenes and the render passes.
//!
//! Everything here is plain `cgmath` math on the CPU. The one piece of real
//! technique is [`Plane::reflection_matrix`], which mirrors any transform across
//! an arbitrary plane and drives the planar reflection pass.

use cgmath::{
    Deg, EuclideanSpace, InnerSpace, Matrix, Matrix3, Matrix4, Point3, Quaternion, Rad, Rotation3,
    SquareMatrix, Vector3, Vector4,
};

/// Rotate `point` around the Y axis through the origin by `angle` radians.
pub fn rotate_y_about_origin(point: Vector3<f32>, angle: f32) -> Vector3<f32> {
    Matrix3::from_angle_y(Rad(angle)) * point
}

/// Rotate `point` around the Z axis through the origin by `angle` radians.
pub fn rotate_z_about_origin(point: Vector3<f32>, angle: f32) -> Vector3<f32> {
    Matrix3::from_angle_z(Rad(angle)) * point
}

/// Build a rotation from Euler angles given in degrees.
///
/// The rotations are applied X first, then Y, then Z (`qz * qy * qx`). Note that
/// `cgmath::Euler` composes in the opposite order, which is why it isn't used here.
pub fn quat_from_euler_deg(x: f32, y: f32, z: f32) -> Quaternion<f32> {
    Quaternion::from_angle_z(Deg(z)) * Quaternion::from_angle_y(Deg(y)) * Quaternion::from_angle_x(Deg(x))
}

/// `T * R * S`
pub fn from_rotation_translation_scale(
    rotation: Quaternion<f32>,
    translation: Vector3<f32>,
    scale: Vector3<f32>,
) -> Matrix4<f32> {
    Matrix4::from_translation(translation)
        * Matrix4::from(rotation)
        * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

/// Upper 3x3 of a 4x4 matrix.
pub fn upper_3x3(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

/// Inverse-transpose of the upper 3x3, used to transform normals under
/// non-uniform scale. A singular matrix falls back to its plain 3x3.
pub fn normal_matrix(m: &Matrix4<f32>) -> Matrix3<f32> {
    let m3 = upper_3x3(m);
    match m3.invert() {
        Some(inv) => inv.transpose(),
        None => m3,
    }
}

/// An infinite plane `normal · x + d = 0` with a unit-length normal.
///
/// The normal points to the "front" side of the plane. For mirrors that is the
/// side the viewer looks from, and it is the side geometry is kept on during
/// the reflection pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub d: f32,
}

impl Plane {
    /// Create a plane from any non-zero normal; the equation is rescaled so the
    /// normal has unit length.
    pub fn new(normal: Vector3<f32>, d: f32) -> Self {
        let len = normal.magnitude();
        debug_assert!(len > f32::EPSILON, "a plane needs a non-zero normal");
        Self {
            normal: normal / len,
            d: d / len,
        }
    }

    pub fn from_point_normal(point: Point3<f32>, normal: Vector3<f32>) -> Self {
        debug_assert!(normal.magnitude2() > f32::EPSILON, "a plane needs a non-zero normal");
        let normal = normal.normalize();
        Self {
            normal,
            d: -normal.dot(point.to_vec()),
        }
    }

    /// The plane through the origin of `model`'s local space whose normal is
    /// `local_normal` transformed into world space.
    pub fn from_transform(model: &Matrix4<f32>, local_normal: Vector3<f32>) -> Self {
        let origin = Point3::from_vec(model.w.truncate());
        let normal = normal_matrix(model) * local_normal;
        Self::from_point_normal(origin, normal)
    }

    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.dot(point.to_vec()) + self.d
    }

    pub fn reflect_point(&self, point: Point3<f32>) -> Point3<f32> {
        point - self.normal * (2.0 * self.signed_distance(point))
    }

    /// `(nx, ny, nz, d)`, the layout the shaders expect for clip planes.
    pub fn as_vec4(&self) -> Vector4<f32> {
        self.normal.extend(self.d)
    }

    /// The affine matrix mirroring space across this plane:
    ///
    /// ```text
    /// | 1-2nx²  -2nxny  -2nxnz  -2d·nx |
    /// | -2nxny  1-2ny²  -2nynz  -2d·ny |
    /// | -2nxnz  -2nynz  1-2nz²  -2d·nz |
    /// |   0       0       0       1    |
    /// ```
    ///
    /// Multiplying a view matrix by it from the right yields the camera that
    /// sees the mirrored scene. It flips handedness, so triangle winding has to
    /// be inverted when rasterising with it.
    pub fn reflection_matrix(&self) -> Matrix4<f32> {
        let Vector3 { x, y, z } = self.normal;
        let d = self.d;
        Matrix4::new(
            1.0 - 2.0 * x * x,
            -2.0 * x * y,
            -2.0 * x * z,
            0.0,
            -2.0 * x * y,
            1.0 - 2.0 * y * y,
            -2.0 * y * z,
            0.0,
            -2.0 * x * z,
            -2.0 * y * z,
            1.0 - 2.0 * z * z,
            0.0,
            -2.0 * d * x,
            -2.0 * d * y,
            -2.0 * d * z,
            1.0,
        )
    }
}

impl Default for Plane {
    /// The XZ plane facing up.
    fn default() -> Self {
        Self {
            normal: Vector3::unit_y(),
            d: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Transform, Zero};

    const EPS: f32 = 1e-4;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    fn close_vec(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        close(a.x, b.x) && close(a.y, b.y) && close(a.z, b.z)
    }

    fn close_mat(a: Matrix4<f32>, b: Matrix4<f32>) -> bool {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .all(|(a, b)| close(*a, *b))
    }

    fn tilted_plane() -> Plane {
        Plane::from_point_normal(Point3::new(0.0, -25.0, 10.0), Vector3::new(0.3, 1.0, -0.2))
    }

    #[test]
    fn reflection_is_an_involution() {
        let r = tilted_plane().reflection_matrix();
        assert!(close_mat(r * r, Matrix4::identity()));
    }

    #[test]
    fn reflection_flips_handedness() {
        let r = tilted_plane().reflection_matrix();
        assert!(close(r.determinant(), -1.0));
    }

    #[test]
    fn points_on_the_plane_stay_put() {
        let plane = tilted_plane();
        let on_plane = Point3::new(0.0, -25.0, 10.0);
        let mirrored = plane.reflection_matrix().transform_point(on_plane);
        assert!(close_vec(mirrored.to_vec(), on_plane.to_vec()));
    }

    #[test]
    fn matrix_agrees_with_reflect_point() {
        let plane = tilted_plane();
        let p = Point3::new(4.0, 7.0, -3.0);
        let by_matrix = plane.reflection_matrix().transform_point(p);
        let by_formula = plane.reflect_point(p);
        assert!(close_vec(by_matrix.to_vec(), by_formula.to_vec()));
        assert!(close(plane.signed_distance(by_formula), -plane.signed_distance(p)));
    }

    #[test]
    fn floor_plane_mirrors_height() {
        let plane = Plane::new(Vector3::new(0.0, 2.0, 0.0), 2.0);
        assert!(close(plane.d, 1.0));
        let mirrored = plane.reflection_matrix().transform_point(Point3::new(1.0, 3.0, 2.0));
        assert!(close_vec(mirrored.to_vec(), Vector3::new(1.0, -5.0, 2.0)));
    }

    #[test]
    fn plane_from_transform_uses_translation_and_rotated_normal() {
        let model = from_rotation_translation_scale(
            Quaternion::from_angle_x(Deg(90.0)),
            Vector3::new(0.0, 0.0, 5.0),
            Vector3::new(45.0, 2.0, 45.0),
        );
        let plane = Plane::from_transform(&model, Vector3::unit_y());
        assert!(close_vec(plane.normal, Vector3::unit_z()));
        assert!(close(plane.d, -5.0));
    }

    #[test]
    fn rotations_match_right_handed_convention() {
        let p = Vector3::new(1.0, 0.0, 0.0);
        let half_pi = std::f32::consts::FRAC_PI_2;
        assert!(close_vec(rotate_y_about_origin(p, half_pi), Vector3::new(0.0, 0.0, -1.0)));
        assert!(close_vec(rotate_z_about_origin(p, half_pi), Vector3::new(0.0, 1.0, 0.0)));
        assert!(close_vec(rotate_z_about_origin(Vector3::zero(), 1.3), Vector3::zero()));
    }

    #[test]
    fn euler_applies_x_before_z() {
        // X by 90° sends +Y to +Z, then Z by 90° leaves +Z alone.
        let q = quat_from_euler_deg(90.0, 0.0, 90.0);
        assert!(close_vec(q * Vector3::unit_y(), Vector3::unit_z()));
        // ...whereas +X is first untouched and then rotated onto +Y.
        assert!(close_vec(q * Vector3::unit_x(), Vector3::unit_y()));
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let m = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let n = normal_matrix(&m);
        let normal = (n * Vector3::new(1.0, 1.0, 0.0)).normalize();
        let expected = Vector3::new(0.5, 1.0, 0.0).normalize();
        assert!(close_vec(normal, expected));
    }

    #[test]
    fn plane_equation_is_normalised() {
        let plane = Plane::new(Vector3::new(0.0, 2.0, 0.0), 4.0);
        assert!(close_vec(plane.normal, Vector3::unit_y()));
        assert!(close(plane.d, 2.0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "non-zero normal")]
    fn zero_normal_is_rejected() {
        Plane::new(Vector3::zero(), 1.0);
    }
}

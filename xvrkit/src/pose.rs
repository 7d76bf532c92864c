use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

use crate::error::{PoseError, Result};
use crate::record::{PoseSource, FINAL_POSE_KEY, ROTATIONS_KEY, TRANSLATIONS_KEY};
use crate::tensor::Tensor;

/// Tolerance used when checking that a rotation block is orthonormal.
pub const RIGIDITY_TOLERANCE: f64 = 1e-6;

/// Three angles applied about Z, then X, then Y (intrinsic axes).
///
/// The unit (radians or degrees) is a property of where the triplet comes from:
/// [`RigidPose::compose`] takes radians and [`RigidPose::decompose`] returns degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerTriplet {
    pub z: f64,
    pub x: f64,
    pub y: f64,
}

impl EulerTriplet {
    pub fn new(z: f64, x: f64, y: f64) -> Self {
        EulerTriplet { z, x, y }
    }

    pub fn to_degrees(self) -> Self {
        EulerTriplet::new(self.z.to_degrees(), self.x.to_degrees(), self.y.to_degrees())
    }

    pub fn to_radians(self) -> Self {
        EulerTriplet::new(self.z.to_radians(), self.x.to_radians(), self.y.to_radians())
    }

    /// The angles in application order `[z, x, y]`.
    pub fn as_array(&self) -> [f64; 3] {
        [self.z, self.x, self.y]
    }
}

/// Offsets along X, Y and Z in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TranslationTriplet {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TranslationTriplet {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        TranslationTriplet { x, y, z }
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for TranslationTriplet {
    fn from(v: Vector3<f64>) -> Self {
        TranslationTriplet::new(v.x, v.y, v.z)
    }
}

/// A 4×4 homogeneous rigid transform.
///
/// ```text
///   | R  t |
///   | 0  1 |
/// ```
///
/// `R` is expected to be a proper rotation. Nothing enforces that; see
/// [`RigidPose::is_rigid`] for the check the viewer runs before trusting the angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    pub matrix: Matrix4<f64>,
}

impl Default for RigidPose {
    fn default() -> Self {
        RigidPose::identity()
    }
}

impl RigidPose {
    pub fn identity() -> Self {
        RigidPose {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        RigidPose { matrix }
    }

    /// Builds a pose from Euler angles in radians (Z-X-Y) and a translation in mm.
    ///
    /// # Examples
    /// ```
    /// # use xvrkit::pose::{EulerTriplet, RigidPose, TranslationTriplet};
    /// let pose = RigidPose::compose(EulerTriplet::default(), TranslationTriplet::new(1.0, 2.0, 3.0));
    /// assert_eq!(pose.matrix[(0, 3)], 1.0);
    /// assert_eq!(pose.matrix[(0, 0)], 1.0);
    /// ```
    pub fn compose(angles: EulerTriplet, translation: TranslationTriplet) -> Self {
        let mut matrix = Matrix4::identity();
        matrix
            .fixed_slice_mut::<3, 3>(0, 0)
            .copy_from(&euler_zxy_to_matrix(angles));
        matrix
            .fixed_slice_mut::<3, 1>(0, 3)
            .copy_from(&translation.as_vector());
        RigidPose { matrix }
    }

    /// Builds the pose carried by a parameter record.
    ///
    /// A composed matrix must squeeze to exactly 4×4 and is used unchanged. Separate
    /// rotation and translation tensors must each squeeze to exactly length 3.
    /// Anything else is a [`PoseError::Shape`]; values are never truncated or padded.
    pub fn load(source: &PoseSource) -> Result<Self> {
        match source {
            PoseSource::Composed(tensor) => {
                let values = expect_shape(tensor.squeeze(), FINAL_POSE_KEY, &[4, 4])?;
                Ok(RigidPose::from_matrix(Matrix4::from_row_slice(&values)))
            }
            PoseSource::Separate {
                rotations,
                translations,
            } => {
                let r = expect_shape(rotations.squeeze().at_least_1d(), ROTATIONS_KEY, &[3])?;
                let t = expect_shape(
                    translations.squeeze().at_least_1d(),
                    TRANSLATIONS_KEY,
                    &[3],
                )?;
                Ok(RigidPose::compose(
                    EulerTriplet::new(r[0], r[1], r[2]),
                    TranslationTriplet::new(t[0], t[1], t[2]),
                ))
            }
        }
    }

    pub fn rotation_block(&self) -> Matrix3<f64> {
        self.matrix.fixed_slice::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> TranslationTriplet {
        TranslationTriplet::from(self.matrix.fixed_slice::<3, 1>(0, 3).into_owned())
    }

    /// Splits the pose into Euler angles in degrees (Z-X-Y) and a translation in mm.
    pub fn decompose(&self) -> (EulerTriplet, TranslationTriplet) {
        let angles = matrix_to_euler_zxy(&self.rotation_block()).to_degrees();
        (angles, self.translation())
    }

    /// Whether the rotation block is orthonormal with determinant +1, within `tolerance`.
    pub fn is_rigid(&self, tolerance: f64) -> bool {
        let r = self.rotation_block();
        let gram_error = (r.transpose() * r - Matrix3::identity()).abs().max();
        gram_error <= tolerance && (r.determinant() - 1.0).abs() <= tolerance
    }
}

/// `R = Rz(z) · Rx(x) · Ry(y)` with angles in radians.
pub fn euler_zxy_to_matrix(angles: EulerTriplet) -> Matrix3<f64> {
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), angles.z);
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), angles.x);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), angles.y);
    (rz * rx * ry).into_inner()
}

/// Inverse of [`euler_zxy_to_matrix`], angles in radians.
///
/// Expanding the product gives
///
/// ```text
///   r21 =  sin(x)
///   r01 = -sin(z)cos(x)   r11 = cos(z)cos(x)
///   r20 = -cos(x)sin(y)   r22 = cos(x)cos(y)
/// ```
///
/// At gimbal lock (`cos(x) ≈ 0`) only `z ± y` is observable; `y` is then set to zero
/// and the whole in-plane rotation is attributed to `z`.
pub fn matrix_to_euler_zxy(r: &Matrix3<f64>) -> EulerTriplet {
    let sin_x = r[(2, 1)].clamp(-1.0, 1.0);
    let x = sin_x.asin();
    let cos_x = (r[(2, 0)].powi(2) + r[(2, 2)].powi(2)).sqrt();

    if cos_x > 1e-9 {
        let z = (-r[(0, 1)]).atan2(r[(1, 1)]);
        let y = (-r[(2, 0)]).atan2(r[(2, 2)]);
        EulerTriplet::new(z, x, y)
    } else {
        let z = r[(1, 0)].atan2(r[(0, 0)]);
        EulerTriplet::new(z, x, 0.0)
    }
}

fn expect_shape(tensor: Tensor, entry: &'static str, expected: &[usize]) -> Result<Vec<f64>> {
    if tensor.shape != expected {
        return Err(PoseError::Shape {
            entry,
            shape: tensor.shape,
            expected: expected.to_vec(),
        });
    }
    Ok(tensor.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn separate(rotations: Vec<f64>, translations: Vec<f64>) -> PoseSource {
        PoseSource::Separate {
            rotations: Tensor::from_vec(vec![rotations.len()], rotations),
            translations: Tensor::from_vec(vec![translations.len()], translations),
        }
    }

    #[test]
    fn zero_angles_and_offsets_give_identity() {
        let pose = RigidPose::load(&separate(vec![0.0; 3], vec![0.0; 3])).unwrap();
        assert_eq!(pose.matrix, Matrix4::identity());
    }

    #[test]
    fn composed_matrix_is_used_unchanged_after_squeeze() {
        let mut values = vec![0.0; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as f64 * 0.5;
        }
        let source = PoseSource::Composed(Tensor::from_vec(vec![1, 4, 4], values.clone()));
        let pose = RigidPose::load(&source).unwrap();
        assert_eq!(pose.matrix, Matrix4::from_row_slice(&values));
        assert_eq!(pose.matrix[(0, 3)], 1.5);
    }

    #[test]
    fn composed_matrix_of_wrong_shape_is_a_shape_error() {
        let source = PoseSource::Composed(Tensor::from_vec(vec![3, 4], vec![0.0; 12]));
        match RigidPose::load(&source) {
            Err(PoseError::Shape { entry, shape, .. }) => {
                assert_eq!(entry, "final_pose");
                assert_eq!(shape, vec![3, 4]);
            }
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn rotation_vector_of_length_four_is_not_truncated() {
        let err = RigidPose::load(&separate(vec![0.1, 0.2, 0.3, 0.4], vec![0.0; 3])).unwrap_err();
        match err {
            PoseError::Shape { entry, shape, .. } => {
                assert_eq!(entry, "rotations");
                assert_eq!(shape, vec![4]);
            }
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn scalar_translation_is_a_shape_error() {
        let source = PoseSource::Separate {
            rotations: Tensor::from_vec(vec![1, 3], vec![0.0; 3]),
            translations: Tensor::from_vec(vec![], vec![5.0]),
        };
        match RigidPose::load(&source) {
            Err(PoseError::Shape { entry, shape, .. }) => {
                assert_eq!(entry, "translations");
                assert_eq!(shape, vec![1]);
            }
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn quarter_turn_about_y_decomposes_to_ninety_degrees() {
        let pose = RigidPose::load(&separate(vec![0.0, 0.0, FRAC_PI_2], vec![10.0, 0.0, 0.0]))
            .unwrap();
        let (angles, translation) = pose.decompose();
        assert!(angles.z.abs() < EPS);
        assert!(angles.x.abs() < EPS);
        assert!((angles.y - 90.0).abs() < EPS);
        assert_eq!(translation, TranslationTriplet::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn identity_decomposes_to_zero() {
        let (angles, translation) = RigidPose::identity().decompose();
        assert_eq!(angles.as_array().map(f64::abs), [0.0; 3]);
        assert_eq!(translation, TranslationTriplet::default());
    }

    #[test]
    fn axis_order_is_z_then_x_then_y() {
        let angles = EulerTriplet::new(0.3, -0.2, 0.7);
        let expected = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), -0.2)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), 0.7);
        let r = euler_zxy_to_matrix(angles);
        assert!((r - expected.into_inner()).abs().max() < EPS);

        let back = matrix_to_euler_zxy(&r);
        assert!((back.z - 0.3).abs() < EPS);
        assert!((back.x + 0.2).abs() < EPS);
        assert!((back.y - 0.7).abs() < EPS);
    }

    #[test]
    fn gimbal_lock_attributes_in_plane_rotation_to_z() {
        let r = euler_zxy_to_matrix(EulerTriplet::new(0.4, FRAC_PI_2, 0.0));
        let back = matrix_to_euler_zxy(&r);
        assert!((back.x - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(back.y, 0.0);
        let rebuilt = euler_zxy_to_matrix(back);
        assert!((rebuilt - r).abs().max() < 1e-6);
    }

    #[test]
    fn rigidity_check_flags_scaled_rotation() {
        let pose = RigidPose::compose(EulerTriplet::new(0.1, 0.2, 0.3), TranslationTriplet::default());
        assert!(pose.is_rigid(RIGIDITY_TOLERANCE));

        let mut scaled = pose;
        scaled.matrix.fixed_slice_mut::<3, 3>(0, 0).scale_mut(2.0);
        assert!(!scaled.is_rigid(RIGIDITY_TOLERANCE));

        let mut reflected = RigidPose::identity();
        reflected.matrix[(0, 0)] = -1.0;
        assert!(!reflected.is_rigid(RIGIDITY_TOLERANCE));
    }
}

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::notify::Notifier;
use crate::pose::{EulerTriplet, RigidPose, TranslationTriplet, RIGIDITY_TOLERANCE};
use crate::record::ParameterRecord;

/// Lower/upper bounds of the rotation fields, in degrees.
pub const ROTATION_RANGE: (f64, f64) = (-360.0, 360.0);
/// Lower/upper bounds of the translation fields, in millimeters.
pub const TRANSLATION_RANGE: (f64, f64) = (-5000.0, 5000.0);

/// The six read-only fields of the pose viewer.
///
/// Constructed once and reused for every load. Each load starts by zeroing the
/// fields, so a failed load always leaves the display at its default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseDisplay {
    /// Rotation about Z, X and Y in degrees.
    pub rotation: EulerTriplet,
    /// Translation along X, Y and Z in millimeters.
    pub translation: TranslationTriplet,
    /// Set when the last loaded rotation block was not a proper rotation.
    pub unreliable: bool,
}

impl PoseDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = PoseDisplay::default();
    }

    /// Fills the fields from the parameter record at `path`.
    ///
    /// Errors are reported through `notifier` and returned, with the fields left at zero.
    pub fn load(&mut self, path: &Path, notifier: &dyn Notifier) -> Result<()> {
        notifier.show_info(&format!(
            "Attempting to load parameters from: {}",
            path.display()
        ));
        self.reset();

        let outcome = load_pose(path).map(|pose| self.show(&pose));
        match &outcome {
            Ok(()) => {
                if self.unreliable {
                    notifier.show_info(
                        "Warning: rotation block is not a proper rotation; angles are unreliable.",
                    );
                }
                notifier.show_info("6 DoF loaded and displayed.");
                info!("\n{}", self);
            }
            Err(e) => {
                warn!("Error processing parameters file {}: {}", path.display(), e);
                notifier.show_info(&format!("Error: {}", e));
            }
        }
        outcome
    }

    /// Shows `pose` in the fields, clamping to the field ranges.
    pub fn show(&mut self, pose: &RigidPose) {
        let (angles, translation) = pose.decompose();
        let (rmin, rmax) = ROTATION_RANGE;
        let (tmin, tmax) = TRANSLATION_RANGE;
        self.rotation = EulerTriplet::new(
            field(angles.z, rmin, rmax),
            field(angles.x, rmin, rmax),
            field(angles.y, rmin, rmax),
        );
        self.translation = TranslationTriplet::new(
            field(translation.x, tmin, tmax),
            field(translation.y, tmin, tmax),
            field(translation.z, tmin, tmax),
        );
        self.unreliable = !pose.is_rigid(RIGIDITY_TOLERANCE);
        if self.unreliable {
            warn!("Rotation block is not orthonormal with determinant +1: {}", pose.matrix);
        }
    }
}

// Adding 0.0 turns -0.0 into 0.0 so zero fields never print as "-0.000".
fn field(value: f64, min: f64, max: f64) -> f64 {
    value.clamp(min, max) + 0.0
}

fn load_pose(path: &Path) -> Result<RigidPose> {
    let record = ParameterRecord::read(path)?;
    let source = record.pose_source()?;
    RigidPose::load(&source)
}

impl fmt::Display for PoseDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "6 DoF (from parameters file):")?;
        writeln!(
            f,
            "  Rotations (ZXY deg): Z={:.3}, X={:.3}, Y={:.3}",
            self.rotation.z, self.rotation.x, self.rotation.y
        )?;
        write!(
            f,
            "  Translations (XYZ mm): X={:.3}, Y={:.3}, Z={:.3}",
            self.translation.x, self.translation.y, self.translation.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoseError;
    use crate::notify::MemoryNotifier;
    use std::io::Write;

    fn record_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn failed_load_leaves_fields_zeroed() {
        let notifier = MemoryNotifier::new();
        let mut display = PoseDisplay::new();
        let good = record_file(r#"{"rotations": [0.1, 0.2, 0.3], "translations": [4, 5, 6]}"#);
        display.load(good.path(), &notifier).unwrap();
        assert_eq!(display.translation, TranslationTriplet::new(4.0, 5.0, 6.0));

        let empty = record_file(r#"{"loss": 1.0}"#);
        let err = display.load(empty.path(), &notifier).unwrap_err();
        assert!(matches!(err, PoseError::NotFound));
        assert_eq!(display, PoseDisplay::default());
        assert!(notifier.last().unwrap().starts_with("Error: no pose data found"));
    }

    #[test]
    fn shape_error_message_names_the_shape() {
        let notifier = MemoryNotifier::new();
        let mut display = PoseDisplay::new();
        let file = record_file(r#"{"final_pose": [[1, 0, 0], [0, 1, 0], [0, 0, 1]]}"#);
        display.load(file.path(), &notifier).unwrap_err();
        assert!(notifier.last().unwrap().contains("[3, 3]"));
    }

    #[test]
    fn non_rigid_pose_is_flagged() {
        let notifier = MemoryNotifier::new();
        let mut display = PoseDisplay::new();
        let file = record_file(
            r#"{"final_pose": [[2, 0, 0, 0], [0, 2, 0, 0], [0, 0, 2, 0], [0, 0, 0, 1]]}"#,
        );
        display.load(file.path(), &notifier).unwrap();
        assert!(display.unreliable);
        assert!(notifier
            .messages()
            .iter()
            .any(|m| m.contains("angles are unreliable")));
    }

    #[test]
    fn rendering_uses_three_decimals() {
        let mut display = PoseDisplay::new();
        display.show(&RigidPose::compose(
            EulerTriplet::new(0.0, 0.0, 0.0),
            TranslationTriplet::new(1.23456, -2.0, 0.5),
        ));
        let text = display.to_string();
        assert!(text.contains("Rotations (ZXY deg): Z=0.000, X=0.000, Y=0.000"));
        assert!(text.contains("Translations (XYZ mm): X=1.235, Y=-2.000, Z=0.500"));
    }
}

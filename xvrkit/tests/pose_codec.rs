use std::f64::consts::{FRAC_PI_2, PI};
use std::io::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use xvrkit::error::PoseError;
use xvrkit::notify::MemoryNotifier;
use xvrkit::{EulerTriplet, ParameterRecord, PoseDisplay, RigidPose, TranslationTriplet};

const EPS: f64 = 1e-9;

fn load(value: serde_json::Value) -> Result<RigidPose, PoseError> {
    let record = ParameterRecord::from_value(value).unwrap();
    RigidPose::load(&record.pose_source()?)
}

#[test]
fn decompose_inverts_compose_for_random_poses() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for _ in 0..500 {
        let angles = EulerTriplet::new(
            rng.random_range(-PI..PI),
            rng.random_range(-1.5..1.5),
            rng.random_range(-PI..PI),
        );
        let translation = TranslationTriplet::new(
            rng.random_range(-2000.0..2000.0),
            rng.random_range(-2000.0..2000.0),
            rng.random_range(-2000.0..2000.0),
        );

        let (degrees, t) = RigidPose::compose(angles, translation).decompose();
        let expected = angles.to_degrees();
        assert!((degrees.z - expected.z).abs() < 1e-7, "{:?} vs {:?}", degrees, expected);
        assert!((degrees.x - expected.x).abs() < 1e-7, "{:?} vs {:?}", degrees, expected);
        assert!((degrees.y - expected.y).abs() < 1e-7, "{:?} vs {:?}", degrees, expected);
        assert_eq!(t, translation);
    }
}

#[test]
fn separate_tensors_decompose_to_their_inputs() {
    let pose = load(json!({
        "rotations": [[0.0, 0.0, FRAC_PI_2]],
        "translations": [[10.0, 0.0, 0.0]],
    }))
    .unwrap();
    let (angles, t) = pose.decompose();
    assert!(angles.z.abs() < EPS);
    assert!(angles.x.abs() < EPS);
    assert!((angles.y - 90.0).abs() < EPS);
    assert_eq!(t, TranslationTriplet::new(10.0, 0.0, 0.0));
}

#[test]
fn identity_final_pose_decomposes_to_zero() {
    let pose = load(json!({
        "final_pose": [[[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]]],
    }))
    .unwrap();
    assert_eq!(pose, RigidPose::identity());
    let (angles, t) = pose.decompose();
    assert!(angles.as_array().iter().all(|a| a.abs() < EPS));
    assert_eq!(t, TranslationTriplet::default());
}

#[test]
fn zero_rotations_and_translations_give_identity() {
    let pose = load(json!({"rotations": [0, 0, 0], "translations": [0, 0, 0]})).unwrap();
    assert_eq!(pose, RigidPose::identity());
}

#[test]
fn record_without_pose_is_not_found() {
    let err = load(json!({"loss": [0.5, 0.25], "iterations": 120})).unwrap_err();
    assert!(matches!(err, PoseError::NotFound));
}

#[test]
fn four_rotation_values_are_a_shape_error() {
    let err = load(json!({"rotations": [0.1, 0.2, 0.3, 0.4], "translations": [0, 0, 0]}))
        .unwrap_err();
    assert!(matches!(err, PoseError::Shape { ref shape, .. } if shape == &vec![4]));
    assert!(err.to_string().contains("[4]"));
}

#[test]
fn viewer_shows_saved_registration_result() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .unwrap();
    let pose = RigidPose::compose(
        EulerTriplet::new(30.0, -15.0, 45.0).to_radians(),
        TranslationTriplet::new(12.5, -40.0, 980.0),
    );
    let rows: Vec<Vec<f64>> = (0..4)
        .map(|r| (0..4).map(|c| pose.matrix[(r, c)]).collect())
        .collect();
    write!(file, "{}", json!({ "final_pose": rows, "loss": 0.031 })).unwrap();

    let notifier = MemoryNotifier::new();
    let mut display = PoseDisplay::new();
    display.load(file.path(), &notifier).unwrap();

    assert!((display.rotation.z - 30.0).abs() < 1e-9);
    assert!((display.rotation.x + 15.0).abs() < 1e-9);
    assert!((display.rotation.y - 45.0).abs() < 1e-9);
    assert_eq!(display.translation, TranslationTriplet::new(12.5, -40.0, 980.0));
    assert!(!display.unreliable);
    assert_eq!(notifier.last().unwrap(), "6 DoF loaded and displayed.");
}

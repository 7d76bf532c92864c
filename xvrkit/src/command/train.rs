use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{
    check_range, ArgList, Convention, Input, InputKind, ModelName, NormLayer, Orientation,
    Parameterization, Renderer, XvrCommand,
};
use crate::error::{RunError, RunResult};

pub const TRAIN_PROJECT: &str = "xvr-napari-gui-train";

/// Sampling ranges for the synthetic poses used during training.
/// Rotations in degrees, translations in millimeters, each as `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRanges {
    pub r1: (f64, f64),
    pub r2: (f64, f64),
    pub r3: (f64, f64),
    pub tx: (f64, f64),
    pub ty: (f64, f64),
    pub tz: (f64, f64),
}

impl Default for PoseRanges {
    fn default() -> Self {
        PoseRanges {
            r1: (-10.0, 10.0),
            r2: (-5.0, 5.0),
            r3: (-10.0, 10.0),
            tx: (-50.0, 50.0),
            ty: (-50.0, 50.0),
            tz: (-50.0, 50.0),
        }
    }
}

impl PoseRanges {
    fn named(&self) -> [(&'static str, (f64, f64), f64); 6] {
        [
            ("r1", self.r1, 180.0),
            ("r2", self.r2, 180.0),
            ("r3", self.r3, 180.0),
            ("tx", self.tx, 200.0),
            ("ty", self.ty, 200.0),
            ("tz", self.tz, 200.0),
        ]
    }

    pub fn validate(&self) -> RunResult<()> {
        for (field, (min, max), bound) in self.named() {
            check_range(field, min, -bound, bound)?;
            check_range(field, max, -bound, bound)?;
            if min > max {
                return Err(RunError::InvalidOption {
                    field,
                    reason: format!("range minimum {} exceeds maximum {}", min, max),
                });
            }
        }
        Ok(())
    }
}

/// `xvr train`: train a pose regression network from a directory of CTs.
///
/// Every value is passed explicitly, so the run does not depend on the tool's
/// defaults changing underneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct Train {
    pub inpath: PathBuf,
    pub outpath: PathBuf,
    pub ranges: PoseRanges,
    /// Source-to-detector distance (mm).
    pub sdd: f64,
    /// DRR height (px).
    pub height: u32,
    /// DRR pixel size (mm/px).
    pub delx: f64,
    pub renderer: Renderer,
    pub orientation: Orientation,
    pub reverse_x_axis: bool,
    pub parameterization: Parameterization,
    pub convention: Convention,
    pub model_name: ModelName,
    pub pretrained: bool,
    pub norm_layer: NormLayer,
    pub lr: f64,
    pub weight_geo: f64,
    pub batch_size: u32,
    pub n_epochs: u32,
    pub n_batches_per_epoch: u32,
}

impl Train {
    pub fn new(inpath: PathBuf, outpath: PathBuf) -> Self {
        Train {
            inpath,
            outpath,
            ranges: PoseRanges::default(),
            sdd: 1000.0,
            height: 128,
            delx: 0.2,
            renderer: Renderer::Trilinear,
            orientation: Orientation::Pa,
            reverse_x_axis: false,
            parameterization: Parameterization::EulerAngles,
            convention: Convention::Zxy,
            model_name: ModelName::Resnet18,
            pretrained: false,
            norm_layer: NormLayer::Groupnorm,
            lr: 5e-3,
            weight_geo: 1e-2,
            batch_size: 116,
            n_epochs: 1000,
            n_batches_per_epoch: 100,
        }
    }
}

impl XvrCommand for Train {
    fn label(&self) -> &'static str {
        "XVR Training"
    }

    fn args(&self) -> Vec<OsString> {
        let mut args = ArgList::new(&["train"]);
        args.path("-i", &self.inpath).path("-o", &self.outpath);
        for (field, (min, max), _) in self.ranges.named() {
            args.value(&format!("--{}", field), min).positional(max.to_string());
        }
        args.value("--sdd", self.sdd)
            .value("--height", self.height)
            .value("--delx", self.delx)
            .value("--renderer", self.renderer)
            .value("--orientation", self.orientation)
            .switch("--reverse_x_axis", self.reverse_x_axis)
            .value("--parameterization", self.parameterization)
            .value("--convention", self.convention)
            .value("--model_name", self.model_name)
            .switch("--pretrained", self.pretrained)
            .value("--norm_layer", self.norm_layer)
            .value("--lr", self.lr)
            .value("--weight-geo", self.weight_geo)
            .value("--batch_size", self.batch_size)
            .value("--n_epochs", self.n_epochs)
            .value("--n_batches_per_epoch", self.n_batches_per_epoch)
            .value("--project", TRAIN_PROJECT);
        args.finish()
    }

    fn validate(&self) -> RunResult<()> {
        self.ranges.validate()?;
        if !matches!(
            self.parameterization,
            Parameterization::EulerAngles | Parameterization::Quaternions
        ) {
            return Err(RunError::InvalidOption {
                field: "parameterization",
                reason: format!(
                    "{} is not supported for training (use euler_angles or quaternions)",
                    self.parameterization
                ),
            });
        }
        check_range("sdd", self.sdd, 500.0, 2000.0)?;
        check_range("height", self.height, 64, 512)?;
        check_range("delx", self.delx, 0.05, 1.0)?;
        check_range("lr", self.lr, 1e-5, 1e-2)?;
        check_range("weight_geo", self.weight_geo, 0.0, 1.0)?;
        check_range("batch_size", self.batch_size, 1, 256)?;
        check_range("n_epochs", self.n_epochs, 1, 2000)?;
        check_range("n_batches_per_epoch", self.n_batches_per_epoch, 1, 200)
    }

    fn inputs(&self) -> Vec<Input<'_>> {
        vec![Input::new("Input directory", &self.inpath, InputKind::Directory)]
    }

    fn output_dir(&self) -> &Path {
        &self.outpath
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::lossy;

    #[test]
    fn ranges_are_passed_as_pairs() {
        let cmd = Train::new(PathBuf::from("cts"), PathBuf::from("models"));
        let args = lossy(&cmd.args());
        assert_eq!(&args[..5], ["train", "-i", "cts", "-o", "models"]);
        assert_eq!(&args[5..8], ["--r1", "-10", "10"]);
        assert_eq!(&args[8..11], ["--r2", "-5", "5"]);
        let tz = args.iter().position(|a| a == "--tz").unwrap();
        assert_eq!(&args[tz..tz + 3], ["--tz", "-50", "50"]);
        assert_eq!(&args[args.len() - 2..], ["--project", TRAIN_PROJECT]);
        assert!(!args.contains(&"--pretrained".to_string()));
    }

    #[test]
    fn anatomical_conventions_are_allowed_for_training() {
        let mut cmd = Train::new(PathBuf::from("cts"), PathBuf::from("models"));
        cmd.convention = Convention::Ras;
        assert!(cmd.validate().is_ok());
        assert!(lossy(&cmd.args()).contains(&"RAS".to_string()));
    }

    #[test]
    fn training_parameterization_is_euler_or_quaternion() {
        let mut cmd = Train::new(PathBuf::from("cts"), PathBuf::from("models"));
        cmd.parameterization = Parameterization::Quaternions;
        assert!(cmd.validate().is_ok());
        cmd.parameterization = Parameterization::Rotation6d;
        assert!(matches!(
            cmd.validate(),
            Err(RunError::InvalidOption { field: "parameterization", .. })
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut cmd = Train::new(PathBuf::from("cts"), PathBuf::from("models"));
        cmd.ranges.tx = (20.0, -20.0);
        assert!(matches!(
            cmd.validate(),
            Err(RunError::InvalidOption { field: "tx", .. })
        ));
    }

    #[test]
    fn batch_size_is_bounded() {
        let mut cmd = Train::new(PathBuf::from("cts"), PathBuf::from("models"));
        cmd.batch_size = 0;
        assert!(cmd.validate().is_err());
    }
}

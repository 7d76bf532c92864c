//! Option groups shared by the `xvr register` subcommands.

use super::{check_list, check_range, ArgList, Convention, Parameterization, ReduceFn, Renderer};
use crate::error::{RunError, RunResult};

/// X-ray preprocessing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Preprocessing {
    /// Pixels cropped from each edge of the X-ray.
    pub crop: u32,
    pub subtract_background: bool,
    /// Convert the X-ray from exponential to linear attenuation.
    pub linearize: bool,
    pub reducefn: ReduceFn,
}

impl Preprocessing {
    pub fn validate(&self) -> RunResult<()> {
        check_range("crop", self.crop, 0, 1000)
    }

    pub(crate) fn push_args(&self, args: &mut ArgList) {
        args.changed("--crop", self.crop, 0)
            .switch("--subtract_background", self.subtract_background)
            .switch("--linearize", self.linearize);
    }

    pub(crate) fn push_reducefn(&self, args: &mut ArgList) {
        args.changed("--reducefn", self.reducefn, ReduceFn::default());
    }
}

/// DRR rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendering {
    /// Comma separated mask labels to render; empty renders the whole volume.
    pub labels: String,
    /// Radiologic convention.
    pub reverse_x_axis: bool,
    pub renderer: Renderer,
}

impl Rendering {
    pub fn validate(&self) -> RunResult<()> {
        check_list::<u32>("labels", &self.labels, true)
    }

    pub(crate) fn push_args(&self, args: &mut ArgList) {
        args.non_empty("--labels", &self.labels)
            .switch("--reverse_x_axis", self.reverse_x_axis);
    }

    pub(crate) fn push_renderer(&self, args: &mut ArgList) {
        args.changed("--renderer", self.renderer, Renderer::default());
    }
}

/// Pose optimizer schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
    /// Comma separated downsampling factors, coarse to fine.
    pub scales: String,
    pub parameterization: Parameterization,
    pub convention: Convention,
    pub lr_rot: f64,
    pub lr_xyz: f64,
    pub patience: u32,
    pub threshold: f64,
    pub max_n_itrs: u32,
    pub max_n_plateaus: u32,
}

impl Default for Optimization {
    fn default() -> Self {
        Optimization {
            scales: "8".to_string(),
            parameterization: Parameterization::EulerAngles,
            convention: Convention::Zxy,
            lr_rot: 0.01,
            lr_xyz: 1.0,
            patience: 10,
            threshold: 1e-4,
            max_n_itrs: 500,
            max_n_plateaus: 3,
        }
    }
}

impl Optimization {
    pub fn validate(&self) -> RunResult<()> {
        check_list::<f64>("scales", &self.scales, false)?;
        check_range("lr_rot", self.lr_rot, 1e-6, 1.0)?;
        check_range("lr_xyz", self.lr_xyz, 1e-3, 100.0)?;
        check_range("patience", self.patience, 1, 100)?;
        check_range("threshold", self.threshold, 1e-6, 1.0)?;
        check_range("max_n_itrs", self.max_n_itrs, 1, 2000)?;
        check_range("max_n_plateaus", self.max_n_plateaus, 1, 10)
    }

    /// Rejects the anatomical frame names. The DICOM and fixed modes build their
    /// initial pose from an Euler axis sequence.
    pub fn require_axis_sequence(&self) -> RunResult<()> {
        if self.convention.is_axis_sequence() {
            Ok(())
        } else {
            Err(RunError::InvalidOption {
                field: "convention",
                reason: format!("{} is not an Euler axis sequence", self.convention),
            })
        }
    }

    pub(crate) fn push_args(&self, args: &mut ArgList) {
        let default = Optimization::default();
        args.changed("--scales", self.scales.as_str(), default.scales.as_str())
            .changed("--parameterization", self.parameterization, default.parameterization)
            .changed("--convention", self.convention, default.convention)
            .changed("--lr_rot", self.lr_rot, default.lr_rot)
            .changed("--lr_xyz", self.lr_xyz, default.lr_xyz)
            .changed("--patience", self.patience, default.patience)
            .changed("--threshold", self.threshold, default.threshold)
            .changed("--max_n_itrs", self.max_n_itrs, default.max_n_itrs)
            .changed("--max_n_plateaus", self.max_n_plateaus, default.max_n_plateaus);
    }
}

/// What the registration run writes and how much it prints.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Only predict the initial pose, skip iterative refinement.
    pub init_only: bool,
    pub save_images: bool,
    pub verbose: u8,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            init_only: false,
            save_images: true,
            verbose: 1,
        }
    }
}

impl Output {
    pub fn validate(&self) -> RunResult<()> {
        check_range("verbose", self.verbose, 0, 3)
    }

    pub(crate) fn push_args(&self, args: &mut ArgList) {
        args.switch("--init_only", self.init_only)
            .switch("--saveimg", self.save_images)
            .changed("--verbose", self.verbose, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::lossy;

    #[test]
    fn default_groups_emit_only_saveimg() {
        let mut args = ArgList::new(&[]);
        Preprocessing::default().push_args(&mut args);
        Preprocessing::default().push_reducefn(&mut args);
        Rendering::default().push_args(&mut args);
        Rendering::default().push_renderer(&mut args);
        Optimization::default().push_args(&mut args);
        Output::default().push_args(&mut args);
        assert_eq!(lossy(&args.finish()), ["--saveimg"]);
    }

    #[test]
    fn changed_optimizer_values_are_emitted() {
        let opt = Optimization {
            scales: "8,4,2".to_string(),
            lr_rot: 0.005,
            max_n_plateaus: 5,
            ..Optimization::default()
        };
        let mut args = ArgList::new(&[]);
        opt.push_args(&mut args);
        assert_eq!(
            lossy(&args.finish()),
            ["--scales", "8,4,2", "--lr_rot", "0.005", "--max_n_plateaus", "5"]
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let pre = Preprocessing {
            crop: 1001,
            ..Preprocessing::default()
        };
        assert!(matches!(
            pre.validate(),
            Err(RunError::InvalidOption { field: "crop", .. })
        ));

        let opt = Optimization {
            convention: Convention::Ras,
            ..Optimization::default()
        };
        assert!(opt.validate().is_ok());
        assert!(opt.require_axis_sequence().is_err());

        let opt = Optimization {
            lr_rot: f64::NAN,
            ..Optimization::default()
        };
        assert!(matches!(
            opt.validate(),
            Err(RunError::InvalidOption { field: "lr_rot", .. })
        ));

        let out = Output {
            verbose: 4,
            ..Output::default()
        };
        assert!(out.validate().is_err());
    }
}

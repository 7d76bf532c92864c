use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{
    check_range, ArgList, Input, InputKind, Optimization, Orientation, Output, Preprocessing,
    Rendering, XvrCommand,
};
use crate::error::RunResult;
use crate::pose::{EulerTriplet, TranslationTriplet};

/// Paths every registration reads or writes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistrationPaths {
    /// CT volume (NIfTI).
    pub volume: PathBuf,
    pub output: PathBuf,
    /// X-ray to register: a DICOM file or a directory of them.
    pub xray: PathBuf,
    /// Optional labelmap used for `labels` and masked rendering.
    pub mask: Option<PathBuf>,
}

impl RegistrationPaths {
    fn inputs(&self) -> Vec<Input<'_>> {
        let mut inputs = vec![
            Input::new("NIfTI Volume", &self.volume, InputKind::File),
            Input::new("DICOM X-ray input", &self.xray, InputKind::Any),
        ];
        if let Some(mask) = &self.mask {
            inputs.push(Input::new("Mask Labelmap", mask, InputKind::File));
        }
        inputs
    }
}

/// `xvr register model`: initial pose predicted by a trained network, then refined.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterModel {
    pub paths: RegistrationPaths,
    pub checkpoint: PathBuf,
    /// Optional transform that warps the volume before registration.
    pub warp: Option<PathBuf>,
    pub invert_warp: bool,
    /// Glob selecting X-ray files when `xray` is a directory.
    pub pattern: String,
    pub preprocessing: Preprocessing,
    pub rendering: Rendering,
    pub optimization: Optimization,
    pub output: Output,
}

pub const DEFAULT_PATTERN: &str = "*.dcm";

impl RegisterModel {
    pub fn new(paths: RegistrationPaths, checkpoint: PathBuf) -> Self {
        RegisterModel {
            paths,
            checkpoint,
            warp: None,
            invert_warp: false,
            pattern: DEFAULT_PATTERN.to_string(),
            preprocessing: Preprocessing::default(),
            rendering: Rendering::default(),
            optimization: Optimization::default(),
            output: Output::default(),
        }
    }
}

impl XvrCommand for RegisterModel {
    fn label(&self) -> &'static str {
        "XVR Registration"
    }

    fn args(&self) -> Vec<OsString> {
        let mut args = ArgList::new(&["register", "model"]);
        args.path("-v", &self.paths.volume)
            .path("-c", &self.checkpoint)
            .path("-o", &self.paths.output)
            .optional_path("-m", self.paths.mask.as_ref());
        self.preprocessing.push_args(&mut args);
        self.preprocessing.push_reducefn(&mut args);
        args.optional_path("--warp", self.warp.as_ref())
            .switch("--invert", self.invert_warp);
        self.rendering.push_args(&mut args);
        self.rendering.push_renderer(&mut args);
        self.optimization.push_args(&mut args);
        self.output.push_args(&mut args);
        args.changed("--pattern", self.pattern.as_str(), DEFAULT_PATTERN)
            .positional(self.paths.xray.as_os_str());
        args.finish()
    }

    fn validate(&self) -> RunResult<()> {
        self.preprocessing.validate()?;
        self.rendering.validate()?;
        self.optimization.validate()?;
        self.output.validate()
    }

    fn inputs(&self) -> Vec<Input<'_>> {
        let mut inputs = self.paths.inputs();
        inputs.push(Input::new("Model Checkpoint", &self.checkpoint, InputKind::File));
        if let Some(warp) = &self.warp {
            inputs.push(Input::new("Warp Transform", warp, InputKind::File));
        }
        inputs
    }

    fn output_dir(&self) -> &Path {
        &self.paths.output
    }
}

/// `xvr register dicom`: initial pose read from the X-ray's DICOM header.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDicom {
    pub paths: RegistrationPaths,
    pub orientation: Orientation,
    pub preprocessing: Preprocessing,
    pub rendering: Rendering,
    pub optimization: Optimization,
    pub output: Output,
}

impl RegisterDicom {
    pub fn new(paths: RegistrationPaths) -> Self {
        RegisterDicom {
            paths,
            orientation: Orientation::Ap,
            preprocessing: Preprocessing::default(),
            rendering: Rendering::default(),
            optimization: Optimization::default(),
            output: Output::default(),
        }
    }
}

impl XvrCommand for RegisterDicom {
    fn label(&self) -> &'static str {
        "XVR DICOM-Initialized Registration"
    }

    // The dicom subcommand gets renderer and reducefn unconditionally.
    fn args(&self) -> Vec<OsString> {
        let mut args = ArgList::new(&["register", "dicom"]);
        args.path("-v", &self.paths.volume)
            .path("-o", &self.paths.output)
            .value("--orientation", self.orientation)
            .value("--renderer", self.rendering.renderer)
            .value("--reducefn", self.preprocessing.reducefn)
            .optional_path("-m", self.paths.mask.as_ref());
        self.preprocessing.push_args(&mut args);
        self.rendering.push_args(&mut args);
        self.optimization.push_args(&mut args);
        self.output.push_args(&mut args);
        args.positional(self.paths.xray.as_os_str());
        args.finish()
    }

    fn validate(&self) -> RunResult<()> {
        self.preprocessing.validate()?;
        self.rendering.validate()?;
        self.optimization.validate()?;
        self.optimization.require_axis_sequence()?;
        self.output.validate()
    }

    fn inputs(&self) -> Vec<Input<'_>> {
        self.paths.inputs()
    }

    fn output_dir(&self) -> &Path {
        &self.paths.output
    }
}

/// `xvr register fixed`: initial pose given explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterFixed {
    pub paths: RegistrationPaths,
    pub orientation: Orientation,
    /// Initial rotation in degrees, in the order of `optimization.convention`.
    pub rotation: EulerTriplet,
    /// Initial translation in millimeters.
    pub translation: TranslationTriplet,
    pub preprocessing: Preprocessing,
    pub rendering: Rendering,
    pub optimization: Optimization,
    pub output: Output,
}

impl RegisterFixed {
    pub fn new(paths: RegistrationPaths) -> Self {
        RegisterFixed {
            paths,
            orientation: Orientation::Ap,
            rotation: EulerTriplet::default(),
            translation: TranslationTriplet::new(0.0, 0.0, 1500.0),
            preprocessing: Preprocessing::default(),
            rendering: Rendering::default(),
            optimization: Optimization::default(),
            output: Output::default(),
        }
    }
}

impl XvrCommand for RegisterFixed {
    fn label(&self) -> &'static str {
        "XVR Fixed-Pose Registration"
    }

    fn args(&self) -> Vec<OsString> {
        let [r1, r2, r3] = self.rotation.as_array();
        let t = &self.translation;
        let mut args = ArgList::new(&["register", "fixed"]);
        args.path("-v", &self.paths.volume)
            .path("-o", &self.paths.output)
            .value("--orientation", self.orientation)
            .value("--rot", format!("{},{},{}", r1, r2, r3))
            .value("--xyz", format!("{},{},{}", t.x, t.y, t.z))
            .optional_path("-m", self.paths.mask.as_ref());
        self.preprocessing.push_args(&mut args);
        self.preprocessing.push_reducefn(&mut args);
        self.rendering.push_args(&mut args);
        self.rendering.push_renderer(&mut args);
        self.optimization.push_args(&mut args);
        self.output.push_args(&mut args);
        args.positional(self.paths.xray.as_os_str());
        args.finish()
    }

    fn validate(&self) -> RunResult<()> {
        for (field, angle) in [
            ("rotation 1", self.rotation.z),
            ("rotation 2", self.rotation.x),
            ("rotation 3", self.rotation.y),
        ] {
            check_range(field, angle, -360.0, 360.0)?;
        }
        for (field, offset) in [
            ("tx", self.translation.x),
            ("ty", self.translation.y),
            ("tz", self.translation.z),
        ] {
            check_range(field, offset, -5000.0, 5000.0)?;
        }
        self.preprocessing.validate()?;
        self.rendering.validate()?;
        self.optimization.validate()?;
        self.optimization.require_axis_sequence()?;
        self.output.validate()
    }

    fn inputs(&self) -> Vec<Input<'_>> {
        self.paths.inputs()
    }

    fn output_dir(&self) -> &Path {
        &self.paths.output
    }
}

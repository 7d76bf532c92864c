//! Argument vectors for the external `xvr` tool.
//!
//! Each front-end form is a plain options struct whose defaults match the tool's
//! own defaults. [`XvrCommand::args`] turns it into the arguments that follow the
//! program name; optional flags are only emitted when they differ from the default
//! so the resulting command line stays short.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RunError, RunResult};

pub mod finetune;
pub mod options;
pub mod register;
pub mod train;

pub use finetune::Finetune;
pub use options::{Optimization, Output, Preprocessing, Rendering};
pub use register::{RegisterDicom, RegisterFixed, RegisterModel};
pub use train::{PoseRanges, Train};

/// What a required input path must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    File,
    Directory,
    /// A file or a directory (e.g. a folder of DICOM frames).
    Any,
}

/// A named input path a command reads from.
#[derive(Debug, Clone)]
pub struct Input<'a> {
    pub what: &'static str,
    pub path: &'a Path,
    pub kind: InputKind,
}

impl<'a> Input<'a> {
    pub fn new(what: &'static str, path: &'a Path, kind: InputKind) -> Self {
        Input { what, path, kind }
    }

    fn exists(&self) -> bool {
        match self.kind {
            InputKind::File => self.path.is_file(),
            InputKind::Directory => self.path.is_dir(),
            InputKind::Any => self.path.exists(),
        }
    }
}

/// One invocation of the external tool.
pub trait XvrCommand {
    /// Human readable name used in notifications, e.g. "XVR Registration".
    fn label(&self) -> &'static str;

    /// Arguments following the program name, subcommand first.
    fn args(&self) -> Vec<OsString>;

    /// Checks every value against the range the form allows.
    fn validate(&self) -> RunResult<()>;

    /// Paths that must exist before the tool is started.
    fn inputs(&self) -> Vec<Input<'_>>;

    /// Directory the tool writes into; created before the run.
    fn output_dir(&self) -> &Path;
}

/// Validates `command`, checks its inputs and creates its output directory.
pub fn prepare(command: &dyn XvrCommand) -> RunResult<()> {
    command.validate()?;
    for input in command.inputs() {
        if !input.exists() {
            return Err(RunError::MissingInput {
                what: input.what,
                path: input.path.to_path_buf(),
            });
        }
    }
    let out = command.output_dir();
    debug!("Creating output directory {}", out.display());
    fs::create_dir_all(out)?;
    Ok(())
}

/// Renders an argument vector the way a shell user would type it.
pub fn display_command(program: &OsStr, args: &[OsString]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(OsString::as_os_str))
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builder for an `xvr` argument vector.
#[derive(Debug, Default, Clone)]
pub struct ArgList {
    args: Vec<OsString>,
}

impl ArgList {
    pub fn new(subcommand: &[&str]) -> Self {
        ArgList {
            args: subcommand.iter().map(OsString::from).collect(),
        }
    }

    pub fn value(&mut self, flag: &str, value: impl fmt::Display) -> &mut Self {
        self.args.push(flag.into());
        self.args.push(value.to_string().into());
        self
    }

    pub fn path(&mut self, flag: &str, path: &Path) -> &mut Self {
        self.args.push(flag.into());
        self.args.push(path.as_os_str().to_owned());
        self
    }

    pub fn optional_path(&mut self, flag: &str, path: Option<&PathBuf>) -> &mut Self {
        if let Some(path) = path {
            self.path(flag, path);
        }
        self
    }

    /// Emits `flag value` only when `value` differs from the tool's default.
    pub fn changed<T: PartialEq + fmt::Display>(
        &mut self,
        flag: &str,
        value: T,
        default: T,
    ) -> &mut Self {
        if value != default {
            self.value(flag, value);
        }
        self
    }

    /// Emits `flag value` unless `value` is empty.
    pub fn non_empty(&mut self, flag: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.value(flag, value);
        }
        self
    }

    pub fn switch(&mut self, flag: &str, on: bool) -> &mut Self {
        if on {
            self.args.push(flag.into());
        }
        self
    }

    pub fn positional(&mut self, value: impl Into<OsString>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    pub fn finish(&mut self) -> Vec<OsString> {
        std::mem::take(&mut self.args)
    }
}

pub(crate) fn check_range<T: PartialOrd + fmt::Display>(
    field: &'static str,
    value: T,
    min: T,
    max: T,
) -> RunResult<()> {
    // Written so that NaN fails the check.
    if !(value >= min && value <= max) {
        return Err(RunError::InvalidOption {
            field,
            reason: format!("{} is outside [{}, {}]", value, min, max),
        });
    }
    Ok(())
}

/// Checks a comma separated list such as `8,4,2` or `1,2,3`.
pub(crate) fn check_list<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
    allow_empty: bool,
) -> RunResult<()> {
    if value.trim().is_empty() {
        return if allow_empty {
            Ok(())
        } else {
            Err(RunError::InvalidOption {
                field,
                reason: "must not be empty".to_string(),
            })
        };
    }
    for item in value.split(',') {
        if item.trim().parse::<T>().is_err() {
            return Err(RunError::InvalidOption {
                field,
                reason: format!("'{}' is not a valid entry of '{}'", item.trim(), value),
            });
        }
    }
    Ok(())
}

/// Declares a closed set of command-line choices with their `xvr` spelling.
macro_rules! choice {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        let names: Vec<_> = $name::ALL.iter().map(|c| c.as_str()).collect();
                        format!("'{}' is not one of: {}", s, names.join(", "))
                    })
            }
        }
    };
}

choice!(
    /// Multiframe reduction applied to the X-ray.
    ReduceFn { Max => "max", Mean => "mean", Sum => "sum" } default Max
);

choice!(
    /// DRR renderer.
    Renderer { Siddon => "siddon", Trilinear => "trilinear" } default Trilinear
);

choice!(
    /// Parameterization of SO(3) used by the optimizer.
    Parameterization {
        EulerAngles => "euler_angles",
        Quaternions => "quaternions",
        AxisAngle => "axis_angle",
        Rotation6d => "rotation_6d",
    } default EulerAngles
);

choice!(
    /// Euler convention, or an anatomical frame name for training.
    Convention {
        Zxy => "ZXY",
        Xyz => "XYZ",
        Zyx => "ZYX",
        Yxz => "YXZ",
        Yzx => "YZX",
        Xzy => "XZY",
        Ras => "RAS",
        Lps => "LPS",
    } default Zxy
);

choice!(
    /// Patient orientation of the X-ray or CT.
    Orientation { Ap => "AP", Pa => "PA" } default Ap
);

choice!(
    /// Backbone of the pose regression network.
    ModelName { Resnet18 => "resnet18", Resnet34 => "resnet34", Resnet50 => "resnet50" } default Resnet18
);

choice!(
    /// Normalization layer of the pose regression network.
    NormLayer {
        Batchnorm => "batchnorm",
        Groupnorm => "groupnorm",
        Instancenorm => "instancenorm",
    } default Groupnorm
);

impl Convention {
    /// Whether this is an axis sequence, as opposed to an anatomical frame name.
    pub fn is_axis_sequence(&self) -> bool {
        !matches!(self, Convention::Ras | Convention::Lps)
    }
}

#[cfg(test)]
pub(crate) fn lossy(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_case_insensitively() {
        assert_eq!("Siddon".parse::<Renderer>().unwrap(), Renderer::Siddon);
        assert_eq!("zxy".parse::<Convention>().unwrap(), Convention::Zxy);
        let err = "bogus".parse::<ReduceFn>().unwrap_err();
        assert!(err.contains("max, mean, sum"));
    }

    #[test]
    fn arg_list_skips_defaults() {
        let args = ArgList::new(&["register", "model"])
            .changed("--crop", 0, 0)
            .changed("--patience", 12, 10)
            .switch("--invert", false)
            .switch("--saveimg", true)
            .non_empty("--labels", "")
            .positional("xray.dcm")
            .finish();
        assert_eq!(
            lossy(&args),
            ["register", "model", "--patience", "12", "--saveimg", "xray.dcm"]
        );
    }

    #[test]
    fn list_checks() {
        assert!(check_list::<f64>("scales", "8,4,2", false).is_ok());
        assert!(check_list::<f64>("scales", "", false).is_err());
        assert!(check_list::<u32>("labels", "", true).is_ok());
        assert!(check_list::<u32>("labels", "1,x", true).is_err());
    }

    #[test]
    fn display_command_joins_with_spaces() {
        let args = vec![OsString::from("train"), OsString::from("-i")];
        assert_eq!(display_command(OsStr::new("xvr"), &args), "xvr train -i");
    }
}

//! # xvrkit Library
//!
//! The `xvrkit` library backs a set of front-ends for the `xvr` 2D/3D X-ray to CT
//! registration tool. It does no registration itself: it collects parameters,
//! turns them into `xvr` command lines, runs the tool while relaying its output,
//! and displays the pose a registration run saved.
//!
//! ## Overview of Modules
//!
//! - **`pose`**: The pose codec. Converts between a 4×4 homogeneous rigid transform
//!   and a 6 DoF view (Euler angles in the Z-X-Y convention plus a translation).
//!
//! - **`record`**: Reads the parameter record an `xvr` run saves and works out which
//!   pose variant it carries (a composed matrix, or separate rotations/translations).
//!
//! - **`tensor`**: A minimal shaped array with the `squeeze` semantics the record
//!   entries need.
//!
//! - **`display`**: The six read-only fields of the pose viewer, owned by the caller
//!   and zeroed on every load.
//!
//! - **`command`**: Typed options for `xvr train`, `xvr finetune` and the three
//!   `xvr register` modes, with validation and argument vector generation.
//!
//! - **`runner`**: Runs a command to completion, streaming stdout and collecting
//!   stderr, and reports the result through a [`notify::Notifier`].
//!
//! - **`launcher`**: Opens one front-end from another in a separate process.
//!
//! - **`settings`**: Program name, environment and default directories.

pub mod command;
pub mod display;
pub mod error;
pub mod launcher;
pub mod notify;
pub mod pose;
pub mod record;
pub mod runner;
pub mod settings;
pub mod tensor;

pub use display::PoseDisplay;
pub use error::{PoseError, RunError};
pub use pose::{EulerTriplet, RigidPose, TranslationTriplet};
pub use record::{ParameterRecord, PoseSource};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use xvrkit::command::{
    Convention, ModelName, NormLayer, Optimization, Orientation, Output, Parameterization,
    Preprocessing, ReduceFn, Rendering, Renderer,
};
use xvrkit::launcher::Tool;

/// Command line arguments structure.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Front-ends for the xvr X-ray to CT registration tool.",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// Settings file (JSON). Defaults are used when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the xvr command line instead of running it.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display the 6 DoF pose saved in a parameters file.
    View {
        /// Parameters file written by a registration run.
        parameters_file: PathBuf,
    },

    /// Train a pose regression model from a directory of CTs.
    Train(TrainArgs),

    /// Fine-tune a pretrained model on a single CT.
    Finetune(FinetuneArgs),

    /// Register a CT volume to an X-ray.
    #[command(subcommand)]
    Register(RegisterCommands),

    /// Open another front-end in a separate process.
    ///
    /// `--help` here is forwarded to the launched front-end; use
    /// `xvrkit help launch` for this command's own help.
    #[command(disable_help_flag = true)]
    Launch {
        /// One of: train, finetune, register-model, register-dicom, register-fixed, view.
        tool: Tool,

        /// Arguments passed on to the launched front-end.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        extra: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RegisterCommands {
    /// Initial pose from a trained model, then iterative refinement.
    Model(RegisterModelArgs),
    /// Initial pose from the X-ray's DICOM header.
    Dicom(RegisterDicomArgs),
    /// Initial pose given on the command line.
    Fixed(RegisterFixedArgs),
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// NIfTI volume [default: <data_dir>/volume.nii.gz]
    #[arg(long)]
    pub volume: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "registration_results")]
    pub output: PathBuf,

    /// Mask labelmap (optional)
    #[arg(short, long)]
    pub mask: Option<PathBuf>,

    /// DICOM X-ray file or directory [default: <data_dir>/xray.dcm]
    pub xray: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PreprocessingArgs {
    /// Pixels cropped from each X-ray edge (0-1000)
    #[arg(long, default_value_t = 0)]
    pub crop: u32,

    #[arg(long)]
    pub subtract_background: bool,

    /// Convert the X-ray from exponential to linear attenuation
    #[arg(long)]
    pub linearize: bool,

    /// Multiframe reduce function: max, mean, sum
    #[arg(long, default_value_t = ReduceFn::Max)]
    pub reducefn: ReduceFn,
}

impl From<PreprocessingArgs> for Preprocessing {
    fn from(a: PreprocessingArgs) -> Self {
        Preprocessing {
            crop: a.crop,
            subtract_background: a.subtract_background,
            linearize: a.linearize,
            reducefn: a.reducefn,
        }
    }
}

#[derive(Args, Debug)]
pub struct RenderingArgs {
    /// Labels to render, comma separated (uses the mask)
    #[arg(long, default_value = "")]
    pub labels: String,

    /// Radiologic convention
    #[arg(long)]
    pub reverse_x_axis: bool,

    /// Renderer: siddon, trilinear
    #[arg(long, default_value_t = Renderer::Trilinear)]
    pub renderer: Renderer,
}

impl From<RenderingArgs> for Rendering {
    fn from(a: RenderingArgs) -> Self {
        Rendering {
            labels: a.labels,
            reverse_x_axis: a.reverse_x_axis,
            renderer: a.renderer,
        }
    }
}

#[derive(Args, Debug)]
pub struct OptimizationArgs {
    /// Downsampling scales, comma separated (e.g. 8,4,2)
    #[arg(long, default_value = "8")]
    pub scales: String,

    /// SO(3) parameterization: euler_angles, quaternions, axis_angle, rotation_6d
    #[arg(long, default_value_t = Parameterization::EulerAngles)]
    pub parameterization: Parameterization,

    /// Euler convention: ZXY, XYZ, ZYX, YXZ, YZX, XZY
    #[arg(long, default_value_t = Convention::Zxy)]
    pub convention: Convention,

    #[arg(long, default_value_t = 0.01)]
    pub lr_rot: f64,

    #[arg(long, default_value_t = 1.0)]
    pub lr_xyz: f64,

    /// Epochs without improvement before the learning rate drops
    #[arg(long, default_value_t = 10)]
    pub patience: u32,

    #[arg(long, default_value_t = 1e-4)]
    pub threshold: f64,

    /// Maximum iterations per scale
    #[arg(long, default_value_t = 500)]
    pub max_n_itrs: u32,

    /// Maximum plateaus per scale
    #[arg(long, default_value_t = 3)]
    pub max_n_plateaus: u32,
}

impl From<OptimizationArgs> for Optimization {
    fn from(a: OptimizationArgs) -> Self {
        Optimization {
            scales: a.scales,
            parameterization: a.parameterization,
            convention: a.convention,
            lr_rot: a.lr_rot,
            lr_xyz: a.lr_xyz,
            patience: a.patience,
            threshold: a.threshold,
            max_n_itrs: a.max_n_itrs,
            max_n_plateaus: a.max_n_plateaus,
        }
    }
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Initial pose only, no refinement
    #[arg(long)]
    pub init_only: bool,

    /// Do not save output images
    #[arg(long)]
    pub no_saveimg: bool,

    /// xvr verbosity (0-3)
    #[arg(long = "xvr-verbose", default_value_t = 1)]
    pub xvr_verbose: u8,
}

impl From<OutputArgs> for Output {
    fn from(a: OutputArgs) -> Self {
        Output {
            init_only: a.init_only,
            save_images: !a.no_saveimg,
            verbose: a.xvr_verbose,
        }
    }
}

#[derive(Args, Debug)]
pub struct RegisterModelArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Model checkpoint [default: <model_dir>/model.pth]
    #[arg(short, long)]
    pub checkpoint: Option<PathBuf>,

    /// Warp transform applied to the volume (optional)
    #[arg(long)]
    pub warp: Option<PathBuf>,

    /// Invert the warp
    #[arg(long)]
    pub invert: bool,

    /// Glob for X-ray files when the X-ray is a directory
    #[arg(long, default_value = "*.dcm")]
    pub pattern: String,

    #[command(flatten)]
    pub preprocessing: PreprocessingArgs,

    #[command(flatten)]
    pub rendering: RenderingArgs,

    #[command(flatten)]
    pub optimization: OptimizationArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct RegisterDicomArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// X-ray orientation: AP, PA
    #[arg(long, default_value_t = Orientation::Ap)]
    pub orientation: Orientation,

    #[command(flatten)]
    pub preprocessing: PreprocessingArgs,

    #[command(flatten)]
    pub rendering: RenderingArgs,

    #[command(flatten)]
    pub optimization: OptimizationArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct RegisterFixedArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// X-ray orientation: AP, PA
    #[arg(long, default_value_t = Orientation::Ap)]
    pub orientation: Orientation,

    /// Initial rotations (deg), in the order of --convention
    #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["R1", "R2", "R3"], default_values_t = [0.0, 0.0, 0.0])]
    pub rot: Vec<f64>,

    /// Initial translation (mm)
    #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["TX", "TY", "TZ"], default_values_t = [0.0, 0.0, 1500.0])]
    pub xyz: Vec<f64>,

    #[command(flatten)]
    pub preprocessing: PreprocessingArgs,

    #[command(flatten)]
    pub rendering: RenderingArgs,

    #[command(flatten)]
    pub optimization: OptimizationArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory of training CTs [default: <data_dir>/ct_scans_for_training]
    #[arg(short, long)]
    pub inpath: Option<PathBuf>,

    /// Output model directory [default: <model_dir>/trained_model_output]
    #[arg(short, long)]
    pub outpath: Option<PathBuf>,

    /// Range of the first rotation (deg)
    #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"], default_values_t = [-10.0, 10.0])]
    pub r1: Vec<f64>,

    /// Range of the second rotation (deg)
    #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"], default_values_t = [-5.0, 5.0])]
    pub r2: Vec<f64>,

    /// Range of the third rotation (deg)
    #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"], default_values_t = [-10.0, 10.0])]
    pub r3: Vec<f64>,

    /// Range of the X translation (mm)
    #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"], default_values_t = [-50.0, 50.0])]
    pub tx: Vec<f64>,

    /// Range of the Y translation (mm)
    #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"], default_values_t = [-50.0, 50.0])]
    pub ty: Vec<f64>,

    /// Range of the Z translation (mm)
    #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"], default_values_t = [-50.0, 50.0])]
    pub tz: Vec<f64>,

    /// Source-to-detector distance (mm)
    #[arg(long, default_value_t = 1000.0)]
    pub sdd: f64,

    /// DRR height (px)
    #[arg(long, default_value_t = 128)]
    pub height: u32,

    /// DRR pixel size (mm/px)
    #[arg(long, default_value_t = 0.2)]
    pub delx: f64,

    /// Renderer: siddon, trilinear
    #[arg(long, default_value_t = Renderer::Trilinear)]
    pub renderer: Renderer,

    /// CT orientation: AP, PA
    #[arg(long, default_value_t = Orientation::Pa)]
    pub orientation: Orientation,

    #[arg(long)]
    pub reverse_x_axis: bool,

    /// SO(3) parameterization
    #[arg(long, default_value_t = Parameterization::EulerAngles)]
    pub parameterization: Parameterization,

    /// Euler convention: ZXY, XYZ, ZYX, YXZ, YZX, XZY, RAS, LPS
    #[arg(long, default_value_t = Convention::Zxy)]
    pub convention: Convention,

    /// Architecture: resnet18, resnet34, resnet50
    #[arg(long, default_value_t = ModelName::Resnet18)]
    pub model_name: ModelName,

    /// Start from ImageNet weights
    #[arg(long)]
    pub pretrained: bool,

    /// Normalization layer: batchnorm, groupnorm, instancenorm
    #[arg(long, default_value_t = NormLayer::Groupnorm)]
    pub norm_layer: NormLayer,

    /// Maximum learning rate
    #[arg(long, default_value_t = 5e-3)]
    pub lr: f64,

    /// Geodesic loss weight
    #[arg(long, default_value_t = 1e-2)]
    pub weight_geo: f64,

    #[arg(long, default_value_t = 116)]
    pub batch_size: u32,

    #[arg(long, default_value_t = 1000)]
    pub n_epochs: u32,

    #[arg(long, default_value_t = 100)]
    pub n_batches_per_epoch: u32,
}

#[derive(Args, Debug)]
pub struct FinetuneArgs {
    /// Patient CT volume [default: <data_dir>/patient_ct.nii.gz]
    #[arg(short, long)]
    pub inpath: Option<PathBuf>,

    /// Output model directory [default: <model_dir>/finetuned_model_output]
    #[arg(short, long)]
    pub outpath: Option<PathBuf>,

    /// Pretrained checkpoint [default: <model_dir>/pretrained_model.pth]
    #[arg(short, long)]
    pub ckptpath: Option<PathBuf>,

    #[arg(long, default_value_t = 0.005)]
    pub lr: f64,

    #[arg(long, default_value_t = 116)]
    pub batch_size: u32,

    #[arg(long, default_value_t = 10)]
    pub n_epochs: u32,

    #[arg(long, default_value_t = 25)]
    pub n_batches_per_epoch: u32,

    /// Rescale the virtual detector
    #[arg(long, default_value_t = 1.0)]
    pub rescale: f64,
}

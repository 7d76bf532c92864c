mod args;

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands, FinetuneArgs, PathArgs, RegisterCommands, TrainArgs};
use xvrkit::command::register::RegistrationPaths;
use xvrkit::command::{
    Finetune, PoseRanges, RegisterDicom, RegisterFixed, RegisterModel, Train, XvrCommand,
};
use xvrkit::launcher;
use xvrkit::notify::ConsoleNotifier;
use xvrkit::runner::XvrRunner;
use xvrkit::settings::Settings;
use xvrkit::{EulerTriplet, PoseDisplay, TranslationTriplet};

fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Err: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Runs the selected front-end. `Ok(false)` means it ran but did not succeed.
fn run(args: Cli) -> anyhow::Result<bool> {
    let settings = Settings::load(args.config.as_deref()).context("Could not load settings")?;
    debug!("Settings: {:?}", settings);
    let notifier = ConsoleNotifier;

    let command: Box<dyn XvrCommand> = match args.command {
        Commands::View { parameters_file } => {
            let mut display = PoseDisplay::new();
            let loaded = display.load(&parameters_file, &notifier).is_ok();
            println!("{}", display);
            return Ok(loaded);
        }
        Commands::Launch { tool, extra } => {
            launcher::launch(tool, &extra, &notifier)
                .with_context(|| format!("Failed to launch {}", tool.title()))?;
            return Ok(true);
        }
        Commands::Train(train) => Box::new(build_train(train, &settings)),
        Commands::Finetune(finetune) => Box::new(build_finetune(finetune, &settings)),
        Commands::Register(register) => build_register(register, &settings),
    };

    let runner = XvrRunner::new(&settings, &notifier);
    if args.dry_run {
        command.validate()?;
        println!("{}", runner.describe(command.as_ref()));
        return Ok(true);
    }

    let mut stdout = io::stdout();
    let outcome = runner
        .run(command.as_ref(), &mut stdout)
        .with_context(|| format!("{} did not run", command.label()))?;
    if !outcome.success {
        warn!("{} exited with {:?}", command.label(), outcome.code);
    }
    Ok(outcome.success)
}

fn registration_paths(paths: PathArgs, settings: &Settings) -> RegistrationPaths {
    RegistrationPaths {
        volume: paths
            .volume
            .unwrap_or_else(|| settings.data_dir.join("volume.nii.gz")),
        output: paths.output,
        xray: paths
            .xray
            .unwrap_or_else(|| settings.data_dir.join("xray.dcm")),
        mask: paths.mask,
    }
}

fn build_register(register: RegisterCommands, settings: &Settings) -> Box<dyn XvrCommand> {
    match register {
        RegisterCommands::Model(a) => {
            let checkpoint = a
                .checkpoint
                .unwrap_or_else(|| settings.model_dir.join("model.pth"));
            let mut cmd = RegisterModel::new(registration_paths(a.paths, settings), checkpoint);
            cmd.warp = a.warp;
            cmd.invert_warp = a.invert;
            cmd.pattern = a.pattern;
            cmd.preprocessing = a.preprocessing.into();
            cmd.rendering = a.rendering.into();
            cmd.optimization = a.optimization.into();
            cmd.output = a.output.into();
            Box::new(cmd)
        }
        RegisterCommands::Dicom(a) => {
            let mut cmd = RegisterDicom::new(registration_paths(a.paths, settings));
            cmd.orientation = a.orientation;
            cmd.preprocessing = a.preprocessing.into();
            cmd.rendering = a.rendering.into();
            cmd.optimization = a.optimization.into();
            cmd.output = a.output.into();
            Box::new(cmd)
        }
        RegisterCommands::Fixed(a) => {
            let mut cmd = RegisterFixed::new(registration_paths(a.paths, settings));
            cmd.orientation = a.orientation;
            // clap guarantees exactly three values for --rot and --xyz.
            cmd.rotation = EulerTriplet::new(a.rot[0], a.rot[1], a.rot[2]);
            cmd.translation = TranslationTriplet::new(a.xyz[0], a.xyz[1], a.xyz[2]);
            cmd.preprocessing = a.preprocessing.into();
            cmd.rendering = a.rendering.into();
            cmd.optimization = a.optimization.into();
            cmd.output = a.output.into();
            Box::new(cmd)
        }
    }
}

fn pair(values: &[f64]) -> (f64, f64) {
    (values[0], values[1])
}

fn build_train(a: TrainArgs, settings: &Settings) -> Train {
    let inpath = a
        .inpath
        .unwrap_or_else(|| settings.data_dir.join("ct_scans_for_training"));
    let outpath = a
        .outpath
        .unwrap_or_else(|| settings.model_dir.join("trained_model_output"));
    let mut cmd = Train::new(inpath, outpath);
    cmd.ranges = PoseRanges {
        r1: pair(&a.r1),
        r2: pair(&a.r2),
        r3: pair(&a.r3),
        tx: pair(&a.tx),
        ty: pair(&a.ty),
        tz: pair(&a.tz),
    };
    cmd.sdd = a.sdd;
    cmd.height = a.height;
    cmd.delx = a.delx;
    cmd.renderer = a.renderer;
    cmd.orientation = a.orientation;
    cmd.reverse_x_axis = a.reverse_x_axis;
    cmd.parameterization = a.parameterization;
    cmd.convention = a.convention;
    cmd.model_name = a.model_name;
    cmd.pretrained = a.pretrained;
    cmd.norm_layer = a.norm_layer;
    cmd.lr = a.lr;
    cmd.weight_geo = a.weight_geo;
    cmd.batch_size = a.batch_size;
    cmd.n_epochs = a.n_epochs;
    cmd.n_batches_per_epoch = a.n_batches_per_epoch;
    cmd
}

fn build_finetune(a: FinetuneArgs, settings: &Settings) -> Finetune {
    let mut cmd = Finetune::new(
        a.inpath
            .unwrap_or_else(|| settings.data_dir.join("patient_ct.nii.gz")),
        a.outpath
            .unwrap_or_else(|| settings.model_dir.join("finetuned_model_output")),
        a.ckptpath
            .unwrap_or_else(|| settings.model_dir.join("pretrained_model.pth")),
    );
    cmd.lr = a.lr;
    cmd.batch_size = a.batch_size;
    cmd.n_epochs = a.n_epochs;
    cmd.n_batches_per_epoch = a.n_batches_per_epoch;
    cmd.rescale = a.rescale;
    cmd
}

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{check_range, ArgList, Input, InputKind, XvrCommand};
use crate::error::RunResult;

pub const FINETUNE_PROJECT: &str = "xvr-napari-gui-finetune";

/// `xvr finetune`: adapt a pretrained network to a single patient CT.
#[derive(Debug, Clone, PartialEq)]
pub struct Finetune {
    /// Patient CT volume.
    pub inpath: PathBuf,
    pub outpath: PathBuf,
    /// Pretrained checkpoint.
    pub ckptpath: PathBuf,
    pub lr: f64,
    pub batch_size: u32,
    pub n_epochs: u32,
    pub n_batches_per_epoch: u32,
    /// Rescaling of the virtual detector.
    pub rescale: f64,
}

impl Finetune {
    pub fn new(inpath: PathBuf, outpath: PathBuf, ckptpath: PathBuf) -> Self {
        Finetune {
            inpath,
            outpath,
            ckptpath,
            lr: 0.005,
            batch_size: 116,
            n_epochs: 10,
            n_batches_per_epoch: 25,
            rescale: 1.0,
        }
    }

    /// Run name derived from the volume, e.g. `finetune_patient01` for
    /// `patient01.nii.gz`.
    pub fn run_name(&self) -> String {
        let file = self
            .inpath
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = match file.find('.') {
            Some(0) | None => file.as_str(),
            Some(dot) => &file[..dot],
        };
        format!("finetune_{}", stem)
    }
}

impl XvrCommand for Finetune {
    fn label(&self) -> &'static str {
        "XVR Finetuning"
    }

    fn args(&self) -> Vec<OsString> {
        ArgList::new(&["finetune"])
            .path("-i", &self.inpath)
            .path("-o", &self.outpath)
            .path("-c", &self.ckptpath)
            .value("--lr", self.lr)
            .value("--batch_size", self.batch_size)
            .value("--n_epochs", self.n_epochs)
            .value("--n_batches_per_epoch", self.n_batches_per_epoch)
            .value("--rescale", self.rescale)
            .value("--project", FINETUNE_PROJECT)
            .value("--name", self.run_name())
            .finish()
    }

    fn validate(&self) -> RunResult<()> {
        check_range("lr", self.lr, 1e-6, 1e-1)?;
        check_range("batch_size", self.batch_size, 1, 512)?;
        check_range("n_epochs", self.n_epochs, 1, 500)?;
        check_range("n_batches_per_epoch", self.n_batches_per_epoch, 1, 100)?;
        check_range("rescale", self.rescale, 0.1, 5.0)
    }

    fn inputs(&self) -> Vec<Input<'_>> {
        vec![
            Input::new("Input CT volume", &self.inpath, InputKind::File),
            Input::new("Pretrained checkpoint", &self.ckptpath, InputKind::File),
        ]
    }

    fn output_dir(&self) -> &Path {
        &self.outpath
    }
}

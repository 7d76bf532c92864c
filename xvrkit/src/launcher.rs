use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;

use tracing::info;

use crate::error::{RunError, RunResult};
use crate::notify::Notifier;

/// The front-ends that can be opened from one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Train,
    Finetune,
    RegisterModel,
    RegisterDicom,
    RegisterFixed,
    ViewResults,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Train,
        Tool::Finetune,
        Tool::RegisterModel,
        Tool::RegisterDicom,
        Tool::RegisterFixed,
        Tool::ViewResults,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tool::Train => "Train Model",
            Tool::Finetune => "Fine-tune Model",
            Tool::RegisterModel => "Register Model",
            Tool::RegisterDicom => "Register Model : Dicom",
            Tool::RegisterFixed => "Register Model : Fixed",
            Tool::ViewResults => "View Results",
        }
    }

    /// Subcommand of this executable that opens the tool.
    pub fn subcommand(&self) -> &'static [&'static str] {
        match self {
            Tool::Train => &["train"],
            Tool::Finetune => &["finetune"],
            Tool::RegisterModel => &["register", "model"],
            Tool::RegisterDicom => &["register", "dicom"],
            Tool::RegisterFixed => &["register", "fixed"],
            Tool::ViewResults => &["view"],
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            Tool::Train => "train",
            Tool::Finetune => "finetune",
            Tool::RegisterModel => "register-model",
            Tool::RegisterDicom => "register-dicom",
            Tool::RegisterFixed => "register-fixed",
            Tool::ViewResults => "view",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .iter()
            .copied()
            .find(|tool| tool.slug() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Tool::ALL.iter().map(|t| t.slug()).collect();
                format!("unknown tool '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Opens another front-end in its own process without waiting for it.
///
/// `extra` is appended after the subcommand (e.g. `--help` or the tool's
/// required arguments).
pub fn launch(tool: Tool, extra: &[String], notifier: &dyn Notifier) -> RunResult<()> {
    let exe = current_exe()?;
    info!("Launching {} via {}", tool.title(), exe.display());
    let spawned = Command::new(&exe)
        .args(tool.subcommand())
        .args(extra)
        .stdin(Stdio::null())
        .spawn();
    match spawned {
        Ok(child) => {
            info!("{} started with pid {}", tool.title(), child.id());
            Ok(())
        }
        Err(e) => {
            notifier.show_info(&format!("Failed to launch {}: {}", tool.title(), e));
            Err(RunError::Io(e))
        }
    }
}

fn current_exe() -> RunResult<PathBuf> {
    env::current_exe().map_err(RunError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_round_trips_through_its_name() {
        for tool in Tool::ALL {
            assert_eq!(tool.to_string().parse::<Tool>().unwrap(), tool);
        }
        assert!("register".parse::<Tool>().is_err());
    }

    #[test]
    fn registration_tools_map_to_nested_subcommands() {
        assert_eq!(Tool::RegisterDicom.subcommand(), ["register", "dicom"]);
        assert_eq!(Tool::ViewResults.subcommand(), ["view"]);
    }
}

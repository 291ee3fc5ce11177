//! Configuration for spawning the coqtop process.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for spawning a coqtop process.
///
/// Host editors load this from their settings layer; defaults expect a
/// `coqtop` binary on PATH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoqtopConfig {
    /// The executable path or command name.
    pub command: PathBuf,
    /// Arguments to pass to coqtop.
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
}

impl Default for CoqtopConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("coqtop"),
            args: Vec::new(),
            working_dir: None,
        }
    }
}

impl CoqtopConfig {
    /// Configuration using the given executable path or command name.
    #[must_use]
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Sets the arguments passed to coqtop.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn default_expects_coqtop_on_path() {
        let config = CoqtopConfig::default();

        assert_eq!(config.command, PathBuf::from("coqtop"));
        assert!(config.args.is_empty());
        assert!(config.working_dir.is_none());
    }

    #[rstest]
    fn builder_methods_work() {
        let config = CoqtopConfig::with_command("/opt/coq/bin/coqtop")
            .with_args(vec!["-q".to_owned()])
            .with_working_dir("/workspace");

        assert_eq!(config.command, PathBuf::from("/opt/coq/bin/coqtop"));
        assert_eq!(config.args, vec!["-q"]);
        assert_eq!(config.working_dir, Some(PathBuf::from("/workspace")));
    }
}

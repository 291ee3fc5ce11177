//! Executable resolution for the configured coqtop command.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::SessionError;

/// Log target for resolution operations.
const RESOLVE_TARGET: &str = "coqstep_host::resolve";

/// Resolves the configured command to an executable path.
///
/// A command that names an existing file is used as-is. Anything else falls
/// back to searching every directory on `PATH` for the command's file name,
/// also trying the platform executable suffix (`.exe` on the Windows
/// family).
///
/// # Errors
///
/// Returns [`SessionError::ExecutableNotFound`] when no candidate exists;
/// fatal to session start, never retried.
pub fn resolve_executable(command: &Path) -> Result<PathBuf, SessionError> {
    if command.is_file() {
        return Ok(command.to_path_buf());
    }

    let dirs = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    search_dirs(&dirs, command).ok_or_else(|| SessionError::ExecutableNotFound {
        command: command.display().to_string(),
    })
}

/// Walks `dirs` for the command's candidate file names; first match wins.
fn search_dirs(dirs: &[PathBuf], command: &Path) -> Option<PathBuf> {
    let names = candidate_names(command)?;
    for dir in dirs {
        for name in &names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                debug!(
                    target: RESOLVE_TARGET,
                    candidate = %candidate.display(),
                    "resolved coqtop on PATH"
                );
                return Some(candidate);
            }
        }
    }
    None
}

/// File names to probe for: the bare name, plus the suffixed form on
/// platforms with a non-empty executable suffix.
fn candidate_names(command: &Path) -> Option<Vec<OsString>> {
    let base = command.file_name()?.to_os_string();
    let mut names = vec![base.clone()];
    if !env::consts::EXE_SUFFIX.is_empty() {
        let mut suffixed = base;
        suffixed.push(env::consts::EXE_SUFFIX);
        names.push(suffixed);
    }
    Some(names)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"").expect("failed to create fixture binary");
        path
    }

    #[rstest]
    fn existing_file_is_used_as_is() {
        let dir = TempDir::new().expect("tempdir");
        let binary = touch(&dir, "coqtop");

        let resolved = resolve_executable(&binary).expect("resolution failed");

        assert_eq!(resolved, binary);
    }

    #[rstest]
    fn search_finds_binary_in_later_directory() {
        let empty = TempDir::new().expect("tempdir");
        let with_binary = TempDir::new().expect("tempdir");
        let binary = touch(&with_binary, "coqtop");
        let dirs = vec![
            empty.path().to_path_buf(),
            with_binary.path().to_path_buf(),
        ];

        let resolved = search_dirs(&dirs, Path::new("coqtop"));

        assert_eq!(resolved, Some(binary));
    }

    #[rstest]
    fn first_match_wins() {
        let first = TempDir::new().expect("tempdir");
        let second = TempDir::new().expect("tempdir");
        let expected = touch(&first, "coqtop");
        touch(&second, "coqtop");
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];

        let resolved = search_dirs(&dirs, Path::new("coqtop"));

        assert_eq!(resolved, Some(expected));
    }

    #[rstest]
    fn missing_binary_reports_not_found() {
        let empty = TempDir::new().expect("tempdir");
        let dirs = vec![empty.path().to_path_buf()];

        assert_eq!(search_dirs(&dirs, Path::new("coqtop")), None);
    }

    #[rstest]
    fn bare_name_without_dirs_is_not_found() {
        let error = resolve_executable(Path::new("definitely-not-a-real-coqtop-binary"));

        assert!(matches!(
            error,
            Err(SessionError::ExecutableNotFound { .. })
        ));
    }
}

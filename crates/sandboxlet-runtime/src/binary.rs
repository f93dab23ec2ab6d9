//! Runtime binary resolution

use sandboxlet_core::{RuntimeError, RuntimeResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Pick the first candidate that is an executable file
pub fn resolve_binary(candidates: &[PathBuf]) -> RuntimeResult<PathBuf> {
    for candidate in candidates {
        if is_executable(candidate) {
            info!(path = %candidate.display(), "Resolved runtime binary");
            return Ok(candidate.clone());
        }
        debug!(path = %candidate.display(), "Runtime binary candidate not executable");
    }

    Err(RuntimeError::BinaryNotFound {
        candidates: candidates.to_vec(),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_first_executable_wins() {
        let dir = tempfile::tempdir().unwrap();
        let plain = write_file(dir.path(), "plain", 0o644);
        let first = write_file(dir.path(), "first", 0o755);
        let second = write_file(dir.path(), "second", 0o755);

        let resolved = resolve_binary(&[
            dir.path().join("missing"),
            plain,
            first.clone(),
            second,
        ])
        .unwrap();
        assert_eq!(resolved, first);
    }

    #[test]
    fn test_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_binary(&[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(RuntimeError::BinaryNotFound { .. })));
    }

    #[test]
    fn test_not_found_reports_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let plain = write_file(dir.path(), "plain", 0o600);
        let candidates = vec![dir.path().join("missing"), plain];

        match resolve_binary(&candidates) {
            Err(RuntimeError::BinaryNotFound { candidates: tried }) => {
                assert_eq!(tried, candidates)
            }
            other => panic!("expected BinaryNotFound, got {:?}", other),
        }
    }
}

//! Memory id minting and path-safety validation.

use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{Error, Result};

const ID_SUFFIX_LEN: usize = 8;
const ID_SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Mints a new id of the form `<unix_millis>-<random suffix>`.
///
/// The timestamp component keeps ids roughly sortable by creation order;
/// the random suffix makes same-millisecond collisions implausible while
/// the filesystem rename still rejects any that occur.
pub fn mint(now: chrono::DateTime<chrono::Utc>) -> String {
    let millis = now.timestamp_millis();
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ID_SUFFIX_ALPHABET.len());
            ID_SUFFIX_ALPHABET[idx] as char
        })
        .collect();
    format!("{millis}-{suffix}")
}

/// Sanitizes a caller-provided id: rejects path separators and parent
/// references, and rejects empty results.
///
/// # Errors
///
/// Returns [`Error::InvalidId`] if the id contains a path separator, a
/// parent-directory reference, or is empty.
pub fn sanitize(id: &str) -> Result<&str> {
    if id.is_empty() {
        return Err(Error::InvalidId("id is empty".into()));
    }
    if id.contains('/') || id.contains('\\') {
        return Err(Error::InvalidId(format!(
            "id {id:?} contains a path separator"
        )));
    }
    if id == "." || id == ".." || id.contains("..") {
        return Err(Error::InvalidId(format!(
            "id {id:?} contains a parent-directory reference"
        )));
    }
    Ok(id)
}

/// Resolves `root.join(format!("{id}{suffix}"))` and verifies the result
/// lies under `root` after resolving symlinks.
///
/// The candidate file need not exist yet (resolution walks up to the
/// nearest existing ancestor), but any existing component that escapes
/// `root` via a symlink is rejected.
///
/// # Errors
///
/// Returns [`Error::InvalidId`] if the id fails [`sanitize`] or if the
/// resolved path does not lie under `root`.
pub fn resolve_under(root: &Path, id: &str, suffix: &str) -> Result<PathBuf> {
    let sanitized = sanitize(id)?;
    let file_name = format!("{sanitized}{suffix}");

    let canonical_root = canonicalize_best_effort(root)?;
    let canonical_parent = canonicalize_best_effort(&canonical_root.join(&file_name))?
        .parent()
        .map_or_else(|| canonical_root.clone(), Path::to_path_buf);

    if !canonical_parent.starts_with(&canonical_root) {
        return Err(Error::InvalidId(format!(
            "id {id:?} resolves outside the store root"
        )));
    }

    Ok(canonical_parent.join(&file_name))
}

/// Canonicalizes `path`, walking up to the nearest existing ancestor when
/// the path (or a suffix of it) does not exist yet.
fn canonicalize_best_effort(path: &Path) -> Result<PathBuf> {
    let mut trailing = Vec::new();
    let mut current = path.to_path_buf();
    loop {
        match current.canonicalize() {
            Ok(resolved) => {
                let mut result = resolved;
                for component in trailing.into_iter().rev() {
                    result.push(component);
                }
                return Ok(result);
            }
            Err(_) => {
                let Some(name) = current.file_name().map(std::ffi::OsStr::to_os_string) else {
                    return Err(Error::InvalidId("path has no existing ancestor".into()));
                };
                trailing.push(name);
                if !current.pop() {
                    return Err(Error::InvalidId("path has no existing ancestor".into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_ids_are_distinct() {
        let now = chrono::Utc::now();
        let a = mint(now);
        let b = mint(now);
        assert_ne!(a, b);
        assert!(a.contains('-'));
    }

    #[test]
    fn sanitize_rejects_separators_and_parents() {
        assert!(sanitize("../etc/passwd").is_err());
        assert!(sanitize("a/b").is_err());
        assert!(sanitize("a\\b").is_err());
        assert!(sanitize("..").is_err());
        assert!(sanitize("").is_err());
        assert!(sanitize("plain-id-123").is_ok());
    }

    #[test]
    fn resolve_under_accepts_plain_id() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_under(dir.path(), "abc-123", ".md").unwrap();
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
        assert_eq!(resolved.file_name().unwrap(), "abc-123.md");
    }

    #[test]
    #[cfg(unix)]
    fn resolve_under_rejects_symlink_escape() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let link = dir.path().join("escape.md");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let result = resolve_under(dir.path(), "escape", ".md");
        assert!(matches!(result, Err(Error::InvalidId(_))));
    }
}

//! Path confinement. Every filesystem-touching request resolves its path
//! here before the disk is touched.

use crate::errors::AppError;
use std::path::{Component, Path, PathBuf};

/// The single directory outside of which no file operation may reach.
/// Canonicalized once at startup, immutable afterwards.
#[derive(Debug, Clone)]
pub struct ConfinedRoot(PathBuf);

impl ConfinedRoot {
    pub fn new(dir: &Path) -> anyhow::Result<Self> {
        let canon = dunce::canonicalize(dir)?;
        if !canon.is_dir() {
            anyhow::bail!("confined root is not a directory: {}", canon.display());
        }
        Ok(Self(canon))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn resolve(&self, candidate: &str) -> Result<PathBuf, AppError> {
        resolve_within(&self.0, candidate)
    }
}

/// Resolves a caller-supplied path against `root`, rejecting anything that
/// lands outside it. Purely lexical: `.` and `..` are collapsed textually,
/// symlinks are not chased. No I/O.
pub fn resolve_within(root: &Path, candidate: &str) -> Result<PathBuf, AppError> {
    let requested = Path::new(candidate);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };
    let resolved = normalize(&joined);
    // Component-wise prefix check, so /work never admits /work-evil.
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(AppError::PathEscape)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            // pop() at the filesystem root is a no-op, so "/.." stays "/"
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(c) => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn relative_paths_stay_inside() {
        let got = resolve_within(Path::new("/sandbox"), "notes/todo.txt").unwrap();
        assert_eq!(got, PathBuf::from("/sandbox/notes/todo.txt"));
    }

    #[test]
    fn dotdot_escape_rejected() {
        let err = resolve_within(Path::new("/sandbox"), "../etc/passwd").unwrap_err();
        assert!(matches!(err, AppError::PathEscape));
    }

    #[test]
    fn deep_dotdot_escape_rejected() {
        let err = resolve_within(Path::new("/sandbox"), "a/../../../../etc").unwrap_err();
        assert!(matches!(err, AppError::PathEscape));
    }

    #[test]
    fn absolute_outside_rejected() {
        let err = resolve_within(Path::new("/sandbox"), "/etc/hosts").unwrap_err();
        assert!(matches!(err, AppError::PathEscape));
    }

    #[test]
    fn absolute_inside_allowed() {
        let got = resolve_within(Path::new("/sandbox"), "/sandbox/a.txt").unwrap();
        assert_eq!(got, PathBuf::from("/sandbox/a.txt"));
    }

    #[test]
    fn sibling_prefix_rejected() {
        let err = resolve_within(Path::new("/work"), "/work-evil/x").unwrap_err();
        assert!(matches!(err, AppError::PathEscape));
    }

    #[test]
    fn empty_and_dot_resolve_to_root() {
        assert_eq!(
            resolve_within(Path::new("/sandbox"), "").unwrap(),
            PathBuf::from("/sandbox")
        );
        assert_eq!(
            resolve_within(Path::new("/sandbox"), ".").unwrap(),
            PathBuf::from("/sandbox")
        );
    }

    #[test]
    fn inner_dotdot_collapses_lexically() {
        let got = resolve_within(Path::new("/sandbox"), "a/./b/../c").unwrap();
        assert_eq!(got, PathBuf::from("/sandbox/a/c"));
    }

    proptest! {
        #[test]
        fn accepted_paths_never_escape(candidate in "[a-z./]{0,40}") {
            if let Ok(resolved) = resolve_within(Path::new("/sandbox"), &candidate) {
                prop_assert!(resolved.starts_with("/sandbox"));
            }
        }
    }
}

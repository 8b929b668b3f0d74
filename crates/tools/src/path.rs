//! Path Containment
//!
//! Resolves tool paths against a fixed root. Containment is checked on the
//! lexically normalized absolute form (component-wise prefix), without
//! touching the filesystem and without resolving symlinks. A symlink inside
//! the root that points outside it is therefore NOT caught; this is a known,
//! documented gap.

use std::path::{Component, Path, PathBuf};

use bug_cascade_core::{CoreError, CoreResult};

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
///
/// `..` never climbs above the filesystem root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Make `root` absolute (against the current directory) and normalize it.
pub fn absolute_root(root: &Path) -> CoreResult<PathBuf> {
    let abs = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    Ok(normalize_lexically(&abs))
}

/// Resolve `relative` under `root`, failing with `UnsafePath` when the
/// normalized result escapes it. `root` must already be absolute and
/// normalized (see `absolute_root`).
pub fn resolve_within(root: &Path, relative: &str) -> CoreResult<PathBuf> {
    let joined = root.join(relative);
    let resolved = normalize_lexically(&joined);
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        tracing::warn!(path = %relative, root = %root.display(), "Rejected path outside root");
        Err(CoreError::unsafe_path(relative))
    }
}

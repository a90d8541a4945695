//! Disk-backed environments for snippet evaluation
//!
//! An environment is a uniquely named directory under the temp root that the
//! toolchain treats as a project. There are two kinds:
//!
//! - the **template**: created and initialized once, then only ever read
//! - **snippet** environments: one full copy of the template per request,
//!   owned by that request and deleted when it finishes
//!
//! Directory names carry a fixed prefix per kind so the shutdown sweep can find
//! leftovers without any bookkeeping.

use sdk::errors::EngineError;
use std::io;
use std::path::{Component, Path, PathBuf};

pub mod factory;
pub mod snippet;
pub mod template;

pub use factory::EnvironmentFactory;
pub use snippet::SnippetEnvironment;
pub use template::{TemplateEnvironment, TemplateProvisioner};

/// Name prefix of the template directory
pub const TEMPLATE_PREFIX: &str = "evalbot_template_";

/// Name prefix of per-request snippet directories
pub const SNIPPET_PREFIX: &str = "evalbot_snippet_";

/// Which role an environment directory plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    Template,
    Snippet,
}

impl EnvironmentKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Template => TEMPLATE_PREFIX,
            Self::Snippet => SNIPPET_PREFIX,
        }
    }

    /// Classify a directory name by its prefix
    pub fn from_dir_name(name: &str) -> Option<Self> {
        if name.starts_with(TEMPLATE_PREFIX) {
            Some(Self::Template)
        } else if name.starts_with(SNIPPET_PREFIX) {
            Some(Self::Snippet)
        } else {
            None
        }
    }
}

/// Create a new, empty directory named `<prefix><random suffix>` under `root`
///
/// Uses `create_dir`, not `create_dir_all`, so an existing directory is never
/// silently reused.
pub(crate) async fn allocate_dir(root: &Path, kind: EnvironmentKind) -> io::Result<(String, PathBuf)> {
    let name = format!("{}{}", kind.prefix(), uuid::Uuid::new_v4().simple());
    let path = root.join(&name);
    tokio::fs::create_dir(&path).await?;
    Ok((name, path))
}

/// Remove an environment directory, treating an already-missing one as removed
pub(crate) async fn remove_dir(path: &Path) -> Result<(), EngineError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::Cleanup(format!("{}: {}", path.display(), e))),
    }
}

/// Recursively copy the contents of `src` into the existing directory `dst`
///
/// Symlinks are recreated as symlinks on unix and followed elsewhere. A link
/// must resolve inside `src`; absolute links are rewritten to point at the
/// same entry inside `dst`, so writes through them never reach `src`.
pub(crate) async fn copy_dir_contents(src: &Path, dst: &Path) -> io::Result<()> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&from_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let from = entry.path();
            let to = to_dir.join(entry.file_name());
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                tokio::fs::create_dir(&to).await?;
                pending.push((from, to));
            } else if file_type.is_symlink() {
                let target = clone_link_target(src, dst, &from).await?;
                copy_symlink(&from, &target, &to).await?;
            } else {
                tokio::fs::copy(&from, &to).await?;
            }
        }
    }

    Ok(())
}

/// Target for the clone of the symlink at `link`
///
/// Relative targets are kept as they are. Absolute targets inside `src` are
/// moved under `dst`. Links escaping `src` are rejected.
async fn clone_link_target(src: &Path, dst: &Path, link: &Path) -> io::Result<PathBuf> {
    let target = tokio::fs::read_link(link).await?;
    let parent = link.parent().unwrap_or(src);
    let resolved = normalize(&parent.join(&target));

    let canonical = tokio::fs::canonicalize(src).await.ok();
    let inside = resolved
        .strip_prefix(normalize(src))
        .ok()
        .or_else(|| canonical.as_deref().and_then(|c| resolved.strip_prefix(c).ok()));

    let Some(inside) = inside else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "symlink {} points outside the template: {}",
                link.display(),
                target.display()
            ),
        ));
    };

    if target.is_absolute() {
        Ok(dst.join(inside))
    } else {
        Ok(target)
    }
}

/// Resolve `.` and `..` lexically, without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(unix)]
async fn copy_symlink(_from: &Path, target: &Path, to: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, to).await
}

#[cfg(not(unix))]
async fn copy_symlink(from: &Path, _target: &Path, to: &Path) -> io::Result<()> {
    tokio::fs::copy(from, to).await.map(|_| ())
}

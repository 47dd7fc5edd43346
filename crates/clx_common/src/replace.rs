//! Binary replacement
//!
//! Swaps the running executable for a downloaded image. The new image is
//! staged in the executable's own directory (same filesystem, so the final
//! rename is atomic), the old binary is kept aside as `<exe>.old`, and
//! `rollback` renames it back if the swap has to be undone.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Atomic replacement of the running executable, with a companion rollback.
/// Both operations may fail independently.
pub trait Replace: Send + Sync {
    /// Replace the executable with `image`.
    fn apply(&self, image: &[u8]) -> Result<()>;

    /// Restore the executable saved by the last `apply`.
    fn rollback(&self) -> Result<()>;
}

/// Replaces the process's own executable on disk.
pub struct SelfReplace {
    target: Option<PathBuf>,
}

impl SelfReplace {
    /// Operate on `std::env::current_exe()`.
    pub fn new() -> Self {
        Self { target: None }
    }

    /// Operate on an explicit path instead of the running executable.
    pub fn at(target: impl Into<PathBuf>) -> Self {
        Self {
            target: Some(target.into()),
        }
    }

    fn target(&self) -> Result<PathBuf> {
        match &self.target {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe().context("cannot locate the running executable"),
        }
    }

    fn backup_path(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".old");
        target.with_file_name(name)
    }
}

impl Default for SelfReplace {
    fn default() -> Self {
        Self::new()
    }
}

impl Replace for SelfReplace {
    fn apply(&self, image: &[u8]) -> Result<()> {
        let target = self.target()?;
        let dir = target
            .parent()
            .context("executable has no parent directory")?;

        let mut staged =
            tempfile::NamedTempFile::new_in(dir).context("failed to create staging file")?;
        staged
            .write_all(image)
            .context("failed to write staging file")?;
        staged.flush().context("failed to flush staging file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o755))
                .context("failed to mark staging file executable")?;
        }

        let backup = Self::backup_path(&target);
        fs::rename(&target, &backup)
            .with_context(|| format!("failed to move {} aside", target.display()))?;
        debug!("previous binary saved to {}", backup.display());

        staged
            .persist(&target)
            .with_context(|| format!("failed to install new binary at {}", target.display()))?;

        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let target = self.target()?;
        let backup = Self::backup_path(&target);
        if !backup.exists() {
            bail!("no previous binary at {}", backup.display());
        }
        fs::rename(&backup, &target)
            .with_context(|| format!("failed to restore {}", target.display()))?;
        Ok(())
    }
}

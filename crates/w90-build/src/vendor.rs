//! Build of the vendored wannier90 tree with its own makefiles.

use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};
use crate::sh::{self, ShOptions, Shell};

/// Changes the process working directory for as long as the guard lives.
///
/// The previous directory is restored on drop, so every exit path out of the
/// guarded scope (including `?` and panics) leaves the cwd untouched.
#[derive(Debug)]
pub struct DirGuard {
    original: PathBuf,
}

impl DirGuard {
    pub fn enter(dir: &Path) -> std::io::Result<Self> {
        let original = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        log::debug!("entered {}", dir.display());
        Ok(Self { original })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.original) {
            log::error!(
                "failed to restore working directory {}: {e}",
                self.original.display()
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct VendorBuild {
    /// Absolute path of the vendored source tree.
    pub dir: PathBuf,
    pub make: String,
    /// Run in order; the first failure stops the build.
    pub targets: Vec<String>,
    /// Copied to `<dir>/make.inc` when the tree has none.
    pub make_inc: Option<PathBuf>,
}

impl VendorBuild {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            make: "make".to_string(),
            targets: vec!["all".to_string(), "lib".to_string()],
            make_inc: None,
        }
    }

    /// Directory holding `libwannier.a` after a successful build.
    pub fn library_dir(&self) -> &Path {
        &self.dir
    }

    pub fn run<S: Shell + ?Sized>(&self, shell: &S) -> Result<()> {
        log::info!("Compiling {}", self.dir.display());
        self.run_inner(shell).map_err(|e| BuildError::Vendor {
            dir: self.dir.clone(),
            source: Box::new(e),
        })
    }

    fn run_inner<S: Shell + ?Sized>(&self, shell: &S) -> Result<()> {
        self.seed_make_inc()?;

        let _guard = DirGuard::enter(&self.dir)?;
        for target in &self.targets {
            sh::check(
                shell,
                &crate::cmd!(&self.make, target),
                &ShOptions::default(),
            )?;
        }
        Ok(())
    }

    fn seed_make_inc(&self) -> Result<()> {
        let Some(template) = &self.make_inc else {
            return Ok(());
        };
        let dest = self.dir.join("make.inc");
        if dest.exists() {
            return Ok(());
        }
        log::info!("seeding {} from {}", dest.display(), template.display());
        std::fs::copy(template, &dest)?;
        Ok(())
    }
}

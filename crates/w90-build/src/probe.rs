//! BLAS/LAPACK presence checks through the host package manager.
//!
//! A package is queried first and installed only when the query fails, so
//! running the probe again on a provisioned host changes nothing. A failing
//! query counts as "absent" even when the query tool itself is broken; the
//! install attempt that follows is what surfaces a real problem.

use std::fmt;

use crate::error::{BuildError, Result};
use crate::os::OsFamily;
use crate::sh::{self, Cmd, ShOptions, Shell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian/Ubuntu: `dpkg` to query, `apt-get` to install.
    Apt { sudo: bool },
    Homebrew,
}

impl PackageManager {
    pub fn for_os(os: OsFamily, sudo: bool) -> Option<Self> {
        match os {
            OsFamily::Linux => Some(Self::Apt { sudo }),
            OsFamily::Macos => Some(Self::Homebrew),
            OsFamily::Other => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Apt { .. } => "apt-get",
            Self::Homebrew => "Homebrew",
        }
    }

    pub fn query(&self, package: &str) -> Cmd {
        match self {
            Self::Apt { .. } => crate::cmd!("dpkg", "-s", package),
            Self::Homebrew => crate::cmd!("brew", "list", package),
        }
    }

    pub fn install(&self, package: &str) -> Cmd {
        match self {
            Self::Apt { sudo: true } => crate::cmd!("apt-get", "install", "-y", package).wrap("sudo"),
            Self::Apt { sudo: false } => crate::cmd!("apt-get", "install", "-y", package),
            Self::Homebrew => crate::cmd!("brew", "install", package),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    #[default]
    Install,
    CheckOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Present,
    Installed,
    /// Absent, and the probe ran in check-only mode.
    Missing,
    /// No known package manager for this OS family.
    Unsupported,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Present => "present",
            Self::Installed => "installed",
            Self::Missing => "missing",
            Self::Unsupported => "unsupported",
        })
    }
}

/// Result of probing one named dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub package: String,
    pub probe: Probe,
}

pub fn ensure_package<S: Shell + ?Sized>(
    shell: &S,
    manager: PackageManager,
    package: &str,
    mode: ProbeMode,
) -> Result<Probe> {
    let query = sh::exec(shell, &manager.query(package), &ShOptions::status_only()?)?;
    if query.success() {
        log::debug!("{package} is installed");
        return Ok(Probe::Present);
    }

    if mode == ProbeMode::CheckOnly {
        return Ok(Probe::Missing);
    }

    log::info!("{package} not found. Installing via {}...", manager.name());
    sh::check(shell, &manager.install(package), &ShOptions::default()).map_err(|e| {
        BuildError::Install {
            package: package.to_string(),
            manager: manager.name(),
            source: Box::new(e),
        }
    })?;
    Ok(Probe::Installed)
}

/// Probes every BLAS/LAPACK package of `os`, stopping at the first failure.
pub fn ensure_lapack<S: Shell + ?Sized>(
    shell: &S,
    os: OsFamily,
    packages: &[String],
    sudo: bool,
    mode: ProbeMode,
) -> Result<Vec<ProbeReport>> {
    let Some(manager) = PackageManager::for_os(os, sudo) else {
        log::warn!("no package manager known for OS family `{os}`; assuming BLAS/LAPACK are installed");
        return Ok(packages
            .iter()
            .map(|p| ProbeReport {
                package: p.clone(),
                probe: Probe::Unsupported,
            })
            .collect());
    };

    packages
        .iter()
        .map(|package| {
            ensure_package(shell, manager, package, mode).map(|probe| ProbeReport {
                package: package.clone(),
                probe,
            })
        })
        .collect()
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::BuildConfig;
use crate::extension::{self, Extension};
use crate::os::OsFamily;
use crate::package::{self, Staged};
use crate::probe::{self, Probe, ProbeMode, ProbeReport};
use crate::python::{self, PythonEnv, PYBIND11_REQUIREMENT};
use crate::sh::Shell;
use crate::vendor::VendorBuild;

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub probes: Vec<ProbeReport>,
    pub python: PythonEnv,
    pub module: PathBuf,
    pub staged: Staged,
}

/// Probe, vendored build, compile, stage: run strictly in that order, the
/// first failure ends the run.
pub struct Pipeline<'a, S: Shell + ?Sized> {
    shell: &'a S,
    config: BuildConfig,
    root: PathBuf,
    os: OsFamily,
    skip_deps: bool,
    compiler: Option<PathBuf>,
}

impl<'a, S: Shell + ?Sized> Pipeline<'a, S> {
    /// `config` paths are resolved against `root`.
    pub fn new(shell: &'a S, config: BuildConfig, root: &Path, os: OsFamily) -> Self {
        Self {
            shell,
            config: config.resolve(root),
            root: root.to_path_buf(),
            os,
            skip_deps: false,
            compiler: None,
        }
    }

    pub fn skip_deps(mut self, skip: bool) -> Self {
        self.skip_deps = skip;
        self
    }

    /// Uses `compiler` as-is instead of looking one up on `PATH`.
    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    fn ensure_deps(&self, mode: ProbeMode) -> Result<Vec<ProbeReport>> {
        let mut reports = probe::ensure_lapack(
            self.shell,
            self.os,
            &self.config.packages_for(self.os),
            self.config.sudo,
            mode,
        )
        .context("checking BLAS/LAPACK")?;

        let pybind11 = python::ensure_pybind11(self.shell, &self.config.python, mode)
            .context("checking pybind11")?;
        reports.push(ProbeReport {
            package: PYBIND11_REQUIREMENT.to_string(),
            probe: pybind11,
        });
        Ok(reports)
    }

    /// Reports which prerequisites are present without installing anything.
    pub fn probe(&self) -> Result<Vec<ProbeReport>> {
        self.ensure_deps(ProbeMode::CheckOnly)
    }

    pub fn build(&self) -> Result<BuildReport> {
        let probes = if self.skip_deps {
            log::info!("skipping dependency checks");
            Vec::new()
        } else {
            self.ensure_deps(ProbeMode::Install)?
        };
        for r in probes.iter().filter(|r| r.probe == Probe::Installed) {
            log::info!("installed {}", r.package);
        }

        let python = PythonEnv::query(self.shell, &self.config.python)
            .context("querying the Python interpreter")?;

        let vendor = VendorBuild {
            dir: self.config.vendor_dir.clone(),
            make: self.config.make.clone(),
            targets: self.config.make_targets.clone(),
            make_inc: self.config.make_inc.clone(),
        };
        vendor.run(self.shell)?;

        let compiler = match &self.compiler {
            Some(c) => c.clone(),
            None => extension::resolve_compiler(self.config.compiler.as_deref())?,
        };
        let ext = Extension::wannier90(
            self.os,
            &self.root,
            vendor.library_dir(),
            &python,
            &self.config.module,
        );
        let module = extension::compile(
            self.shell,
            &ext,
            &compiler,
            self.os,
            &self.config.build_dir,
            python.ext_suffix(),
        )
        .with_context(|| format!("building '{}' extension", ext.name))?;

        let metadata = self
            .config
            .metadata
            .clone()
            .with_readme(&self.root)
            .context("reading README.md")?;
        let staged = package::stage(&self.config.dist_dir, &module, &metadata, self.os)
            .context("staging package")?;

        Ok(BuildReport {
            probes,
            python,
            module,
            staged,
        })
    }

    /// Builds, then copies the module into `target` (default: the
    /// interpreter's platform library directory).
    pub fn install(&self, target: Option<&Path>) -> Result<(BuildReport, Vec<PathBuf>)> {
        let report = self.build()?;
        let target = target
            .map(Path::to_path_buf)
            .unwrap_or_else(|| report.python.platlib.clone());
        let installed = package::install(&report.staged, &target)
            .with_context(|| format!("installing into {}", target.display()))?;
        Ok((report, installed))
    }
}

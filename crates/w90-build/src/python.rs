//! Interpreter-side prerequisites of the binding: pybind11 and the
//! header/suffix/install locations the interpreter was built with.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{BuildError, Result};
use crate::probe::{Probe, ProbeMode};
use crate::sh::{self, ShOptions, Shell};

pub const PYBIND11_REQUIREMENT: &str = "pybind11>=2.6.0";

const QUERY_SCRIPT: &str = r#"import json, sysconfig, pybind11
paths = sysconfig.get_paths()
print(json.dumps({
    "pybind11_include": pybind11.get_include(),
    "python_include": paths["include"],
    "ext_suffix": sysconfig.get_config_var("EXT_SUFFIX"),
    "platlib": paths["platlib"],
}))"#;

pub fn ensure_pybind11<S: Shell + ?Sized>(shell: &S, python: &str, mode: ProbeMode) -> Result<Probe> {
    let query = sh::exec(
        shell,
        &crate::cmd!(python, "-c", "import pybind11"),
        &ShOptions::status_only()?,
    )?;
    if query.success() {
        return Ok(Probe::Present);
    }
    if mode == ProbeMode::CheckOnly {
        return Ok(Probe::Missing);
    }

    log::info!("PyBind11 is not installed. Installing...");
    sh::check(
        shell,
        &crate::cmd!(python, "-m", "pip", "install", PYBIND11_REQUIREMENT),
        &ShOptions::default(),
    )
    .map_err(|e| BuildError::Install {
        package: PYBIND11_REQUIREMENT.to_string(),
        manager: "pip",
        source: Box::new(e),
    })?;
    Ok(Probe::Installed)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PythonEnv {
    pub pybind11_include: PathBuf,
    pub python_include: PathBuf,
    #[serde(default)]
    ext_suffix: Option<String>,
    /// Default install location for compiled modules.
    pub platlib: PathBuf,
}

impl PythonEnv {
    pub fn query<S: Shell + ?Sized>(shell: &S, python: &str) -> Result<Self> {
        let out = sh::check(
            shell,
            &crate::cmd!(python, "-c", QUERY_SCRIPT),
            &ShOptions::capture(),
        )?;
        Self::parse(&out.stdout)
    }

    fn parse(stdout: &str) -> Result<Self> {
        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| BuildError::Python("interpreter printed nothing".into()))?;
        serde_json::from_str(line.trim())
            .map_err(|e| BuildError::Python(format!("unexpected query output `{line}`: {e}")))
    }

    /// File suffix of a loadable module, e.g. `.cpython-311-x86_64-linux-gnu.so`.
    pub fn ext_suffix(&self) -> &str {
        self.ext_suffix.as_deref().unwrap_or(".so")
    }
}

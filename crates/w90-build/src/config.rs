//! `w90-build.yaml`: every key is optional; defaults reproduce the stock
//! libwannier90 build.
//!
//! ```yaml
//! vendor_dir: wannier90-3.1.0
//! make_targets: [all, lib]
//! make_inc: wannier90-3.1.0/config/make.inc.gfort
//! python: python3
//! sudo: true
//! module:
//!   sources: [src/libwannier90.cpp]
//! metadata:
//!   version: 0.2.1
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::extension::ModuleConfig;
use crate::os::OsFamily;
use crate::package::Metadata;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub vendor_dir: PathBuf,
    pub make: String,
    pub make_targets: Vec<String>,
    pub make_inc: Option<PathBuf>,
    /// Overrides the BLAS/LAPACK package list of the host OS family.
    pub packages: Option<Vec<String>>,
    /// Prefix package installs with `sudo` (apt only).
    pub sudo: bool,
    pub python: String,
    /// C++ compiler; `$CXX` or `c++` when unset.
    pub compiler: Option<String>,
    pub build_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub module: ModuleConfig,
    pub metadata: Metadata,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            vendor_dir: PathBuf::from("wannier90-3.1.0"),
            make: "make".to_string(),
            make_targets: vec!["all".to_string(), "lib".to_string()],
            make_inc: None,
            packages: None,
            sudo: false,
            python: "python3".to_string(),
            compiler: None,
            build_dir: PathBuf::from("build"),
            dist_dir: PathBuf::from("dist"),
            module: ModuleConfig::default(),
            metadata: Metadata::default(),
        }
    }
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_yaml(&bytes).map_err(|source| BuildError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_yaml(bytes: &[u8]) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults".
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(bytes)
    }

    pub fn packages_for(&self, os: OsFamily) -> Vec<String> {
        match &self.packages {
            Some(p) => p.clone(),
            None => os.lapack_packages().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Makes every relative path absolute against `root`.
    pub fn resolve(mut self, root: &Path) -> Self {
        self.vendor_dir = root.join(&self.vendor_dir);
        self.make_inc = self.make_inc.map(|p| root.join(p));
        self.build_dir = root.join(&self.build_dir);
        self.dist_dir = root.join(&self.dist_dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(BuildConfig::from_yaml(b"").unwrap(), BuildConfig::default());
        assert_eq!(BuildConfig::from_yaml(b"\n  \n").unwrap(), BuildConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let cfg = BuildConfig::from_yaml(
            br#"
vendor_dir: third_party/wannier90
sudo: true
packages: [libopenblas-dev]
module:
  std: c++14
metadata:
  version: 0.3.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.vendor_dir, PathBuf::from("third_party/wannier90"));
        assert!(cfg.sudo);
        assert_eq!(cfg.packages_for(OsFamily::Linux), vec!["libopenblas-dev"]);
        assert_eq!(cfg.module.std, "c++14");
        assert_eq!(cfg.module.name, "libwannier90");
        assert_eq!(cfg.metadata.version, "0.3.0");
        assert_eq!(cfg.metadata.name, "libwannier90");
        assert_eq!(cfg.make_targets, vec!["all", "lib"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("w90-build.yaml");
        std::fs::write(&path, "vendor_dri: oops\n").unwrap();
        let err = BuildConfig::load(&path).unwrap_err();
        assert!(matches!(err, BuildError::Config { .. }));
    }

    #[test]
    fn test_resolve_against_root() {
        let cfg = BuildConfig {
            make_inc: Some(PathBuf::from("make.inc.gfort")),
            ..Default::default()
        }
        .resolve(Path::new("/proj"));
        assert_eq!(cfg.vendor_dir, PathBuf::from("/proj/wannier90-3.1.0"));
        assert_eq!(cfg.make_inc, Some(PathBuf::from("/proj/make.inc.gfort")));
        assert_eq!(cfg.build_dir, PathBuf::from("/proj/build"));
        assert_eq!(cfg.dist_dir, PathBuf::from("/proj/dist"));

        let abs = BuildConfig {
            vendor_dir: PathBuf::from("/opt/w90"),
            ..Default::default()
        }
        .resolve(Path::new("/proj"));
        assert_eq!(abs.vendor_dir, PathBuf::from("/opt/w90"));
    }

    #[test]
    fn test_default_packages_follow_os() {
        let cfg = BuildConfig::default();
        assert_eq!(cfg.packages_for(OsFamily::Macos), vec!["lapack"]);
        assert!(cfg.packages_for(OsFamily::Other).is_empty());
    }
}

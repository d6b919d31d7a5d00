//! Staging of the built module plus its metadata, and installation of a
//! staged package into an interpreter's library directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::os::OsFamily;
use crate::python::PYBIND11_REQUIREMENT;

pub const MANIFEST_NAME: &str = "PKG-INFO.json";
pub const README_NAME: &str = "README.md";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub author_email: String,
    pub url: String,
    pub description: String,
    /// Filled from the project's `README.md` at stage time when left empty.
    pub long_description: String,
    pub long_description_content_type: String,
    pub license: String,
    pub install_requires: Vec<String>,
    pub python_requires: String,
    pub classifiers: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: "libwannier90".to_string(),
            version: "0.2.0".to_string(),
            author: "Hung Q. Pham".to_string(),
            author_email: "pqh3.14@gmail.com".to_string(),
            url: "https://github.com/hungpham2017/libwannier90".to_string(),
            description: "Wannier90 library for python wrapper pyWannier90".to_string(),
            long_description: String::new(),
            long_description_content_type: "text/markdown".to_string(),
            license: "GPLv2".to_string(),
            install_requires: vec![PYBIND11_REQUIREMENT.to_string()],
            python_requires: ">=3.0".to_string(),
            classifiers: vec![
                "Programming Language :: Python :: 3".to_string(),
                "Programming Language :: C++".to_string(),
                "License :: OSI Approved :: GNU General Public License v2 (GPLv2)".to_string(),
                "Operating System :: OS Independent".to_string(),
            ],
        }
    }
}

impl Metadata {
    /// Takes `long_description` from `<root>/README.md` unless one is set.
    /// A missing README leaves it empty.
    pub fn with_readme(mut self, root: &Path) -> Result<Self> {
        if !self.long_description.is_empty() {
            return Ok(self);
        }
        let readme = root.join(README_NAME);
        match std::fs::read_to_string(&readme) {
            Ok(text) => self.long_description = text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no {}; long_description left empty", readme.display());
            }
            Err(e) => return Err(e.into()),
        }
        Ok(self)
    }
}

/// Contents of the manifest written next to the staged files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: Metadata,
    pub os: OsFamily,
    /// File names relative to the staging directory.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    pub dir: PathBuf,
    pub manifest: Manifest,
}

impl Staged {
    pub fn load(dir: &Path) -> Result<Self> {
        let bytes = std::fs::read(dir.join(MANIFEST_NAME))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest: serde_json::from_slice(&bytes)?,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.manifest.files.iter().map(|f| self.dir.join(f))
    }
}

/// Copies `module` into `<dist_dir>/<name>-<version>/` and writes the manifest.
pub fn stage(dist_dir: &Path, module: &Path, metadata: &Metadata, os: OsFamily) -> Result<Staged> {
    let dir = dist_dir.join(format!("{}-{}", metadata.name, metadata.version));
    std::fs::create_dir_all(&dir)?;

    let file_name = module.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("module path {} has no file name", module.display()),
        )
    })?;
    std::fs::copy(module, dir.join(file_name))?;

    let manifest = Manifest {
        metadata: metadata.clone(),
        os,
        files: vec![file_name.to_string_lossy().into_owned()],
    };
    std::fs::write(
        dir.join(MANIFEST_NAME),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    log::info!("staged {} {} in {}", metadata.name, metadata.version, dir.display());

    Ok(Staged { dir, manifest })
}

/// Copies the staged module files into `target`, returning the installed paths.
pub fn install(staged: &Staged, target: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(target)?;
    let mut installed = Vec::new();
    for (src, name) in staged.files().zip(&staged.manifest.files) {
        let dst = target.join(name);
        std::fs::copy(&src, &dst)?;
        log::info!("copying {} -> {}", src.display(), dst.display());
        installed.push(dst);
    }
    Ok(installed)
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::os::OsFamily;
use crate::python::PythonEnv;
use crate::sh::{self, Cmd, ShOptions, Shell};

/// Source-level settings of the binding module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleConfig {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub std: String,
    pub opt_level: String,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: "libwannier90".to_string(),
            sources: vec![PathBuf::from("src/libwannier90.cpp")],
            // wannier90 exports Fortran symbols with a trailing underscore.
            defines: vec!["_UF".to_string()],
            std: "c++11".to_string(),
            opt_level: "3".to_string(),
            extra_compile_args: Vec::new(),
            extra_link_args: Vec::new(),
        }
    }
}

/// A loadable module: one compile+link invocation of the C++ compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    /// Embedded as rpath entries so the module finds its libraries at load time.
    pub runtime_library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub compile_args: Vec<String>,
    pub link_args: Vec<String>,
}

impl Extension {
    /// The wannier90 binding, linked against the vendored build in `vendor_dir`.
    ///
    /// `root` anchors the relative source paths of `module`.
    pub fn wannier90(
        os: OsFamily,
        root: &Path,
        vendor_dir: &Path,
        python: &PythonEnv,
        module: &ModuleConfig,
    ) -> Self {
        let lapack = os.lapack_prefix();

        let mut include_dirs = vec![vendor_dir.to_path_buf()];
        include_dirs.extend(lapack.map(|p| PathBuf::from(p.include)));
        include_dirs.push(python.pybind11_include.clone());
        include_dirs.push(python.python_include.clone());

        let mut library_dirs: Vec<PathBuf> = lapack.map(|p| PathBuf::from(p.lib)).into_iter().collect();
        library_dirs.push(vendor_dir.to_path_buf());

        let mut compile_args = vec![
            format!("-O{}", module.opt_level),
            "-Wall".to_string(),
            "-shared".to_string(),
            format!("-std={}", module.std),
            "-fPIC".to_string(),
        ];
        compile_args.extend(module.defines.iter().map(|d| format!("-D{d}")));
        compile_args.extend(module.extra_compile_args.iter().cloned());

        let mut link_args: Vec<String> = os.module_link_args().iter().map(|s| s.to_string()).collect();
        link_args.extend(module.extra_link_args.iter().cloned());

        Self {
            name: module.name.clone(),
            sources: module.sources.iter().map(|s| root.join(s)).collect(),
            include_dirs,
            library_dirs,
            runtime_library_dirs: vec![vendor_dir.to_path_buf()],
            libraries: vec!["wannier".to_string(), "lapack".to_string(), "blas".to_string()],
            compile_args,
            link_args,
        }
    }

    pub fn output_path(&self, build_dir: &Path, ext_suffix: &str) -> PathBuf {
        build_dir.join(format!("{}{}", self.name, ext_suffix))
    }

    pub fn command(&self, compiler: &Path, os: OsFamily, output: &Path) -> Cmd {
        let mut cmd = Cmd::new(compiler).args(&self.compile_args);
        for dir in &self.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }
        cmd = cmd.args(&self.sources).arg("-o").arg(output);
        for dir in &self.library_dirs {
            cmd = cmd.arg(format!("-L{}", dir.display()));
        }
        // Libraries after the sources that reference them.
        for lib in &self.libraries {
            cmd = cmd.arg(format!("-l{lib}"));
        }
        for dir in &self.runtime_library_dirs {
            cmd = cmd.arg(os.rpath_arg(dir));
        }
        cmd.args(&self.link_args)
    }
}

/// Picks the compiler: `configured`, then `$CXX`, then `c++`, resolved on `PATH`.
pub fn resolve_compiler(configured: Option<&str>) -> Result<PathBuf> {
    let name = configured
        .map(str::to_string)
        .or_else(|| std::env::var("CXX").ok().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "c++".to_string());
    which::which(&name).map_err(|_| BuildError::NoCompiler(name))
}

pub fn compile<S: Shell + ?Sized>(
    shell: &S,
    ext: &Extension,
    compiler: &Path,
    os: OsFamily,
    build_dir: &Path,
    ext_suffix: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(build_dir)?;
    let output = ext.output_path(build_dir, ext_suffix);
    log::info!("building '{}' extension", ext.name);
    sh::check(shell, &ext.command(compiler, os, &output), &ShOptions::default())?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::testing::QUERY_JSON;
    use crate::sh::fake::FakeShell;

    fn python_env() -> PythonEnv {
        serde_json::from_str(QUERY_JSON).unwrap()
    }

    fn ext(os: OsFamily) -> Extension {
        Extension::wannier90(
            os,
            Path::new("/proj"),
            Path::new("/proj/wannier90-3.1.0"),
            &python_env(),
            &ModuleConfig::default(),
        )
    }

    #[test]
    fn test_vendor_dir_on_link_and_runtime_paths() {
        for os in [OsFamily::Linux, OsFamily::Macos, OsFamily::Other] {
            let e = ext(os);
            let vendor = PathBuf::from("/proj/wannier90-3.1.0");
            assert!(e.library_dirs.contains(&vendor), "{os}");
            assert!(e.include_dirs.contains(&vendor), "{os}");
            assert_eq!(e.runtime_library_dirs, vec![vendor]);
        }
    }

    #[test]
    fn test_paths_follow_os_family() {
        let mac = ext(OsFamily::Macos);
        assert!(mac
            .library_dirs
            .contains(&PathBuf::from("/opt/homebrew/opt/lapack/lib")));
        assert!(mac.link_args.contains(&"dynamic_lookup".to_string()));

        let linux = ext(OsFamily::Linux);
        assert!(linux.library_dirs.contains(&PathBuf::from("/usr/lib")));
        assert!(!linux
            .library_dirs
            .iter()
            .any(|d| d.starts_with("/opt/homebrew")));
        assert!(linux.link_args.is_empty());

        let other = ext(OsFamily::Other);
        assert_eq!(
            other.library_dirs,
            vec![PathBuf::from("/proj/wannier90-3.1.0")]
        );
    }

    #[test]
    fn test_command_line() {
        let e = ext(OsFamily::Linux);
        let out = e.output_path(Path::new("/proj/build"), python_env().ext_suffix());
        let line = e.command(Path::new("/usr/bin/c++"), OsFamily::Linux, &out).to_string();
        assert_eq!(
            line,
            "/usr/bin/c++ -O3 -Wall -shared -std=c++11 -fPIC -D_UF \
             -I/proj/wannier90-3.1.0 -I/usr/include -I/py/site-packages/pybind11/include \
             -I/py/include/python3.11 /proj/src/libwannier90.cpp \
             -o /proj/build/libwannier90.cpython-311-x86_64-linux-gnu.so \
             -L/usr/lib -L/proj/wannier90-3.1.0 -lwannier -llapack -lblas \
             -Wl,-rpath,/proj/wannier90-3.1.0"
        );
    }

    #[test]
    fn test_compile_creates_build_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let build_dir = tmp.path().join("build");
        let shell = FakeShell::new();
        let e = ext(OsFamily::Linux);

        let out = compile(&shell, &e, Path::new("c++"), OsFamily::Linux, &build_dir, ".so").unwrap();
        assert!(build_dir.is_dir());
        assert_eq!(out, build_dir.join("libwannier90.so"));
        assert!(shell.ran(&["c++", "-O3"]));
    }

    #[test]
    fn test_compile_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let shell = FakeShell::new().fail(&["c++"], 1);
        let err = compile(
            &shell,
            &ext(OsFamily::Linux),
            Path::new("c++"),
            OsFamily::Linux,
            tmp.path(),
            ".so",
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Command { code: Some(1), .. }));
    }

    #[test]
    fn test_unknown_compiler() {
        let err = resolve_compiler(Some("w90-no-such-compiler")).unwrap_err();
        assert!(matches!(err, BuildError::NoCompiler(ref n) if n == "w90-no-such-compiler"));
    }
}

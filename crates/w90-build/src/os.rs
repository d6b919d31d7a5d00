use std::fmt;
use std::path::Path;

/// Host operating system family. Selects the package manager and the
/// system paths used for BLAS/LAPACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Macos,
    Other,
}

/// Include and library roots of a system LAPACK installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapackPrefix {
    pub include: &'static str,
    pub lib: &'static str,
}

impl OsFamily {
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Maps `std::env::consts::OS` style names.
    pub fn from_os_name(name: &str) -> Self {
        match name {
            "linux" => Self::Linux,
            "macos" => Self::Macos,
            _ => Self::Other,
        }
    }

    pub fn lapack_packages(self) -> &'static [&'static str] {
        match self {
            Self::Linux => &["libblas-dev", "liblapack-dev"],
            Self::Macos => &["lapack"],
            Self::Other => &[],
        }
    }

    pub fn lapack_prefix(self) -> Option<LapackPrefix> {
        match self {
            Self::Linux => Some(LapackPrefix {
                include: "/usr/include",
                lib: "/usr/lib",
            }),
            Self::Macos => Some(LapackPrefix {
                include: "/opt/homebrew/opt/lapack/include",
                lib: "/opt/homebrew/opt/lapack/lib",
            }),
            Self::Other => None,
        }
    }

    /// Extra linker flags a loadable module needs on this platform.
    pub fn module_link_args(self) -> &'static [&'static str] {
        match self {
            // Python symbols are resolved by the interpreter at load time.
            Self::Macos => &["-undefined", "dynamic_lookup"],
            Self::Linux | Self::Other => &[],
        }
    }

    pub fn rpath_arg(self, dir: &Path) -> String {
        format!("-Wl,-rpath,{}", dir.display())
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_os_name() {
        assert_eq!(OsFamily::from_os_name("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_os_name("macos"), OsFamily::Macos);
        assert_eq!(OsFamily::from_os_name("windows"), OsFamily::Other);
        assert_eq!(OsFamily::from_os_name("freebsd"), OsFamily::Other);
    }

    #[test]
    fn test_detect_matches_host() {
        let expected = if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else if cfg!(target_os = "macos") {
            OsFamily::Macos
        } else {
            OsFamily::Other
        };
        assert_eq!(OsFamily::detect(), expected);
    }

    #[test]
    fn test_packages_per_family() {
        assert_eq!(
            OsFamily::Linux.lapack_packages(),
            &["libblas-dev", "liblapack-dev"]
        );
        assert_eq!(OsFamily::Macos.lapack_packages(), &["lapack"]);
        assert!(OsFamily::Other.lapack_packages().is_empty());
        assert!(OsFamily::Other.lapack_prefix().is_none());
    }

    #[test]
    fn test_serde_lowercase() {
        let os: OsFamily = serde_yaml::from_str("macos").unwrap();
        assert_eq!(os, OsFamily::Macos);
        assert_eq!(serde_json::to_string(&OsFamily::Linux).unwrap(), "\"linux\"");
    }
}

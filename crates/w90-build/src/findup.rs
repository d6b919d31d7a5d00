use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "w90-build.yaml";

pub fn find_upwards(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent().unwrap_or(start).to_path_buf()
    };

    loop {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        if !dir.pop() {
            break;
        }
    }

    None
}

/// Project root and config file (if any) as seen from `start`.
///
/// The root is the directory holding `w90-build.yaml`, or `start` itself when
/// no config exists above it.
pub fn project_root(start: &Path) -> (PathBuf, Option<PathBuf>) {
    match find_upwards(start, CONFIG_FILE) {
        Some(config) => {
            let root = config.parent().unwrap_or(start).to_path_buf();
            (root, Some(config))
        }
        None => (start.to_path_buf(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_config_in_ancestor() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "").unwrap();

        let (root, config) = project_root(&nested);
        assert_eq!(root, tmp.path());
        assert_eq!(config, Some(tmp.path().join(CONFIG_FILE)));
    }

    #[test]
    fn test_missing_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = "w90-build-test-marker-that-does-not-exist.yaml";
        assert_eq!(find_upwards(tmp.path(), marker), None);
    }

    #[test]
    fn test_start_may_be_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("setup.cfg");
        std::fs::write(&file, "").unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "").unwrap();
        assert_eq!(
            find_upwards(&file, CONFIG_FILE),
            Some(tmp.path().join(CONFIG_FILE))
        );
    }
}

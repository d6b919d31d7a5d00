use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to run `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {cmd} (exit code: {})", exit_code(.code))]
    Command { cmd: String, code: Option<i32> },

    #[error("could not install {package} via {manager}")]
    Install {
        package: String,
        manager: &'static str,
        #[source]
        source: Box<BuildError>,
    },

    #[error("Error occurred while compiling {}", .dir.display())]
    Vendor {
        dir: PathBuf,
        #[source]
        source: Box<BuildError>,
    },

    #[error("python environment: {0}")]
    Python(String),

    #[error("no C++ compiler found (tried `{0}`)")]
    NoCompiler(String),

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid subprocess options: {0}")]
    Options(#[from] crate::sh::ShOptionsBuilderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "killed by signal".to_string(),
    }
}

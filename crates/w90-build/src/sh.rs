// Subprocess execution

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{Command, Stdio};

use derive_builder::Builder;

use crate::error::{BuildError, Result};

/// A program and its arguments, run without an intermediate shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Prepends `program`, shifting the current program into the arguments.
    pub fn wrap(self, program: impl AsRef<OsStr>) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: program.as_ref().to_os_string(),
            args,
        }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Program followed by arguments, lossily converted.
    pub fn words(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|w| w.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if word.is_empty() || word.contains(char::is_whitespace) {
                write!(f, "{word:?}")?;
            } else {
                f.write_str(word)?;
            }
        }
        Ok(())
    }
}

/// `cmd!("make", "all")` builds a [`Cmd`].
#[macro_export]
macro_rules! cmd {
    ($program:expr $(, $arg:expr)* $(,)?) => {{
        $crate::sh::Cmd::new($program)$(.arg($arg))*
    }};
}

/// Trait for types that can configure a `Command` before execution.
pub trait ShConfig {
    /// Apply configuration to the given `Command`.
    fn apply(&self, cmd: &mut Command);
}

#[derive(Clone, Debug)]
pub enum StreamMode {
    Inherit,
    Pipe,
    Null,
}

#[derive(Clone, Debug, Builder)]
#[builder(default)]
pub struct ShOptions {
    pub stdout: StreamMode,
    pub stderr: StreamMode,
    pub quiet: bool,
}

impl Default for ShOptions {
    fn default() -> Self {
        Self {
            stdout: StreamMode::Inherit,
            stderr: StreamMode::Inherit,
            quiet: false,
        }
    }
}

impl ShOptions {
    /// Capture both streams and keep the log quiet; used for queries.
    pub fn capture() -> Self {
        Self {
            stdout: StreamMode::Pipe,
            stderr: StreamMode::Pipe,
            quiet: true,
        }
    }

    /// Discard all output; for presence checks that only need the exit code.
    pub fn status_only() -> Result<Self> {
        Ok(ShOptionsBuilder::default()
            .stdout(StreamMode::Null)
            .stderr(StreamMode::Null)
            .quiet(true)
            .build()?)
    }
}

impl ShConfig for ShOptions {
    fn apply(&self, cmd: &mut Command) {
        match self.stdout {
            StreamMode::Inherit => cmd.stdout(Stdio::inherit()),
            StreamMode::Pipe => cmd.stdout(Stdio::piped()),
            StreamMode::Null => cmd.stdout(Stdio::null()),
        };

        match self.stderr {
            StreamMode::Inherit => cmd.stderr(Stdio::inherit()),
            StreamMode::Pipe => cmd.stderr(Stdio::piped()),
            StreamMode::Null => cmd.stderr(Stdio::null()),
        };
    }
}

#[derive(Clone, Debug, Default)]
pub struct ShOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ShOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs commands. Non-zero exits are reported in [`ShOutput`], only a
/// failure to spawn is an error.
pub trait Shell {
    fn exec(&self, cmd: &Cmd, opts: &ShOptions) -> std::io::Result<ShOutput>;
}

impl<T: Shell + ?Sized> Shell for &T {
    fn exec(&self, cmd: &Cmd, opts: &ShOptions) -> std::io::Result<ShOutput> {
        (*self).exec(cmd, opts)
    }
}

/// Spawns real processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

impl Shell for System {
    fn exec(&self, cmd: &Cmd, opts: &ShOptions) -> std::io::Result<ShOutput> {
        if opts.quiet {
            log::debug!("[sh] {}", cmd);
        } else {
            log::info!("[sh] {}", cmd);
        }

        let mut command = Command::new(cmd.program());
        command.args(cmd.get_args());
        opts.apply(&mut command);

        let output = command.output()?;

        Ok(ShOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs `cmd`, returning the exit status as-is.
pub fn exec<S: Shell + ?Sized>(shell: &S, cmd: &Cmd, opts: &ShOptions) -> Result<ShOutput> {
    shell.exec(cmd, opts).map_err(|source| BuildError::Spawn {
        cmd: cmd.to_string(),
        source,
    })
}

/// Runs `cmd` and fails on a non-zero exit.
pub fn check<S: Shell + ?Sized>(shell: &S, cmd: &Cmd, opts: &ShOptions) -> Result<ShOutput> {
    let out = exec(shell, cmd, opts)?;
    if !out.success() {
        if !out.stderr.is_empty() {
            log::debug!("[sh] stderr of `{}`:\n{}", cmd, out.stderr.trim_end());
        }
        return Err(BuildError::Command {
            cmd: cmd.to_string(),
            code: out.code,
        });
    }
    Ok(out)
}

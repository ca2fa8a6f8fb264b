use log::debug;
use std::{
    fmt,
    os::unix::process::ExitStatusExt,
    process::{Command, ExitStatus, Stdio},
};
use thiserror::Error;

/// Shells report a child killed by signal N as exit status 128 + N.
const SIGNAL_EXIT_BASE: i32 = 128;

#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("Failed to spawn '{0}': {1}")]
    Spawn(String, #[source] std::io::Error),

    #[error("Failed to wait for '{0}': {1}")]
    Wait(String, #[source] std::io::Error),

    #[error("'{0}' finished without an exit code or signal")]
    UnknownStatus(String),
}

/// Whether an invocation needs root.
///
/// `Elevated` runs the program through `sudo -S`, which reads the password
/// from the inherited stdin if one is needed. Exported variables are listed in
/// `--preserve-env` since sudo resets the environment otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Elevated,
    Unprivileged,
}

/// A fully assembled external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    privilege: Privilege,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I, privilege: Privilege) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            privilege,
        }
    }

    /// Exports `key=value` into the child's environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// The argv that is actually spawned, privilege wrapper included.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 4);
        if self.privilege == Privilege::Elevated {
            argv.push("sudo".to_string());
            argv.push("-S".to_string());
            if !self.env.is_empty() {
                let names: Vec<&str> = self.env.iter().map(|(key, _)| key.as_str()).collect();
                argv.push(format!("--preserve-env={}", names.join(",")));
            }
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    fn to_command(&self) -> Command {
        let argv = self.command_line();
        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line().join(" "))
    }
}

/// Runs an [`Invocation`] to completion and reports its exit code.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, ExecuteError>;
}

/// Spawns the real process with the terminal attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        SystemRunner
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, ExecuteError> {
        let name = invocation.program().to_string();
        let mut child = invocation
            .to_command()
            .spawn()
            .map_err(|err| ExecuteError::Spawn(name.clone(), err))?;

        let status = child
            .wait()
            .map_err(|err| ExecuteError::Wait(name.clone(), err))?;
        debug!("{} finished with {}", name, status);

        exit_code(&status).ok_or(ExecuteError::UnknownStatus(name))
    }
}

/// Maps a process status to the integer a shell would report.
pub fn exit_code(status: &ExitStatus) -> Option<i32> {
    status
        .code()
        .or_else(|| status.signal().map(|signal| SIGNAL_EXIT_BASE + signal))
}

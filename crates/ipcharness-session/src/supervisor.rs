use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{info, warn};

use crate::completion::CompletionFlag;
use crate::error::LaunchError;

/// Where the child's standard streams go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Share the harness's stdin/stdout/stderr.
    #[default]
    Inherit,
    /// Connect all three to the null device.
    Null,
}

/// Everything needed to start the test subprocess.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    program: OsString,
    args: Vec<OsString>,
    env: BTreeMap<OsString, OsString>,
    inherit_env: bool,
    cwd: Option<PathBuf>,
    stdio: StdioMode,
}

impl LaunchSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            inherit_env: true,
            cwd: None,
            stdio: StdioMode::default(),
        }
    }

    /// Build from a full argv; `None` if it is empty.
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next()?;
        Some(Self::new(program).args(argv))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable, layered over the inherited environment.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Start the child with only the variables set on this spec.
    pub fn clear_env(mut self) -> Self {
        self.inherit_env = false;
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdio(mut self, mode: StdioMode) -> Self {
        self.stdio = mode;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_var(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.env.get(key.as_ref()).map(OsString::as_os_str)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if !self.inherit_env {
            command.env_clear();
        }
        command.envs(&self.env);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if self.stdio == StdioMode::Null {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }
        command
    }
}

/// Sets the completion flag when dropped, whatever path `run` leaves by.
struct CompletionGuard<'a>(&'a CompletionFlag);

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.0.set();
    }
}

/// Runs the test subprocess to completion and signals when it is gone.
pub struct ProcessSupervisor {
    spec: LaunchSpec,
}

impl ProcessSupervisor {
    pub fn new(spec: LaunchSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Start the process, wait for it to exit, then set `completion`.
    ///
    /// A non-zero exit is returned as a status, not an error; the flag is
    /// set even when the launch fails.
    pub fn run(&self, completion: &CompletionFlag) -> Result<ExitStatus, LaunchError> {
        let _guard = CompletionGuard(completion);
        let program = self.spec.program.to_string_lossy().into_owned();

        let mut child = self
            .spec
            .command()
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.clone(),
                source,
            })?;
        info!(pid = child.id(), %program, "launched test process");

        let status = child
            .wait()
            .map_err(|source| LaunchError::Wait {
                program: program.clone(),
                source,
            })?;

        if status.success() {
            info!(%program, "test process exited successfully");
        } else {
            warn!(%program, code = ?status.code(), "test process exited with failure");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> LaunchSpec {
        LaunchSpec::new("/bin/sh")
            .arg("-c")
            .arg(script)
            .stdio(StdioMode::Null)
    }

    #[test]
    fn successful_run_sets_completion() {
        let completion = CompletionFlag::new();
        let status = ProcessSupervisor::new(sh("exit 0"))
            .run(&completion)
            .expect("sh should launch");
        assert!(status.success());
        assert!(completion.is_set());
    }

    #[test]
    fn non_zero_exit_is_not_an_error() {
        let completion = CompletionFlag::new();
        let status = ProcessSupervisor::new(sh("exit 3"))
            .run(&completion)
            .expect("non-zero exit is a status");
        assert_eq!(status.code(), Some(3));
        assert!(completion.is_set());
    }

    #[test]
    fn launch_failure_still_sets_completion() {
        let completion = CompletionFlag::new();
        let err = ProcessSupervisor::new(LaunchSpec::new("/nonexistent/ipch-test-runner"))
            .run(&completion)
            .expect_err("missing program should fail to launch");
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert!(completion.is_set());
    }

    #[test]
    fn environment_overrides_reach_the_child() {
        let completion = CompletionFlag::new();
        let spec = sh(r#"test "$IPCH_PROBE" = "expected""#).env("IPCH_PROBE", "expected");
        let status = ProcessSupervisor::new(spec).run(&completion).unwrap();
        assert!(status.success());
    }

    #[test]
    fn clear_env_drops_inherited_variables() {
        let completion = CompletionFlag::new();
        let spec = sh(r#"test -z "$HOME" && test "$ONLY" = "1""#)
            .clear_env()
            .env("ONLY", "1");
        let status = ProcessSupervisor::new(spec).run(&completion).unwrap();
        assert!(status.success());
    }

    #[test]
    fn working_directory_is_applied() {
        let dir = std::env::temp_dir().join(format!("ipch-cwd-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("marker.txt"), b"here").unwrap();

        let completion = CompletionFlag::new();
        let spec = sh("test -f marker.txt").cwd(&dir);
        let status = ProcessSupervisor::new(spec).run(&completion).unwrap();
        assert!(status.success());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn from_argv_splits_program_and_args() {
        let spec = LaunchSpec::from_argv(["python", "-m", "pytest"]).unwrap();
        assert_eq!(spec.program(), "python");
        assert_eq!(spec.args, vec![OsString::from("-m"), OsString::from("pytest")]);
        assert!(LaunchSpec::from_argv(Vec::<String>::new()).is_none());
    }
}

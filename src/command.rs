use std::fs::File;
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::error::SwarmError;

/// One fully specified external command: argument vector, optional stdout
/// redirect, retry budget and failure tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    argv: Vec<String>,
    redirect: Option<Utf8PathBuf>,
    retries: u32,
    tolerate_failure: bool,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![program.to_string()];
        argv.extend(args.into_iter().map(Into::into));
        Self {
            argv,
            redirect: None,
            retries: 0,
            tolerate_failure: false,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn tolerate_failure(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }

    pub fn redirect_stdout(mut self, path: &Utf8Path) -> Self {
        self.redirect = Some(path.to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// What a single child process produced. `stdout` holds the combined
/// stdout+stderr stream when nothing was redirected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Captured(String),
    Redirected(Utf8PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub output: CommandOutput,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn captured(&self) -> Option<&str> {
        match &self.output {
            CommandOutput::Captured(text) => Some(text),
            CommandOutput::Redirected(_) => None,
        }
    }
}

/// Launches one child process and waits for it.
pub trait ProcessLauncher {
    fn launch(
        &self,
        argv: &[String],
        redirect: Option<&Utf8Path>,
    ) -> Result<ProcessOutput, SwarmError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(
        &self,
        argv: &[String],
        redirect: Option<&Utf8Path>,
    ) -> Result<ProcessOutput, SwarmError> {
        let (program, args) = argv.split_first().ok_or_else(|| SwarmError::CommandSpawn {
            program: String::new(),
            message: "empty command".to_string(),
        })?;
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());

        match redirect {
            None => {
                let (mut reader, writer) =
                    io::pipe().map_err(|err| spawn_error(program, err))?;
                let writer_err = writer
                    .try_clone()
                    .map_err(|err| spawn_error(program, err))?;
                cmd.stdout(writer).stderr(writer_err);
                let mut child = cmd.spawn().map_err(|err| spawn_error(program, err))?;
                // The command still owns write ends of the pipe; reading would never see EOF.
                drop(cmd);

                let mut combined = Vec::new();
                reader
                    .read_to_end(&mut combined)
                    .map_err(|err| spawn_error(program, err))?;
                let status = child.wait().map_err(|err| spawn_error(program, err))?;
                Ok(ProcessOutput {
                    exit_code: exit_code(status),
                    stdout: Some(String::from_utf8_lossy(&combined).into_owned()),
                    stderr: None,
                })
            }
            Some(path) => {
                let file = File::create(path.as_std_path())
                    .map_err(|err| SwarmError::Filesystem(format!("create {path}: {err}")))?;
                cmd.stdout(file).stderr(Stdio::piped());
                let child = cmd.spawn().map_err(|err| spawn_error(program, err))?;
                let output = child
                    .wait_with_output()
                    .map_err(|err| spawn_error(program, err))?;
                Ok(ProcessOutput {
                    exit_code: exit_code(output.status),
                    stdout: None,
                    stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                })
            }
        }
    }
}

/// Applies the logging and exit-code policy around a [`ProcessLauncher`].
#[derive(Debug, Clone, Default)]
pub struct CommandRunner<L: ProcessLauncher> {
    launcher: L,
}

impl<L: ProcessLauncher> CommandRunner<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Runs the invocation. A non-zero exit is retried while budget remains,
    /// then tolerated if requested, otherwise reported as `CommandFailed`.
    pub fn run(&self, invocation: &Invocation) -> Result<CommandOutcome, SwarmError> {
        let mut remaining = invocation.retries;
        loop {
            info!("Commands:");
            info!("{}", invocation.command_line());
            let raw = self
                .launcher
                .launch(&invocation.argv, invocation.redirect.as_deref())?;
            log_stream("Standard output of subprocess:", raw.stdout.as_deref());
            log_stream("Standard error of subprocess:", raw.stderr.as_deref());

            let outcome = CommandOutcome {
                exit_code: raw.exit_code,
                output: match &invocation.redirect {
                    Some(path) => CommandOutput::Redirected(path.clone()),
                    None => CommandOutput::Captured(raw.stdout.unwrap_or_default()),
                },
            };

            if outcome.success() {
                return Ok(outcome);
            }
            if remaining > 0 {
                info!(
                    "Exit code {}, retrying {} more times",
                    outcome.exit_code, remaining
                );
                remaining -= 1;
                continue;
            }
            if invocation.tolerate_failure {
                warn!(
                    "Exit code was {}, but we will continue anyway",
                    outcome.exit_code
                );
                return Ok(outcome);
            }
            return Err(SwarmError::CommandFailed {
                program: invocation.program().to_string(),
                exit_code: outcome.exit_code,
            });
        }
    }
}

fn log_stream(header: &str, text: Option<&str>) {
    let Some(text) = text else {
        return;
    };
    if text.is_empty() {
        return;
    }
    info!("{header}");
    for line in text.lines() {
        info!("{line}");
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn spawn_error(program: &str, err: io::Error) -> SwarmError {
    if err.kind() == io::ErrorKind::NotFound {
        SwarmError::MissingTool(program.to_string())
    } else {
        SwarmError::CommandSpawn {
            program: program.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;

    /// Returns the queued exit codes in order, then 0 forever.
    #[derive(Default)]
    struct ScriptedLauncher {
        codes: Mutex<VecDeque<i32>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedLauncher {
        fn failing(times: usize, code: i32) -> Self {
            Self {
                codes: Mutex::new(std::iter::repeat_n(code, times).collect()),
                calls: Mutex::default(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ProcessLauncher for ScriptedLauncher {
        fn launch(
            &self,
            argv: &[String],
            _redirect: Option<&Utf8Path>,
        ) -> Result<ProcessOutput, SwarmError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            let code = self.codes.lock().unwrap().pop_front().unwrap_or(0);
            Ok(ProcessOutput {
                exit_code: code,
                stdout: Some(format!("attempt exit={code}\n")),
                stderr: None,
            })
        }
    }

    #[test]
    fn retry_budget_covers_failures() {
        let runner = CommandRunner::new(ScriptedLauncher::failing(2, 1));
        let outcome = runner
            .run(&Invocation::new("prefetch", ["SRR000001"]).with_retries(2))
            .unwrap();
        assert!(outcome.success());
        assert_eq!(runner.launcher().call_count(), 3);
        let calls = runner.launcher().calls.lock().unwrap();
        assert!(calls.iter().all(|argv| argv == &calls[0]));
    }

    #[test]
    fn retry_budget_exhausted() {
        let runner = CommandRunner::new(ScriptedLauncher::failing(3, 7));
        let err = runner
            .run(&Invocation::new("prefetch", ["SRR000001"]).with_retries(2))
            .unwrap_err();
        assert_matches!(err, SwarmError::CommandFailed { exit_code: 7, .. });
        assert_eq!(runner.launcher().call_count(), 3);
    }

    #[test]
    fn tolerated_failure_returns_outcome() {
        let runner = CommandRunner::new(ScriptedLauncher::failing(1, 2));
        let outcome = runner
            .run(&Invocation::new("wget", ["http://example.org/x"]).tolerate_failure())
            .unwrap();
        assert_eq!(outcome.exit_code, 2);
        assert_eq!(outcome.captured(), Some("attempt exit=2\n"));
    }

    #[test]
    fn tolerance_applies_after_retries() {
        let runner = CommandRunner::new(ScriptedLauncher::failing(5, 3));
        let outcome = runner
            .run(
                &Invocation::new("aws", ["s3", "ls"])
                    .with_retries(1)
                    .tolerate_failure(),
            )
            .unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(runner.launcher().call_count(), 2);
    }

    #[test]
    fn failure_without_budget_is_fatal() {
        let runner = CommandRunner::new(ScriptedLauncher::failing(1, 4));
        let err = runner
            .run(&Invocation::new("swarmwrapper", ["cluster"]))
            .unwrap_err();
        assert_matches!(
            err,
            SwarmError::CommandFailed { program, exit_code: 4 } if program == "swarmwrapper"
        );
        assert_eq!(runner.launcher().call_count(), 1);
    }

    #[test]
    fn redirect_suppresses_captured_text() {
        let runner = CommandRunner::new(ScriptedLauncher::default());
        let outcome = runner
            .run(&Invocation::new("cat", ["a.fastq"]).redirect_stdout(Utf8Path::new("/tmp/x")))
            .unwrap();
        assert_eq!(outcome.captured(), None);
        assert_eq!(
            outcome.output,
            CommandOutput::Redirected(Utf8PathBuf::from("/tmp/x"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn system_launcher_combines_streams() {
        let runner = CommandRunner::new(SystemLauncher);
        let outcome = runner
            .run(&Invocation::new("sh", ["-c", "echo out; echo err 1>&2"]))
            .unwrap();
        let text = outcome.captured().unwrap();
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn system_launcher_redirects_stdout() {
        let temp = tempfile::tempdir().unwrap();
        let target = Utf8PathBuf::from_path_buf(temp.path().join("stdout.txt")).unwrap();
        let runner = CommandRunner::new(SystemLauncher);
        runner
            .run(
                &Invocation::new("sh", ["-c", "echo payload; echo noise 1>&2"])
                    .redirect_stdout(&target),
            )
            .unwrap();
        let written = std::fs::read_to_string(target.as_std_path()).unwrap();
        assert_eq!(written, "payload\n");
    }

    #[cfg(unix)]
    #[test]
    fn system_launcher_reports_exit_code() {
        let runner = CommandRunner::new(SystemLauncher);
        let err = runner
            .run(&Invocation::new("sh", ["-c", "exit 3"]))
            .unwrap_err();
        assert_matches!(err, SwarmError::CommandFailed { exit_code: 3, .. });
    }

    #[test]
    fn missing_program_is_reported() {
        let runner = CommandRunner::new(SystemLauncher);
        let err = runner
            .run(&Invocation::new("kira-swarm-no-such-tool", Vec::<String>::new()))
            .unwrap_err();
        assert_matches!(err, SwarmError::MissingTool(_));
    }
}

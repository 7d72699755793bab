// src/system/process.rs

use crate::system::log_reader::LogReader;
use crate::system::task::{LogSink, Task, TaskError, TaskInfo};
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// How often the supervising thread polls the child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long the supervisor waits for the log readers to drain after exit.
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum ProcessState {
    /// Not spawned yet; the process starts when the task runs.
    Pending,
    Running(Child),
    Exited(ExitStatus),
    /// Killed before or while running.
    Killed,
    /// The spawn itself failed.
    Failed,
}

/// Wraps one OS process as a supervised task.
///
/// The process is spawned when [`run`](Task::run) starts, on the pool worker that
/// runs it, and that worker stays occupied until the process exits. Standard output
/// and standard error are tailed into the task log by two [`LogReader`]s.
/// [`kill`](Self::kill) and [`is_alive`](Self::is_alive) may be called from any thread.
#[derive(Debug)]
pub struct ManagedProcess {
    info: Arc<TaskInfo>,
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    state: Mutex<ProcessState>,
}

impl ManagedProcess {
    /// Creates a process from an argument vector (`argv[0]` is the executable).
    pub fn new(
        name: impl Into<String>,
        argv: &[String],
        cwd: Option<&Path>,
    ) -> Result<Self, TaskError> {
        let (program, args) = argv.split_first().ok_or(TaskError::EmptyCommand)?;
        Ok(Self {
            info: Arc::new(TaskInfo::new(name)),
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.map(|p| dunce::simplified(p).to_path_buf()),
            state: Mutex::new(ProcessState::Pending),
        })
    }

    /// Creates a process from a raw command line, split with shell quoting rules.
    pub fn from_command(command_line: &str) -> Result<Self, TaskError> {
        let parts = split_command(command_line)?;
        Self::new(command_line.trim(), &parts, None)
    }

    /// Sends the captured output to `sink` instead of an in-memory buffer.
    pub fn with_log(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.info = Arc::new(TaskInfo::with_sink(self.info.name(), sink));
        self
    }

    /// Sets the directory the process will start in.
    pub fn with_cwd(mut self, cwd: Option<&Path>) -> Self {
        self.cwd = cwd.map(|p| dunce::simplified(p).to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn task_info(&self) -> &Arc<TaskInfo> {
        &self.info
    }

    fn lock_state(&self) -> MutexGuard<'_, ProcessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while the OS process is running.
    pub fn is_alive(&self) -> bool {
        let mut state = self.lock_state();
        let ProcessState::Running(child) = &mut *state else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                *state = ProcessState::Exited(status);
                false
            }
            Err(e) => {
                log::warn!("Could not query process '{}': {}", self.info.name(), e);
                false
            }
        }
    }

    /// Exit code of a finished process.
    pub fn exit_code(&self) -> Option<i32> {
        match &*self.lock_state() {
            ProcessState::Exited(status) => status.code(),
            _ => None,
        }
    }

    /// Force-stops the process. A task killed before it starts never spawns.
    pub fn kill(&self) -> Result<(), TaskError> {
        let mut state = self.lock_state();
        match &mut *state {
            ProcessState::Running(child) => {
                log::debug!(
                    "Killing process '{}' (PID: {})...",
                    self.info.name(),
                    child.id()
                );
                if let Err(e) = child.kill() {
                    // The process may have exited on its own in the meantime.
                    log::debug!("Kill of '{}' failed: {}", self.info.name(), e);
                }
                child.wait().map_err(|e| TaskError::Wait {
                    name: self.info.name().to_string(),
                    source: e,
                })?;
                *state = ProcessState::Killed;
            }
            ProcessState::Pending => *state = ProcessState::Killed,
            ProcessState::Exited(_) | ProcessState::Killed | ProcessState::Failed => {}
        }
        Ok(())
    }

    fn spawn(&self) -> Result<Vec<LogReader>, TaskError> {
        let mut state = self.lock_state();
        if !matches!(*state, ProcessState::Pending) {
            return Err(TaskError::Killed(self.info.name().to_string()));
        }

        let mut command = StdCommand::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                *state = ProcessState::Failed;
                return Err(TaskError::Spawn {
                    command: self.info.name().to_string(),
                    source: e,
                });
            }
        };
        log::debug!(
            "Started '{}' (PID: {}, task {})",
            self.info.name(),
            child.id(),
            self.info.id()
        );

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            match LogReader::spawn("stdout", stdout, self.info.clone()) {
                Ok(reader) => readers.push(reader),
                Err(e) => log::warn!("No stdout capture for '{}': {}", self.info.name(), e),
            }
        }
        if let Some(stderr) = child.stderr.take() {
            match LogReader::spawn("stderr", stderr, self.info.clone()) {
                Ok(reader) => readers.push(reader),
                Err(e) => log::warn!("No stderr capture for '{}': {}", self.info.name(), e),
            }
        }
        *state = ProcessState::Running(child);
        Ok(readers)
    }

    /// Polls until the process leaves the running state.
    fn supervise(&self) -> Result<(), TaskError> {
        loop {
            {
                let mut state = self.lock_state();
                match &mut *state {
                    ProcessState::Running(child) => match child.try_wait() {
                        Ok(Some(status)) => *state = ProcessState::Exited(status),
                        Ok(None) => {}
                        Err(e) => {
                            return Err(TaskError::Wait {
                                name: self.info.name().to_string(),
                                source: e,
                            });
                        }
                    },
                    ProcessState::Exited(status) => {
                        if status.success() {
                            return Ok(());
                        }
                        return Err(TaskError::NonZeroExit {
                            name: self.info.name().to_string(),
                            code: status.code(),
                        });
                    }
                    ProcessState::Killed => {
                        return Err(TaskError::Killed(self.info.name().to_string()));
                    }
                    ProcessState::Pending | ProcessState::Failed => return Ok(()),
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Task for ManagedProcess {
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn run(&self) -> Result<(), TaskError> {
        self.info.mark_started();
        let readers = self.spawn()?;
        let outcome = self.supervise();
        for reader in readers {
            reader.join_timeout(LOG_DRAIN_TIMEOUT);
        }
        log::debug!(
            "Process '{}' finished after {}s: {:?}",
            self.info.name(),
            self.info.elapsed_seconds().unwrap_or(0),
            outcome.as_ref().err()
        );
        outcome
    }
}

/// Splits a command line into an argument vector with shell quoting rules.
pub fn split_command(command_line: &str) -> Result<Vec<String>, TaskError> {
    let trimmed = command_line.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyCommand);
    }
    shlex::split(trimmed).ok_or_else(|| TaskError::CommandParse(trimmed.to_string()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn captured(process: &ManagedProcess) -> String {
        format!("{:?}", process.log())
    }

    #[test]
    fn test_from_command_splits_with_quotes() {
        let process = ManagedProcess::from_command("java -cp \".:a b.jar\" Main").unwrap();
        assert_eq!(process.program(), "java");
        assert_eq!(process.args(), &["-cp", ".:a b.jar", "Main"]);
        assert!(matches!(
            ManagedProcess::from_command("   "),
            Err(TaskError::EmptyCommand)
        ));
        assert!(matches!(
            ManagedProcess::from_command("echo \"unterminated"),
            Err(TaskError::CommandParse(_))
        ));
    }

    #[test]
    fn test_run_captures_stdout_and_stderr() {
        let process = ManagedProcess::from_command("sh -c 'echo out; echo err 1>&2'").unwrap();
        process.run().unwrap();

        let log = captured(&process);
        assert!(log.contains("0: out"));
        assert!(log.contains("0: err"));
        assert_eq!(process.exit_code(), Some(0));
        assert!(!process.is_alive());
    }

    #[test]
    fn test_non_zero_exit_is_reported() {
        let process = ManagedProcess::from_command("sh -c 'exit 3'").unwrap();
        let err = process.run().unwrap_err();
        assert!(matches!(err, TaskError::NonZeroExit { code: Some(3), .. }));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let process = ManagedProcess::from_command("definitely-not-a-real-binary-xyz").unwrap();
        assert!(matches!(process.run(), Err(TaskError::Spawn { .. })));
        assert!(!process.is_alive());
    }

    #[test]
    fn test_kill_from_another_thread_ends_run() {
        let process = Arc::new(ManagedProcess::from_command("sleep 30").unwrap());
        let runner = {
            let process = process.clone();
            thread::spawn(move || process.run())
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while !process.is_alive() {
            assert!(Instant::now() < deadline, "process never started");
            thread::sleep(Duration::from_millis(10));
        }

        let killed_at = Instant::now();
        process.kill().unwrap();
        assert!(!process.is_alive());
        let result = runner.join().unwrap();
        assert!(matches!(result, Err(TaskError::Killed(_))));
        assert!(killed_at.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_kill_before_run_prevents_spawn() {
        let process = ManagedProcess::from_command("sleep 30").unwrap();
        process.kill().unwrap();
        let started = Instant::now();
        assert!(matches!(process.run(), Err(TaskError::Killed(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_working_directory_is_honoured() {
        let dir = tempfile::TempDir::new().unwrap();
        let argv = vec!["pwd".to_string()];
        let process = ManagedProcess::new("pwd", &argv, Some(dir.path())).unwrap();
        process.run().unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        let log = captured(&process);
        assert!(
            log.contains(expected.to_str().unwrap()) || log.contains(dir.path().to_str().unwrap()),
            "log was {log}"
        );
    }
}

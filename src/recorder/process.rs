use super::command::RecorderInvocation;
use crate::error::{JscrError, Result};
use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

/// How a recorder process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Handle to a running (or finished) recorder
pub trait RecorderProcess: Send {
    /// OS process id captured at spawn time
    fn id(&self) -> Option<u32>;

    /// Non-blocking exit poll
    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>>;

    /// Ask the recorder to finish its current segment and quit
    fn interrupt(&mut self) -> Result<()>;
}

/// Starts recorder processes
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, invocation: &RecorderInvocation) -> io::Result<Box<dyn RecorderProcess>>;
}

/// Launches real OS processes.
///
/// Children are reaped by the Tokio runtime, so launching outside one is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, invocation: &RecorderInvocation) -> io::Result<Box<dyn RecorderProcess>> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(io::Error::other(format!(
                "cannot launch {} outside a Tokio runtime",
                invocation.program
            )));
        }

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&invocation.log_path)?;
        writeln!(
            log,
            "==== {} starting {} ====",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            invocation.program
        )?;
        let stderr = log.try_clone()?;

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr))
            .spawn()?;

        let pid = child.id();
        debug!("Spawned {} with pid {:?}", invocation.program, pid);

        Ok(Box::new(SystemProcess {
            child,
            pid,
            exit: None,
        }))
    }
}

struct SystemProcess {
    child: Child,
    pid: Option<u32>,
    exit: Option<ProcessExit>,
}

impl RecorderProcess for SystemProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>> {
        if let Some(exit) = self.exit {
            return Ok(Some(exit));
        }
        let exit = self.child.try_wait()?.map(ProcessExit::from);
        self.exit = exit;
        Ok(exit)
    }

    fn interrupt(&mut self) -> Result<()> {
        // A reaped pid may already belong to someone else
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        let Some(pid) = self.pid else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
            if rc != 0 {
                return Err(JscrError::Signal {
                    pid,
                    source: io::Error::last_os_error(),
                });
            }
        }

        #[cfg(not(unix))]
        {
            self.child
                .start_kill()
                .map_err(|source| JscrError::Signal { pid, source })?;
        }

        Ok(())
    }
}

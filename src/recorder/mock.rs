use super::command::RecorderInvocation;
use super::process::{ProcessExit, ProcessLauncher, RecorderProcess};
use crate::error::Result;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Observable state of one fake recorder
#[derive(Debug)]
pub struct MockProcessState {
    pid: u32,
    running: AtomicBool,
    poll_fails: AtomicBool,
    interrupts: AtomicU32,
    exit_on_interrupt: bool,
}

impl MockProcessState {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn interrupts(&self) -> u32 {
        self.interrupts.load(Ordering::SeqCst)
    }

    /// Simulate the recorder dying on its own
    pub fn exit(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Make every later status poll return an error
    pub fn fail_polls(&self) {
        self.poll_fails.store(true, Ordering::SeqCst);
    }
}

struct MockProcess {
    state: Arc<MockProcessState>,
}

impl RecorderProcess for MockProcess {
    fn id(&self) -> Option<u32> {
        Some(self.state.pid)
    }

    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>> {
        if self.state.poll_fails.load(Ordering::SeqCst) {
            return Err(io::Error::other("wait failed"));
        }
        if self.state.is_running() {
            Ok(None)
        } else {
            Ok(Some(ProcessExit {
                code: Some(0),
                signal: None,
            }))
        }
    }

    fn interrupt(&mut self) -> Result<()> {
        self.state.interrupts.fetch_add(1, Ordering::SeqCst);
        if self.state.exit_on_interrupt {
            self.state.exit();
        }
        Ok(())
    }
}

#[derive(Default)]
struct LauncherState {
    invocations: Vec<RecorderInvocation>,
    processes: Vec<Arc<MockProcessState>>,
    pending_failures: usize,
}

/// Launcher that records invocations and hands out fake processes
pub struct MockLauncher {
    state: Mutex<LauncherState>,
    next_pid: AtomicU32,
    exit_on_interrupt: bool,
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLauncher {
    /// Fake recorders quit as soon as they are interrupted
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LauncherState::default()),
            next_pid: AtomicU32::new(1000),
            exit_on_interrupt: true,
        }
    }

    /// Fake recorders keep running after an interrupt
    pub fn lingering() -> Self {
        Self {
            exit_on_interrupt: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, LauncherState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `count` launches fail with `NotFound`
    pub fn fail_next(&self, count: usize) {
        self.lock().pending_failures = count;
    }

    pub fn spawn_count(&self) -> usize {
        self.lock().processes.len()
    }

    pub fn invocations(&self) -> Vec<RecorderInvocation> {
        self.lock().invocations.clone()
    }

    pub fn process(&self, index: usize) -> Option<Arc<MockProcessState>> {
        self.lock().processes.get(index).cloned()
    }

    pub fn last_process(&self) -> Option<Arc<MockProcessState>> {
        self.lock().processes.last().cloned()
    }
}

impl ProcessLauncher for MockLauncher {
    fn launch(&self, invocation: &RecorderInvocation) -> io::Result<Box<dyn RecorderProcess>> {
        let mut state = self.lock();
        state.invocations.push(invocation.clone());

        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: not found", invocation.program),
            ));
        }

        let process = Arc::new(MockProcessState {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            running: AtomicBool::new(true),
            poll_fails: AtomicBool::new(false),
            interrupts: AtomicU32::new(0),
            exit_on_interrupt: self.exit_on_interrupt,
        });
        debug!("Mock recorder {} launched", process.pid);
        state.processes.push(Arc::clone(&process));

        Ok(Box::new(MockProcess { state: process }))
    }
}

pub mod command;
pub mod mock;
pub mod process;
pub mod supervisor;


pub use command::{RecorderCommand, RecorderInvocation};
pub use mock::{MockLauncher, MockProcessState};
pub use process::{ProcessExit, ProcessLauncher, RecorderProcess, SystemLauncher};
pub use supervisor::{EnsureOutcome, RecorderState, RecorderStats, RecorderStatus, RecorderSupervisor};

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod recorder;
pub mod recovery;
pub mod scheduler;

pub use app::{JscrOrchestrator, ShutdownReason, StatusReport, TickReport};
pub use camera::{CameraSettings, CameraSpec};
pub use config::JscrConfig;
pub use error::{JscrError, Result};
pub use recorder::{
    EnsureOutcome, MockLauncher, ProcessLauncher, RecorderState, RecorderStatus,
    RecorderSupervisor, SystemLauncher,
};
pub use recovery::{RecoveryAction, RecoveryConfig, RestartTracker};
pub use scheduler::{JobAction, JobScheduler, Schedule};

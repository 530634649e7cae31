use super::{JscrOrchestrator, ShutdownReason};
use crate::error::Result;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

impl JscrOrchestrator {
    /// Run the supervision loop until a signal or cancellation arrives.
    ///
    /// Recorders are left running on the way out; a stop signal arriving
    /// mid-segment has been seen to corrupt the file being written.
    pub async fn run(&mut self) -> Result<i32> {
        info!(
            "Supervising {} recorder(s), tick every {:?}",
            self.supervisors.len(),
            self.tick_interval
        );

        let (shutdown_sender, mut shutdown_receiver) = oneshot::channel();
        self.setup_signal_handlers(shutdown_sender);

        let token = self.cancellation_token.clone();
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;
                reason = &mut shutdown_receiver => {
                    break reason.unwrap_or(ShutdownReason::UserRequest);
                }
                _ = token.cancelled() => break ShutdownReason::UserRequest,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        };

        info!("Shutdown initiated: {:?}", reason);
        self.cancellation_token.cancel();
        let running = self
            .supervisors
            .iter_mut()
            .map(|supervisor| supervisor.is_recording())
            .filter(|recording| *recording)
            .count();
        info!("Exiting without stopping {} active recorder(s)", running);

        Ok(0)
    }

    /// Set up signal handlers for shutdown
    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            let token = self.cancellation_token.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                tokio::select! {
                    _ = token.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                            let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                        }
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        let token = self.cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                Ok(()) = signal::ctrl_c() => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                    }
                }
            }
        });
    }
}

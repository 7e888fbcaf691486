use super::{CamflowOrchestrator, ShutdownReason};
use crate::error::{CamflowError, Result};
use crate::events::{CameraEvent, EventFilter, EventReceiver};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

type SharedShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl CamflowOrchestrator {
    /// Run until a signal or a shutdown request arrives, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("camflow is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| CamflowError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| CamflowError::system("Shutdown receiver already taken"))?;

        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(&shutdown_sender);
        self.watch_shutdown_requests(&shutdown_sender);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| CamflowError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated by {}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("camflow shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, shutdown_sender: &SharedShutdownSender) {
        // SIGTERM - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(shutdown_sender);
            tokio::spawn(async move {
                let terminate = signal::unix::SignalKind::terminate();
                let mut sigterm = match signal::unix::signal(terminate) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if let Some(()) = sigterm.recv().await {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        // SIGINT (Ctrl+C)
        let shutdown_sender_sigint = Arc::clone(shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }

    /// Turn `ShutdownRequested` events on the bus into a shutdown
    fn watch_shutdown_requests(&self, shutdown_sender: &SharedShutdownSender) {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "shutdown".to_string(),
        );
        let shutdown_sender = Arc::clone(shutdown_sender);
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancellation_token.cancelled() => {}
                event = receiver.recv() => {
                    if let Ok(CameraEvent::ShutdownRequested { reason, .. }) = event {
                        info!("Shutdown requested: {}", reason);
                        if let Some(sender) = shutdown_sender.lock().await.take() {
                            let _ = sender.send(ShutdownReason::UserRequest);
                        }
                    }
                }
            }
        });
    }
}

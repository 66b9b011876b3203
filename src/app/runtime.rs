use super::{ScannerAgent, ShutdownReason};
use crate::error::{AgentError, EventBusError, Result};
use crate::events::{AgentEvent, EventFilter, EventReceiver};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

type ShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl ScannerAgent {
    /// Run the event loop until a signal or a quit request
    pub async fn run(&mut self) -> Result<i32> {
        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| AgentError::system("Shutdown sender already taken"))?;

        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| AgentError::system("Shutdown receiver already taken"))?;

        let mut events = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::All,
            "agent".to_string(),
        );

        self.initialize().await?;
        self.start().await?;

        info!("Scanner agent is running");

        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(Arc::clone(&shutdown_sender));

        let shutdown_reason = loop {
            tokio::select! {
                reason = &mut shutdown_receiver => {
                    break reason.map_err(|_| AgentError::system("Shutdown channel closed unexpectedly"))?;
                }
                event = events.recv() => match event {
                    Ok(AgentEvent::ShutdownRequested { reason, .. }) => {
                        debug!("Shutdown requested: {}", reason);
                        break ShutdownReason::UserRequest;
                    }
                    Ok(event) => self.handle_event(&event).await,
                    Err(EventBusError::ChannelClosed) => {
                        break ShutdownReason::Error("Event bus closed".to_string());
                    }
                    Err(e) => warn!("Event loop: {}", e),
                },
            }
        };

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let mut exit_code = self.shutdown().await?;
        if matches!(shutdown_reason, ShutdownReason::Error(_)) {
            exit_code = 1;
        }

        info!("Scanner agent shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: ShutdownSender) {
        // SIGTERM (service manager stop), Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::spawn(async move {
                        if sigterm.recv().await.is_some() {
                            info!("Received SIGTERM signal");
                            send_shutdown(
                                &shutdown_sender_sigterm,
                                ShutdownReason::Signal("SIGTERM".to_string()),
                            )
                            .await;
                        }
                    });
                }
                Err(e) => warn!("Failed to register SIGTERM handler: {}", e),
            }
        }

        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                send_shutdown(
                    &shutdown_sender_sigint,
                    ShutdownReason::Signal("SIGINT".to_string()),
                )
                .await;
            }
        });
    }
}

async fn send_shutdown(sender: &ShutdownSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().await.take() {
        let _ = sender.send(reason);
    }
}

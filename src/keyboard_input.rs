use crate::error::Result;
use crate::events::{AgentEvent, EventBus, UserAction};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press asks the agent to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Action(UserAction),
    Quit,
}

/// Key bindings: c/space capture, p pause, r resume, q/Esc quit
pub fn command_for_key(code: KeyCode) -> Option<KeyCommand> {
    match code {
        KeyCode::Char(' ') | KeyCode::Char('c') | KeyCode::Enter => {
            Some(KeyCommand::Action(UserAction::Trigger))
        }
        KeyCode::Char('p') => Some(KeyCommand::Action(UserAction::Pause)),
        KeyCode::Char('r') => Some(KeyCommand::Action(UserAction::Resume)),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyCommand::Quit),
        _ => None,
    }
}

/// Terminal stand-in for the capture button and the host's
/// foreground/background notifications
pub struct KeyboardInputHandler {
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - SPACE/c capture, p pause, r resume, q quit");

        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            while !cancellation_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        match command_for_key(key_event.code) {
                            Some(KeyCommand::Action(action)) => {
                                debug!("Key {:?} mapped to {:?}", key_event.code, action);
                                publish(
                                    &event_bus,
                                    AgentEvent::UserAction {
                                        action,
                                        timestamp: SystemTime::now(),
                                    },
                                );
                            }
                            Some(KeyCommand::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                publish(
                                    &event_bus,
                                    AgentEvent::ShutdownRequested {
                                        timestamp: SystemTime::now(),
                                        reason: "User requested via keyboard".to_string(),
                                    },
                                );
                                break;
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the blocking task one poll interval to restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

fn publish(event_bus: &EventBus, event: AgentEvent) {
    if let Err(e) = event_bus.publish(event) {
        warn!("Failed to publish keyboard event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyboard_handler_creation() {
        let event_bus = Arc::new(EventBus::new(100));
        let handler = KeyboardInputHandler::new(event_bus);

        assert!(!handler.cancellation_token.is_cancelled());
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let event_bus = Arc::new(EventBus::new(100));
        let handler = KeyboardInputHandler::new(event_bus);

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            command_for_key(KeyCode::Char(' ')),
            Some(KeyCommand::Action(UserAction::Trigger))
        );
        assert_eq!(
            command_for_key(KeyCode::Char('c')),
            Some(KeyCommand::Action(UserAction::Trigger))
        );
        assert_eq!(
            command_for_key(KeyCode::Char('p')),
            Some(KeyCommand::Action(UserAction::Pause))
        );
        assert_eq!(
            command_for_key(KeyCode::Char('r')),
            Some(KeyCommand::Action(UserAction::Resume))
        );
        assert_eq!(command_for_key(KeyCode::Esc), Some(KeyCommand::Quit));
        assert_eq!(command_for_key(KeyCode::Char('x')), None);
    }
}

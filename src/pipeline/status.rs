use std::sync::Arc;
use tokio::sync::watch;

pub const IDLE: &str = "Idle";
pub const CHECKING: &str = "Checking if data exists...";
pub const COMPLETED: &str = "Data scraping completed.";

/// Process-wide pipeline status
///
/// Readers never block the pipeline; observers that want every transition
/// can [`subscribe`](Self::subscribe).
#[derive(Debug, Clone)]
pub struct StatusHandle {
    sender: Arc<watch::Sender<String>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(IDLE.to_string());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publishes a new status and logs it
    pub fn set(&self, status: impl Into<String>) {
        let status = status.into();
        tracing::info!("{}", status);
        self.sender.send_replace(status);
    }

    pub fn get(&self) -> String {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::notify::{NotificationSink, NotifyError, VerificationEmail};

/// Keeps every email it is asked to send. Can be told to fail.
#[derive(Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<VerificationEmail>>,
    failing: Mutex<bool>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<VerificationEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn last_link(&self) -> Option<String> {
        self.sent.lock().await.last().map(|e| e.link.clone())
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<(), NotifyError> {
        if *self.failing.lock().await {
            return Err(NotifyError::Transport("recording sink set to fail".to_string()));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

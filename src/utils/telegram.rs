use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tokio::task::JoinHandle;
use tracing::warn;

// Telegram clears a chat action after about five seconds.
const CHAT_ACTION_INTERVAL: Duration = Duration::from_secs(4);

/// Keeps "sending photo..." visible while a headshot is generated.
/// The heartbeat stops when the value is dropped.
pub struct UploadPhotoIndicator {
    task_handle: Option<JoinHandle<()>>,
}

impl UploadPhotoIndicator {
    pub fn start(bot: Bot, chat_id: ChatId) -> Self {
        let task_handle = tokio::spawn(async move {
            loop {
                if let Err(err) = bot.send_chat_action(chat_id, ChatAction::UploadPhoto).await {
                    warn!("send_chat_action failed for chat {}: {err}", chat_id);
                }
                tokio::time::sleep(CHAT_ACTION_INTERVAL).await;
            }
        });

        Self {
            task_handle: Some(task_handle),
        }
    }
}

impl Drop for UploadPhotoIndicator {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }
}

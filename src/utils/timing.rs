use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use teloxide::types::{ChatId, Message};
use tracing::info;

/// Timing events go to their own log files; see `utils::logging`.
pub const TIMING_TARGET: &str = "headshot.timing";

/// Measures one user interaction from receipt to the final reply.
#[derive(Debug)]
pub struct CommandTimer {
    command: &'static str,
    chat_id: i64,
    user_id: Option<i64>,
    message_id: Option<i32>,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: &'static str,
    detail: Option<String>,
    completed: bool,
}

impl CommandTimer {
    pub fn new(
        command: &'static str,
        chat_id: ChatId,
        user_id: Option<i64>,
        message_id: Option<i32>,
    ) -> Self {
        CommandTimer {
            command,
            chat_id: chat_id.0,
            user_id,
            message_id,
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: "success",
            detail: None,
            completed: false,
        }
    }

    pub fn from_message(command: &'static str, message: &Message) -> Self {
        let user_id = message
            .from
            .as_ref()
            .and_then(|user| i64::try_from(user.id.0).ok());
        Self::new(command, message.chat.id, user_id, Some(message.id.0))
    }

    pub fn log_received(&self) {
        info!(
            target: TIMING_TARGET,
            event = "command_received",
            command = self.command,
            chat_id = self.chat_id,
            user_id = ?self.user_id,
            message_id = ?self.message_id,
            received_at = %self.started_at.to_rfc3339(),
        );
    }

    pub fn mark_status(&mut self, status: &'static str, detail: Option<String>) {
        self.status = status;
        self.detail = detail;
    }

    /// Emits the completion event; later calls are no-ops.
    pub fn log_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        info!(
            target: TIMING_TARGET,
            event = "command_completed",
            command = self.command,
            chat_id = self.chat_id,
            user_id = ?self.user_id,
            message_id = ?self.message_id,
            started_at = %self.started_at.to_rfc3339(),
            completed_at = %Utc::now().to_rfc3339(),
            duration_s = self.started_perf.elapsed().as_secs_f64(),
            status = self.status,
            detail = self.detail.as_deref().unwrap_or(""),
        );
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        self.log_completed();
    }
}

pub fn start_command_timer(command: &'static str, message: &Message) -> CommandTimer {
    let timer = CommandTimer::from_message(command, message);
    timer.log_received();
    timer
}

pub fn complete_command_timer(
    timer: &mut CommandTimer,
    status: &'static str,
    detail: Option<String>,
) {
    timer.mark_status(status, detail);
    timer.log_completed();
}

/// Wraps one model call with request/response timing events.
pub async fn log_model_timing<T, E, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, E>
where
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let metadata = metadata.unwrap_or_else(|| JsonValue::Object(Default::default()));
    let started_perf = Instant::now();
    info!(
        target: TIMING_TARGET,
        event = "model_request",
        provider,
        model,
        operation,
        started_at = %Utc::now().to_rfc3339(),
        metadata = %metadata,
    );

    let result = call().await;
    let (status, detail) = match &result {
        Ok(_) => ("success", String::new()),
        Err(err) => ("error", err.to_string()),
    };

    info!(
        target: TIMING_TARGET,
        event = "model_response",
        provider,
        model,
        operation,
        completed_at = %Utc::now().to_rfc3339(),
        duration_s = started_perf.elapsed().as_secs_f64(),
        status,
        detail = %detail,
        metadata = %metadata,
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn model_timing_passes_result_through() {
        let ok: Result<u8, String> =
            log_model_timing("test", "model", "op", None, || async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u8, String> = log_model_timing(
            "test",
            "model",
            "op",
            Some(serde_json::json!({ "k": 1 })),
            || async { Err("boom".to_string()) },
        )
        .await;
        assert_eq!(err, Err("boom".to_string()));
    }

    #[test]
    fn timer_completes_once() {
        let mut timer = CommandTimer::new("transform", ChatId(1), Some(2), None);
        complete_command_timer(&mut timer, "error", Some("busy".to_string()));
        assert!(timer.completed);
        assert_eq!(timer.status, "error");
        timer.log_completed();
        assert!(timer.completed);
    }
}

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode, ReplyParameters};
use tracing::{debug, info, warn};

use crate::handlers::views::{
    build_configure_keyboard, configure_text, failure_text, result_caption, status_text,
    welcome_text, NO_PHOTO_TEXT, PROCESSING_TEXT,
};
use crate::headshot::{BackgroundStyle, SessionError, SuitStyle, TransformOutcome};
use crate::llm::gemini::GENERIC_FAILURE_MESSAGE;
use crate::state::AppState;
use crate::utils::telegram::UploadPhotoIndicator;
use crate::utils::timing::{complete_command_timer, start_command_timer, CommandTimer};

pub async fn start_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(message.chat.id, welcome_text())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    start_handler(bot, message).await
}

/// Sends the preview/configure screen for the chat's session.
pub async fn send_configure_screen(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
) -> Result<()> {
    let session = state.sessions.snapshot(&chat_id);
    let mut request = bot
        .send_message(chat_id, configure_text(session.state()))
        .parse_mode(ParseMode::Html)
        .reply_markup(build_configure_keyboard(session.state()));
    if let Some(message_id) = reply_to {
        request = request.reply_parameters(ReplyParameters::new(message_id));
    }
    request.await?;
    Ok(())
}

pub async fn transform_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let mut timer = start_command_timer("transform", &message);
    let result = run_transform(&bot, &state, message.chat.id, &mut timer).await;
    if let Err(err) = &result {
        complete_command_timer(&mut timer, "error", Some(err.to_string()));
    }
    result
}

/// Runs one headshot transform for `chat_id` and renders the outcome.
pub async fn run_transform(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    timer: &mut CommandTimer,
) -> Result<()> {
    let request = match state
        .sessions
        .with_session(&chat_id, |session| session.begin_transform())
    {
        Ok(Some(request)) => request,
        Ok(None) => {
            complete_command_timer(timer, "skipped", Some("no photo".to_string()));
            bot.send_message(chat_id, NO_PHOTO_TEXT).await?;
            return Ok(());
        }
        Err(err) => {
            complete_command_timer(timer, "busy", None);
            bot.send_message(chat_id, err.to_string()).await?;
            return Ok(());
        }
    };

    info!(
        chat_id = chat_id.0,
        suit = %request.suit_style,
        background = %request.background_style,
        "Starting headshot transform"
    );

    // The session is already processing; every path below must reach run_transform.
    let processing_message = match bot.send_message(chat_id, PROCESSING_TEXT).await {
        Ok(message) => Some(message),
        Err(err) => {
            warn!("Failed to send processing message to {}: {err}", chat_id);
            None
        }
    };

    let outcome = {
        let _indicator = UploadPhotoIndicator::start(bot.clone(), chat_id);
        state
            .sessions
            .run_transform(&chat_id, &request, state.transformer.as_ref())
            .await
    };

    if let Some(message) = &processing_message {
        let _ = bot.delete_message(chat_id, message.id).await;
    }

    match outcome {
        TransformOutcome::Completed(image) => match image.decode() {
            Ok(bytes) => {
                let session = state.sessions.snapshot(&chat_id);
                let file_name = format!("headshot.{}", image.file_extension());
                bot.send_photo(chat_id, InputFile::memory(bytes).file_name(file_name))
                    .caption(result_caption(
                        request.suit_style,
                        request.background_style,
                        &state.model_name,
                    ))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(build_configure_keyboard(session.state()))
                    .await?;
                complete_command_timer(timer, "success", None);
            }
            Err(err) => {
                warn!("Generated image for {} could not be decoded: {err}", chat_id);
                complete_command_timer(timer, "error", Some(err.to_string()));
                send_failure(bot, state, chat_id, GENERIC_FAILURE_MESSAGE).await?;
            }
        },
        TransformOutcome::Failed(message) => {
            complete_command_timer(timer, "error", Some(message.clone()));
            send_failure(bot, state, chat_id, &message).await?;
        }
        TransformOutcome::Skipped => {
            complete_command_timer(timer, "skipped", None);
        }
    }

    Ok(())
}

async fn send_failure(bot: &Bot, state: &AppState, chat_id: ChatId, message: &str) -> Result<()> {
    let session = state.sessions.snapshot(&chat_id);
    bot.send_message(chat_id, failure_text(message))
        .parse_mode(ParseMode::Html)
        .reply_markup(build_configure_keyboard(session.state()))
        .await?;
    Ok(())
}

pub async fn reset_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let chat_id = message.chat.id;
    match reset_session(&state, chat_id) {
        Ok(()) => {
            bot.send_message(
                chat_id,
                "Your photo has been discarded. Send a new photo whenever you are ready.",
            )
            .await?;
        }
        Err(err) => {
            bot.send_message(chat_id, err.to_string()).await?;
        }
    }
    Ok(())
}

pub fn reset_session(state: &AppState, chat_id: ChatId) -> Result<(), SessionError> {
    state.sessions.reset_and_prune(&chat_id)?;
    debug!(chat_id = chat_id.0, active_sessions = state.sessions.len(), "Session reset");
    Ok(())
}

fn optional_arg(arg: &str) -> Option<&str> {
    let trimmed = arg.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub async fn suit_handler(bot: Bot, state: AppState, message: Message, arg: String) -> Result<()> {
    let chat_id = message.chat.id;
    if let Some(key) = optional_arg(&arg) {
        let style = match key.parse::<SuitStyle>() {
            Ok(style) => style,
            Err(err) => {
                bot.send_message(chat_id, err.to_string()).await?;
                return Ok(());
            }
        };
        if let Err(err) = state
            .sessions
            .with_session(&chat_id, |session| session.set_suit_style(style))
        {
            bot.send_message(chat_id, err.to_string()).await?;
            return Ok(());
        }
    }
    send_configure_screen(&bot, &state, chat_id, Some(message.id)).await
}

pub async fn background_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: String,
) -> Result<()> {
    let chat_id = message.chat.id;
    if let Some(key) = optional_arg(&arg) {
        let style = match key.parse::<BackgroundStyle>() {
            Ok(style) => style,
            Err(err) => {
                bot.send_message(chat_id, err.to_string()).await?;
                return Ok(());
            }
        };
        if let Err(err) = state
            .sessions
            .with_session(&chat_id, |session| session.set_background_style(style))
        {
            bot.send_message(chat_id, err.to_string()).await?;
            return Ok(());
        }
    }
    send_configure_screen(&bot, &state, chat_id, Some(message.id)).await
}

pub async fn status_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let session = state.sessions.snapshot(&message.chat.id);
    bot.send_message(message.chat.id, status_text(&session))
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::headshot::ImagePayload;
    use crate::llm::{ImageTransformer, TransformError};

    struct Unused;

    #[async_trait]
    impl ImageTransformer for Unused {
        async fn transform(
            &self,
            _original: &ImagePayload,
            _prompt: &str,
        ) -> Result<ImagePayload, TransformError> {
            Err(TransformError::NoImage)
        }
    }

    fn app_state() -> AppState {
        AppState::new(Arc::new(Unused), "test-model", 1024)
    }

    #[test]
    fn reset_drops_default_sessions_and_keeps_custom_styles() {
        let state = app_state();
        let plain = ChatId(1);
        let styled = ChatId(2);
        state.sessions.with_session(&plain, |session| {
            session.upload(ImagePayload::new("image/png", "QQ==")).unwrap()
        });
        state.sessions.with_session(&styled, |session| {
            session.set_suit_style(SuitStyle::NavyBlue).unwrap()
        });

        reset_session(&state, plain).unwrap();
        reset_session(&state, styled).unwrap();

        assert_eq!(state.sessions.len(), 1);
        assert_eq!(
            state.sessions.snapshot(&styled).state().suit_style(),
            SuitStyle::NavyBlue
        );
    }

    #[test]
    fn reset_is_refused_while_generating() {
        let state = app_state();
        let chat = ChatId(3);
        state.sessions.with_session(&chat, |session| {
            session.upload(ImagePayload::new("image/png", "QQ==")).unwrap();
            session.begin_transform().unwrap();
        });

        assert_eq!(reset_session(&state, chat), Err(SessionError::Busy));
        assert!(state.sessions.snapshot(&chat).state().original_image().is_some());
    }

    #[test]
    fn blank_arguments_are_treated_as_missing() {
        assert_eq!(optional_arg("   "), None);
        assert_eq!(optional_arg(" navy-blue "), Some("navy-blue"));
    }
}

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

use crate::handlers::commands::{reset_session, run_transform};
use crate::handlers::views::{build_configure_keyboard, configure_text, CallbackAction};
use crate::state::AppState;
use crate::utils::timing::CommandTimer;

/// Handles taps on the configure keyboard.
pub async fn configure_callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let action = query.data.as_deref().and_then(CallbackAction::parse);
    let (Some(action), Some(message)) = (action, query.message.as_ref()) else {
        let _ = bot.answer_callback_query(query.id.clone()).await;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let result = match action {
        CallbackAction::Suit(style) => state
            .sessions
            .with_session(&chat_id, |session| session.set_suit_style(style)),
        CallbackAction::Background(style) => state
            .sessions
            .with_session(&chat_id, |session| session.set_background_style(style)),
        CallbackAction::Reset => reset_session(&state, chat_id),
        CallbackAction::Transform => {
            let _ = bot.answer_callback_query(query.id.clone()).await;
            let user_id = i64::try_from(query.from.id.0).ok();
            let mut timer = CommandTimer::new("transform_button", chat_id, user_id, None);
            timer.log_received();
            return run_transform(&bot, &state, chat_id, &mut timer).await;
        }
    };

    if let Err(err) = result {
        let _ = bot
            .answer_callback_query(query.id.clone())
            .text(err.to_string())
            .await;
        return Ok(());
    }
    let _ = bot.answer_callback_query(query.id.clone()).await;

    if action == CallbackAction::Reset {
        bot.send_message(
            chat_id,
            "Your photo has been discarded. Send a new photo whenever you are ready.",
        )
        .await?;
        return Ok(());
    }

    let session = state.sessions.snapshot(&chat_id);
    let keyboard = build_configure_keyboard(session.state());
    let edited = bot
        .edit_message_text(chat_id, message_id, configure_text(session.state()))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard.clone())
        .await;
    if let Err(err) = edited {
        // Result photos carry the keyboard on a caption, not on text.
        debug!("edit_message_text failed ({err}); updating keyboard only");
        if let Err(err) = bot
            .edit_message_reply_markup(chat_id, message_id)
            .reply_markup(keyboard)
            .await
        {
            debug!("edit_message_reply_markup failed: {err}");
        }
    }
    Ok(())
}

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::headshot::session::SessionState;
use crate::headshot::{BackgroundStyle, HeadshotSession, Screen, SuitStyle};
use crate::utils::telegram::escape_html;

pub const SUIT_CALLBACK_PREFIX: &str = "suit:";
pub const BACKGROUND_CALLBACK_PREFIX: &str = "bg:";
pub const ACTION_CALLBACK_PREFIX: &str = "act:";
const ACTION_TRANSFORM: &str = "transform";
const ACTION_RESET: &str = "reset";

pub const HEADER: &str = "📸 <b>Headshot Studio</b>\nTurn a casual photo into a professional studio headshot.";
pub const FOOTER: &str = "<i>Photos are kept in memory for this chat only and are discarded on /reset or restart.</i>";
pub const PROCESSING_TEXT: &str = "Generating your professional headshot. This can take up to a minute...";
pub const NO_PHOTO_TEXT: &str = "Please send a photo first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Suit(SuitStyle),
    Background(BackgroundStyle),
    Transform,
    Reset,
}

impl CallbackAction {
    pub fn callback_data(self) -> String {
        match self {
            CallbackAction::Suit(style) => format!("{SUIT_CALLBACK_PREFIX}{}", style.key()),
            CallbackAction::Background(style) => {
                format!("{BACKGROUND_CALLBACK_PREFIX}{}", style.key())
            }
            CallbackAction::Transform => format!("{ACTION_CALLBACK_PREFIX}{ACTION_TRANSFORM}"),
            CallbackAction::Reset => format!("{ACTION_CALLBACK_PREFIX}{ACTION_RESET}"),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        if let Some(key) = data.strip_prefix(SUIT_CALLBACK_PREFIX) {
            return key.parse().ok().map(CallbackAction::Suit);
        }
        if let Some(key) = data.strip_prefix(BACKGROUND_CALLBACK_PREFIX) {
            return key.parse().ok().map(CallbackAction::Background);
        }
        match data.strip_prefix(ACTION_CALLBACK_PREFIX)? {
            ACTION_TRANSFORM => Some(CallbackAction::Transform),
            ACTION_RESET => Some(CallbackAction::Reset),
            _ => None,
        }
    }
}

fn option_label(label: &str, selected: bool) -> String {
    if selected {
        format!("✅ {label}")
    } else {
        label.to_string()
    }
}

pub fn suit_keyboard_rows(selected: SuitStyle) -> Vec<Vec<InlineKeyboardButton>> {
    let buttons = SuitStyle::ALL
        .iter()
        .map(|style| {
            InlineKeyboardButton::callback(
                option_label(style.label(), *style == selected),
                CallbackAction::Suit(*style).callback_data(),
            )
        })
        .collect::<Vec<_>>();
    buttons.chunks(2).map(|chunk| chunk.to_vec()).collect()
}

pub fn background_keyboard_rows(selected: BackgroundStyle) -> Vec<Vec<InlineKeyboardButton>> {
    let buttons = BackgroundStyle::ALL
        .iter()
        .map(|style| {
            InlineKeyboardButton::callback(
                option_label(style.label(), *style == selected),
                CallbackAction::Background(*style).callback_data(),
            )
        })
        .collect::<Vec<_>>();
    buttons.chunks(2).map(|chunk| chunk.to_vec()).collect()
}

/// Style pickers plus the generate and start-over actions.
pub fn build_configure_keyboard(state: &SessionState) -> InlineKeyboardMarkup {
    let mut rows = suit_keyboard_rows(state.suit_style());
    rows.extend(background_keyboard_rows(state.background_style()));
    rows.push(vec![
        InlineKeyboardButton::callback(
            "✨ Generate headshot",
            CallbackAction::Transform.callback_data(),
        ),
        InlineKeyboardButton::callback("↩️ Start over", CallbackAction::Reset.callback_data()),
    ]);
    InlineKeyboardMarkup::new(rows)
}

pub fn welcome_text() -> String {
    format!(
        "{HEADER}\n\n\
         1. Send a clear, front-facing photo of yourself.\n\
         2. Pick a suit and a background.\n\
         3. Tap <b>Generate headshot</b>.\n\n\
         Commands:\n\
         /suit &lt;style&gt; - choose the suit ({suits})\n\
         /background &lt;style&gt; - choose the background ({backgrounds})\n\
         /transform - generate the headshot\n\
         /status - show the current selection\n\
         /reset - discard the photo and start over\n\n\
         {FOOTER}",
        suits = SuitStyle::ALL.map(|s| s.key()).join(", "),
        backgrounds = BackgroundStyle::ALL.map(|s| s.key()).join(", "),
    )
}

pub fn configure_text(state: &SessionState) -> String {
    let intro = if state.original_image().is_some() {
        "Photo received. Choose your look:"
    } else {
        "Send a photo to get started. Your look so far:"
    };
    let mut text = format!(
        "{intro}\n\n\
         👔 Suit: <b>{}</b>\n\
         🖼 Background: <b>{}</b>",
        state.suit_style().label(),
        state.background_style().label()
    );
    if let Some(error) = state.error_message() {
        text.push_str(&format!("\n\n⚠️ {}", escape_html(error)));
    } else if state.result_image().is_some() {
        text.push_str("\n\nStyles changed? Tap <b>Generate headshot</b> again to apply them.");
    }
    text
}

pub fn result_caption(suit: SuitStyle, background: BackgroundStyle, model: &str) -> String {
    format!(
        "Your professional headshot is ready.\n👔 {} · 🖼 {}\n<i>Generated with {}</i>",
        suit.label(),
        background.label(),
        escape_html(model)
    )
}

pub fn failure_text(message: &str) -> String {
    format!(
        "⚠️ {}\n\nYour photo is still here, adjust the styles or tap <b>Generate headshot</b> to retry.",
        escape_html(message)
    )
}

pub fn status_text(session: &HeadshotSession) -> String {
    let state = session.state();
    let screen = match session.screen() {
        Screen::Empty => "waiting for a photo",
        Screen::Configuring => "photo uploaded",
        Screen::Processing => "generating",
    };
    let mut text = format!(
        "Status: <b>{}</b>\n👔 Suit: {} (<code>{}</code>)\n🖼 Background: {} (<code>{}</code>)\nResult: {}",
        screen,
        state.suit_style().label(),
        state.suit_style().key(),
        state.background_style().label(),
        state.background_style().key(),
        if state.result_image().is_some() { "ready" } else { "none" }
    );
    if let Some(error) = state.error_message() {
        text.push_str(&format!("\nLast error: {}", escape_html(error)));
    }
    text
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::headshot::ImagePayload;

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("unexpected button kind {other:?}"),
        }
    }

    #[test]
    fn callback_data_round_trips_through_parse() {
        let actions = SuitStyle::ALL
            .map(CallbackAction::Suit)
            .into_iter()
            .chain(BackgroundStyle::ALL.map(CallbackAction::Background))
            .chain([CallbackAction::Transform, CallbackAction::Reset]);
        for action in actions {
            let data = action.callback_data();
            assert!(data.len() <= 64, "{data} exceeds Telegram callback limit");
            assert_eq!(CallbackAction::parse(&data), Some(action));
        }
    }

    #[test]
    fn unknown_callback_data_is_ignored() {
        assert_eq!(CallbackAction::parse("suit:tuxedo"), None);
        assert_eq!(CallbackAction::parse("act:delete"), None);
        assert_eq!(CallbackAction::parse("image_res:2K"), None);
    }

    #[test]
    fn keyboard_marks_current_selection() {
        let mut session = HeadshotSession::new();
        session.set_suit_style(SuitStyle::FormalGray).unwrap();
        let keyboard = build_configure_keyboard(session.state());

        // 2 suit rows, 2 background rows, 1 action row
        assert_eq!(keyboard.inline_keyboard.len(), 5);
        let selected: Vec<_> = keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter(|button| button.text.starts_with('✅'))
            .map(|button| callback_data(button).to_string())
            .collect();
        assert_eq!(selected, vec!["suit:formal-gray", "bg:light-gray"]);
        let actions = &keyboard.inline_keyboard[4];
        assert_eq!(callback_data(&actions[0]), "act:transform");
        assert_eq!(callback_data(&actions[1]), "act:reset");
    }

    #[test]
    fn configure_text_shows_error_inline() {
        let mut session = HeadshotSession::new();
        session
            .upload(ImagePayload::new("image/png", "QQ=="))
            .unwrap();
        session.begin_transform().unwrap();
        session.finish_transform(Err(crate::llm::TransformError::Request(
            "quota <exceeded>".to_string(),
        )));
        let text = configure_text(session.state());
        assert!(text.contains("⚠️ quota &lt;exceeded&gt;"));
    }

    #[test]
    fn welcome_lists_every_style_key() {
        let text = welcome_text();
        for style in SuitStyle::ALL {
            assert!(text.contains(style.key()));
        }
        for style in BackgroundStyle::ALL {
            assert!(text.contains(style.key()));
        }
    }

    #[test]
    fn status_reports_screen_and_styles() {
        let session = HeadshotSession::new();
        let text = status_text(&session);
        assert!(text.contains("waiting for a photo"));
        assert!(text.contains("<code>modern-black</code>"));
        assert!(text.contains("Result: none"));
    }
}

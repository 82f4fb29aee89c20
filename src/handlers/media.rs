use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{FileId, ReplyParameters};
use tracing::{info, warn};

use crate::handlers::commands::send_configure_screen;
use crate::headshot::{validate_image, ImagePayload, SessionError};
use crate::llm::media::{download_media, is_image_mime};
use crate::state::AppState;
use crate::utils::timing::{complete_command_timer, start_command_timer};

/// The uploadable image attached to a message, if any.
#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub file_id: FileId,
    pub size: u32,
    pub mime_hint: Option<String>,
}

pub fn find_uploaded_photo(message: &Message) -> Option<UploadedPhoto> {
    if let Some(photo_sizes) = message.photo() {
        // Telegram lists sizes smallest first.
        let largest = photo_sizes.last()?;
        return Some(UploadedPhoto {
            file_id: largest.file.id.clone(),
            size: largest.file.size,
            mime_hint: Some("image/jpeg".to_string()),
        });
    }

    let document = message.document()?;
    let mime = document
        .mime_type
        .as_ref()
        .map(|mime| mime.essence_str().to_string());
    let name_is_image = document
        .file_name
        .as_ref()
        .map(|name| {
            let lower = name.to_ascii_lowercase();
            lower.ends_with(".png")
                || lower.ends_with(".jpg")
                || lower.ends_with(".jpeg")
                || lower.ends_with(".webp")
        })
        .unwrap_or(false);
    let mime_is_image = mime.as_deref().map(is_image_mime).unwrap_or(false);
    if !mime_is_image && !name_is_image {
        return None;
    }

    Some(UploadedPhoto {
        file_id: document.file.id.clone(),
        size: document.file.size,
        mime_hint: mime.filter(|value| is_image_mime(value)),
    })
}

pub fn message_has_photo(message: &Message) -> bool {
    find_uploaded_photo(message).is_some()
}

async fn get_file_url(bot: &Bot, file_id: &FileId) -> Result<String> {
    let file = bot.get_file(file_id.clone()).await?;
    Ok(format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    ))
}

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

/// Human-readable upload limit, rounded up so it never reads as zero.
fn upload_limit_text(bytes: usize) -> String {
    if bytes < MIB {
        format!("{} KB", bytes.div_ceil(KIB).max(1))
    } else if bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

async fn reply_text(bot: &Bot, message: &Message, text: &str) -> Result<()> {
    bot.send_message(message.chat.id, text)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(())
}

/// Upload intent: turns an incoming photo into the session's original image.
pub async fn upload_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(photo) = find_uploaded_photo(&message) else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let mut timer = start_command_timer("upload", &message);

    if photo.size as usize > state.max_upload_bytes {
        complete_command_timer(&mut timer, "rejected", Some(format!("size={}", photo.size)));
        reply_text(
            &bot,
            &message,
            &format!(
                "That photo is too large. Please send one under {}.",
                upload_limit_text(state.max_upload_bytes)
            ),
        )
        .await?;
        return Ok(());
    }

    if state.sessions.snapshot(&chat_id).state().is_processing() {
        complete_command_timer(&mut timer, "busy", None);
        reply_text(&bot, &message, &SessionError::Busy.to_string()).await?;
        return Ok(());
    }

    let url = get_file_url(&bot, &photo.file_id).await?;
    let bytes = match download_media(&url, "telegram upload").await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Upload download failed for chat {}: {err}", chat_id);
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
            reply_text(&bot, &message, "I couldn't download that photo. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if let Err(err) = validate_image(&bytes) {
        warn!("Rejected upload for chat {}: {err}", chat_id);
        complete_command_timer(&mut timer, "rejected", Some(err.to_string()));
        reply_text(
            &bot,
            &message,
            "That file doesn't look like a photo I can use. Please send a PNG, JPEG or WebP image.",
        )
        .await?;
        return Ok(());
    }

    let payload = ImagePayload::from_bytes(&bytes, photo.mime_hint.as_deref());
    info!(
        chat_id = chat_id.0,
        mime_type = %payload.mime_type,
        bytes = bytes.len(),
        "Photo uploaded"
    );
    if let Err(err) = state
        .sessions
        .with_session(&chat_id, |session| session.upload(payload))
    {
        complete_command_timer(&mut timer, "busy", None);
        reply_text(&bot, &message, &err.to_string()).await?;
        return Ok(());
    }

    complete_command_timer(&mut timer, "success", None);
    send_configure_screen(&bot, &state, chat_id, Some(message.id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_limit_below_one_megabyte_is_shown_in_kilobytes() {
        assert_eq!(upload_limit_text(512 * 1024), "512 KB");
        assert_eq!(upload_limit_text(1000), "1 KB");
        assert_eq!(upload_limit_text(0), "1 KB");
    }

    #[test]
    fn upload_limit_in_megabytes() {
        assert_eq!(upload_limit_text(20 * 1024 * 1024), "20 MB");
        assert_eq!(upload_limit_text(1024 * 1024 + 512 * 1024), "1.5 MB");
    }
}

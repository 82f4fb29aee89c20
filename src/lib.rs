//! Telegram bot that turns a user's photo into a professional studio headshot
//! with a Gemini image model.

pub mod config;
pub mod handlers;
pub mod headshot;
pub mod llm;
pub mod state;
pub mod utils;

pub mod callbacks;
pub mod commands;
pub mod media;
pub mod views;

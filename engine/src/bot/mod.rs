//! Chat adapter
//!
//! Turns chat messages into snippet requests and responses back into chat
//! text.

pub mod parse;
pub mod render;
pub mod telegram;

pub use telegram::TelegramBot;

//! Communication channels (Telegram).
//!
//! Channel trait and Telegram connector so the relay can receive updates and
//! send replies. Inbound messages are forwarded to the dispatcher's queue.

mod inbound;
mod outbound;
mod telegram;

pub use inbound::InboundMessage;
pub use outbound::ChannelHandle;
pub use telegram::{TelegramChannel, TelegramUpdate};

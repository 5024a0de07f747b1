//! Parley core library — config, Telegram channel, NLU client, and the
//! dispatch pipeline used by the CLI.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod init;
pub mod nlu;
pub mod reply;
pub mod session;

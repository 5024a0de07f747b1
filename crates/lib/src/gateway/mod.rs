//! Relay runtime: HTTP surface (health, Telegram webhook) and channel wiring.

mod server;

pub use server::run_relay;

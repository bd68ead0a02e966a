// Messaging Gateway - Core
//
// This crate exposes one messaging account's connection over HTTP: status,
// pairing code, outbound messages and operator restarts.
// Architecture follows domain-driven design; the chat-network session sits
// behind the kernel's transport traits.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;

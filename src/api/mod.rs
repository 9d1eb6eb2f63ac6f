// Front-end surface: command routing and engine bootstrap.

pub mod bootstrap;
pub mod commands;

pub use bootstrap::{init_tracing, RelayEngine};
pub use commands::{Command, CommandRouter};

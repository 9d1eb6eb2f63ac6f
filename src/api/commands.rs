use std::sync::Arc;

use tracing::debug;

use crate::engine::coordinator::{HandleOutcome, RequestCoordinator};

/// Prefix of a document request, e.g. `/pdf_101-A`.
pub const FETCH_PREFIX: &str = "/pdf_";

pub const START_TEXT: &str = "Hello! I'm your document bot. Use /help to see available commands.";
pub const INFO_TEXT: &str =
    "I fetch documents from the shared file store and send them to you here.";
pub const HELP_TEXT: &str = "/start - Start the bot\n\
/help - Show this help message\n\
/info - Get information about the bot\n\
/pdf_<Room_No-Bed_No> - Get a specific document (e.g., /pdf_101-A)";
pub const UNKNOWN_TEXT: &str =
    "Sorry, I didn't understand that command. Type /help to see available commands.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Info,
    Fetch(String),
    Unknown,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/info" => Command::Info,
            _ => match text.strip_prefix(FETCH_PREFIX) {
                Some(name) if !name.trim().is_empty() => Command::Fetch(name.trim().to_string()),
                _ => Command::Unknown,
            },
        }
    }
}

/// Routes chat text to canned replies or to the request coordinator.
#[derive(Clone)]
pub struct CommandRouter {
    coordinator: Arc<RequestCoordinator>,
}

impl CommandRouter {
    pub fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Returns the coordinator outcome for document requests, `None` otherwise.
    pub async fn route(&self, destination: i64, text: &str) -> Option<HandleOutcome> {
        let command = Command::parse(text);
        debug!("chat {} command {:?}", destination, command);

        let reply = match command {
            Command::Fetch(name) => {
                return Some(self.coordinator.handle(destination, &name).await);
            }
            Command::Start => START_TEXT,
            Command::Help => HELP_TEXT,
            Command::Info => INFO_TEXT,
            Command::Unknown => UNKNOWN_TEXT,
        };
        self.coordinator.dispatcher().enqueue(destination, reply);
        None
    }
}

use std::fmt;

/// User-facing texts emitted by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Downloading { name: String },
    Progress(u8),
    AttemptFailed(String),
    RetriesExhausted,
    AuthFailed,
    NotFound { name: String },
    TransferFailed,
    Delivered,
    DeliveryFailed(String),
    Internal,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Downloading { name } => write!(f, "Downloading {}. Please wait...", name),
            Notice::Progress(pct) => write!(f, "Download progress: {}%", pct),
            Notice::AttemptFailed(err) => write!(f, "Error occurred: {}", err),
            Notice::RetriesExhausted => f.write_str("Max retries reached. Please try again later."),
            Notice::AuthFailed => f.write_str("Authentication failed! Please try again later."),
            Notice::NotFound { name } => write!(f, "Sorry, no document found for '{}'.", name),
            Notice::TransferFailed => f.write_str("Failed to download the document."),
            Notice::Delivered => f.write_str("Document sent successfully!"),
            Notice::DeliveryFailed(err) => write!(f, "Error sending document: {}", err),
            Notice::Internal => f.write_str("An error occurred while processing your request."),
        }
    }
}

/// Caption attached to a delivered document.
pub fn document_caption(name: &str) -> String {
    format!("Here is your document: {}", name)
}

// Notification channel: text and document delivery to chat users.

pub mod bot_api;
pub mod traits;

pub use bot_api::BotApiChannel;
pub use traits::NotificationChannel;

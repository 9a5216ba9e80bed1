pub mod router;
pub mod service;
pub mod webhook;

pub use router::{parse_command, CommandRouter, NOT_INSTALLED_NOTE, PAUSED_NOTE};
pub use service::BotService;
pub use webhook::WebhookClient;

use reddit_client::ContentSource;
use registry::InstallRegistry;
use snoobot_core::{BotResponse, BotSettings, ErrorExt, Install};
use std::sync::Arc;
use tracing::{debug, info};

pub const NOT_INSTALLED_NOTE: &str = "This group has not installed the bot.";
pub const PAUSED_NOTE: &str = "The bot is paused for this group.";

/// Splits a message into the trigger and its optional argument.
///
/// Returns `None` when the first word is not the trigger. The trigger matches
/// exactly or case-insensitively; only the first argument word is used.
pub fn parse_command(text: &str, trigger: &str) -> Option<Option<String>> {
    let mut words = text.split_whitespace();
    let head = words.next()?;
    if head != trigger && !head.eq_ignore_ascii_case(trigger) {
        return None;
    }
    Some(words.next().map(normalize_parameter).filter(|p| !p.is_empty()))
}

/// Accepts `rust`, `r/rust` and `/r/rust` alike.
fn normalize_parameter(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('/');
    let stripped = trimmed
        .strip_prefix("r/")
        .or_else(|| trimmed.strip_prefix("R/"))
        .unwrap_or(trimmed);
    stripped.trim_end_matches('/').to_string()
}

/// Turns inbound chat messages into replies.
pub struct CommandRouter {
    registry: Arc<InstallRegistry>,
    source: Arc<dyn ContentSource>,
    settings: BotSettings,
}

impl CommandRouter {
    pub fn new(
        registry: Arc<InstallRegistry>,
        source: Arc<dyn ContentSource>,
        settings: BotSettings,
    ) -> Self {
        Self {
            registry,
            source,
            settings,
        }
    }

    /// Handles one message. Every failure becomes a reply, never an error.
    pub async fn handle_message(&self, token: &str, text: &str) -> BotResponse {
        let install = match self.active_install(token).await {
            Ok(install) => install,
            Err(response) => return response,
        };

        let Some(explicit) = parse_command(text, &self.settings.trigger) else {
            debug!("Ignoring non-command message for {}", token);
            return BotResponse::ignored();
        };

        let text = self.render(&install, explicit.as_deref()).await;
        BotResponse::message(text)
    }

    /// The install for `token`, or the terminal reply when it is absent or paused.
    pub async fn active_install(&self, token: &str) -> Result<Install, BotResponse> {
        match self.registry.get(token).await {
            None => {
                info!("Message for unknown install {}", token);
                Err(BotResponse::rejected(NOT_INSTALLED_NOTE))
            }
            Some(install) if install.is_paused => {
                debug!("Install {} is paused", token);
                Err(BotResponse::rejected(PAUSED_NOTE))
            }
            Some(install) => Ok(install),
        }
    }

    /// Explicit argument, then the install's config, then the default.
    ///
    /// Configured values are normalized like typed arguments, so `r/kotlin`
    /// in the install config means `kotlin`.
    pub fn resolve_parameter(&self, install: &Install, explicit: Option<&str>) -> String {
        if let Some(explicit) = explicit {
            return explicit.to_string();
        }
        install
            .config_value(&self.settings.parameter_key)
            .map(|value| normalize_parameter(value.trim()))
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.settings.default_parameter.clone())
    }

    /// Fetches for the resolved parameter and returns the text to send.
    pub async fn render(&self, install: &Install, explicit: Option<&str>) -> String {
        let parameter = self.resolve_parameter(install, explicit);
        info!("Fetching r/{} for group {}", parameter, install.group_id);

        let outcome = self.source.fetch(&parameter).await;
        if let Some(error) = outcome.to_error(&parameter) {
            error.log_warn();
        }
        outcome.into_message(&parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snoobot_core::ConfigEntry;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/reddit", "/reddit"), Some(None));
        assert_eq!(
            parse_command("  /reddit   rust  extra", "/reddit"),
            Some(Some("rust".to_string()))
        );
        assert_eq!(
            parse_command("/REDDIT Rust", "/reddit"),
            Some(Some("Rust".to_string()))
        );
        assert_eq!(parse_command("hello /reddit", "/reddit"), None);
        assert_eq!(parse_command("/redditor", "/reddit"), None);
        assert_eq!(parse_command("   ", "/reddit"), None);
    }

    #[test]
    fn test_parameter_normalization() {
        assert_eq!(
            parse_command("/reddit r/rust", "/reddit"),
            Some(Some("rust".to_string()))
        );
        assert_eq!(
            parse_command("/reddit /r/kotlin/", "/reddit"),
            Some(Some("kotlin".to_string()))
        );
        assert_eq!(parse_command("/reddit r/", "/reddit"), Some(None));
    }

    fn install_with(value: &str) -> Install {
        Install {
            token: "tok".to_string(),
            group_id: "g".to_string(),
            group_name: "Group".to_string(),
            webhook: "https://chat.example.com/hook".to_string(),
            config: vec![ConfigEntry::new("subreddit", value)],
            is_paused: false,
        }
    }

    struct Unused;

    #[async_trait::async_trait]
    impl ContentSource for Unused {
        async fn fetch(&self, _parameter: &str) -> snoobot_core::FetchOutcome {
            snoobot_core::FetchOutcome::NotFound
        }
    }

    #[test]
    fn test_configured_parameter_is_normalized() {
        let router = CommandRouter::new(
            Arc::new(InstallRegistry::in_memory()),
            Arc::new(Unused),
            BotSettings::default(),
        );

        assert_eq!(router.resolve_parameter(&install_with("r/kotlin"), None), "kotlin");
        assert_eq!(router.resolve_parameter(&install_with(" /r/scala/ "), None), "scala");
        assert_eq!(router.resolve_parameter(&install_with("r/"), None), "programming");
        assert_eq!(
            router.resolve_parameter(&install_with("r/kotlin"), Some("java")),
            "java"
        );
    }
}

use crate::router::CommandRouter;
use crate::webhook::WebhookClient;
use reddit_client::{ContentSource, RedditApiClient};
use registry::InstallRegistry;
use snoobot_core::{
    BotConfig, BotResponse, BotSettings, ConfigEntry, CoreError, Install, InstallRequest,
};
use std::sync::Arc;
use tracing::info;
use url::Url;
use uuid::Uuid;

/// Inbound operations of the bot protocol, independent of any HTTP framing.
pub struct BotService {
    registry: Arc<InstallRegistry>,
    router: CommandRouter,
    webhook: WebhookClient,
}

impl BotService {
    pub fn new(
        registry: Arc<InstallRegistry>,
        source: Arc<dyn ContentSource>,
        settings: BotSettings,
        webhook: WebhookClient,
    ) -> Self {
        let router = CommandRouter::new(registry.clone(), source, settings);
        Self {
            registry,
            router,
            webhook,
        }
    }

    /// Wires the Reddit client and the on-disk registry described by `config`.
    pub async fn from_config(config: &BotConfig) -> Result<Self, CoreError> {
        let source = Arc::new(RedditApiClient::new(&config.reddit)?);
        let registry = Arc::new(InstallRegistry::open(&config.storage.state_path).await?);
        let webhook = WebhookClient::new(config.reddit.request_timeout())?;

        Ok(Self::new(registry, source, config.bot.clone(), webhook))
    }

    /// Registers a group and returns its freshly generated token.
    pub async fn install(&self, request: InstallRequest) -> Result<String, CoreError> {
        if !request.webhook.trim().is_empty() {
            Url::parse(request.webhook.trim()).map_err(|e| CoreError::InvalidInput {
                message: format!("webhook is not a valid URL: {}", e),
            })?;
        }

        let token = Uuid::new_v4().simple().to_string();
        self.registry.install(&token, request).await?;
        info!("Issued install token {}", token);
        Ok(token)
    }

    pub async fn reinstall(&self, token: &str, config: Vec<ConfigEntry>) -> bool {
        self.registry.reinstall(token, config).await
    }

    pub async fn uninstall(&self, token: &str) -> bool {
        self.registry.uninstall(token).await
    }

    pub async fn pause(&self, token: &str) -> bool {
        self.registry.pause(token).await
    }

    pub async fn resume(&self, token: &str) -> bool {
        self.registry.resume(token).await
    }

    pub async fn message(&self, token: &str, text: &str) -> BotResponse {
        self.router.handle_message(token, text).await
    }

    /// Fetches for the install and posts the result to its webhook.
    ///
    /// Absent or paused installs get the same terminal reply as a message
    /// would; only webhook delivery failures surface as errors.
    pub async fn push(
        &self,
        token: &str,
        parameter: Option<&str>,
    ) -> Result<BotResponse, CoreError> {
        let install = match self.router.active_install(token).await {
            Ok(install) => install,
            Err(response) => return Ok(response),
        };

        let text = self.router.render(&install, parameter).await;
        self.webhook.deliver(&install.webhook, &text).await?;
        Ok(BotResponse::message(text))
    }

    pub async fn get(&self, token: &str) -> Option<Install> {
        self.registry.get(token).await
    }

    pub async fn list(&self) -> Vec<Install> {
        self.registry.list().await
    }
}

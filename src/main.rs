use anyhow::Context;
use bot_service::BotService;
use clap::{Parser, Subcommand};
use snoobot_core::{BotConfig, ConfigEntry, InstallRequest};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "snoobot", version, about = "Group chat bot that posts hot Reddit threads")]
struct Cli {
    /// TOML configuration file. Environment variables override its values.
    #[arg(long, env = "SNOOBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a group and print its token.
    Install {
        #[arg(long)]
        group_id: String,
        #[arg(long)]
        group_name: String,
        #[arg(long)]
        webhook: String,
        /// Repeatable `key=value` setting, e.g. `subreddit=rust`.
        #[arg(long = "set", value_parser = parse_entry)]
        config: Vec<ConfigEntry>,
    },
    /// Replace the settings of an existing install.
    Reinstall {
        token: String,
        #[arg(long = "set", value_parser = parse_entry)]
        config: Vec<ConfigEntry>,
    },
    Uninstall {
        token: String,
    },
    Pause {
        token: String,
    },
    Resume {
        token: String,
    },
    /// Deliver an inbound chat message and print the reply.
    Message {
        token: String,
        text: String,
    },
    /// Fetch and post to the group's webhook.
    Push {
        token: String,
        subreddit: Option<String>,
    },
    List,
}

fn parse_entry(raw: &str) -> Result<ConfigEntry, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok(ConfigEntry::new(key.trim(), value.trim()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("snoobot=info,reddit_client=info,registry=info,bot_service=info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(action: &str, token: &str, changed: bool) {
    if changed {
        println!("{} {}", action, token);
    } else {
        println!("no install for token {}", token);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config =
        BotConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let service = BotService::from_config(&config)
        .await
        .context("failed to start bot service")?;

    match cli.command {
        Command::Install {
            group_id,
            group_name,
            webhook,
            config,
        } => {
            let token = service
                .install(InstallRequest {
                    group_id,
                    group_name,
                    webhook,
                    config,
                })
                .await?;
            println!("{}", token);
        }
        Command::Reinstall { token, config } => {
            let changed = service.reinstall(&token, config).await;
            report("reinstalled", &token, changed);
        }
        Command::Uninstall { token } => {
            let changed = service.uninstall(&token).await;
            report("uninstalled", &token, changed);
        }
        Command::Pause { token } => {
            let changed = service.pause(&token).await;
            report("paused", &token, changed);
        }
        Command::Resume { token } => {
            let changed = service.resume(&token).await;
            report("resumed", &token, changed);
        }
        Command::Message { token, text } => {
            print_json(&service.message(&token, &text).await)?;
        }
        Command::Push { token, subreddit } => {
            let response = service.push(&token, subreddit.as_deref()).await?;
            print_json(&response)?;
        }
        Command::List => {
            print_json(&service.list().await)?;
        }
    }

    Ok(())
}

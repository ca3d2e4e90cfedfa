//! autoapply command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autoapply::http::{ClientConfig, RateLimiter, ResilientHttpClient};
use autoapply::platform::{ErrorValueDetector, PlatformGateway};
use autoapply::repository::{ApplicationLedger, DieselLedger};
use autoapply::services::BotService;
use autoapply::worker::{DispatcherStats, HarvestWorker, PassDispatcher};
use autoapply::{load_settings, SearchSettings, Settings};

#[derive(Parser)]
#[command(name = "autoapply")]
#[command(about = "Automatic job applications on HeadHunter", version)]
struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, global = true, env = "AUTOAPPLY_TARGET")]
    target: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and database
    Init,

    /// Print the authorization URL to open in a browser
    LoginUrl,

    /// Link a platform account using an authorization code
    Link {
        #[arg(long)]
        user: i64,
        /// Code from the OAuth redirect
        code: String,
    },

    /// Show or change search settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// List resumes of the linked account
    Resumes {
        #[arg(long)]
        user: i64,
    },

    /// Start or stop the bot
    Bot {
        #[command(subcommand)]
        command: BotCommand,
    },

    /// Run a single pass now
    Pass {
        #[arg(long)]
        user: i64,
    },

    /// Periodically run passes for every active user
    Run,

    /// Show recorded applications
    History {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show {
        #[arg(long)]
        user: i64,
    },
    Set {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        resume: String,
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "113")]
        area: String,
        #[arg(long)]
        salary: Option<i32>,
        #[arg(long, default_value = "RUR")]
        currency: String,
        /// Only postings published within this many days
        #[arg(long, default_value_t = 30)]
        period: i32,
        #[arg(long)]
        schedule: Option<String>,
        #[arg(long)]
        employment: Option<String>,
        #[arg(long, default_value = "publication_time")]
        order_by: String,
        #[arg(long)]
        cover_letter: Option<String>,
    },
}

#[derive(Subcommand)]
enum BotCommand {
    Start {
        #[arg(long)]
        user: i64,
    },
    Stop {
        #[arg(long)]
        user: i64,
    },
}

/// Everything a command needs, built from settings.
struct App {
    settings: Settings,
    gateway: PlatformGateway,
    ledger: Arc<dyn ApplicationLedger>,
}

impl App {
    async fn open(settings: Settings) -> Result<Self> {
        settings
            .ensure_directories()
            .with_context(|| format!("creating {}", settings.data_dir.display()))?;

        let ledger = DieselLedger::open(&settings.database_path())
            .await
            .context("opening database")?;

        let client = ResilientHttpClient::new(
            ClientConfig {
                base_url: settings.platform.api_base_url.clone(),
                user_agent: settings.user_agent.clone(),
                timeout: settings.request_timeout(),
                retry: settings.retry.clone(),
            },
            RateLimiter::with_config(settings.rate_limit.clone()),
        )
        .context("building HTTP client")?;
        let gateway = PlatformGateway::new(client, settings.platform.clone());

        Ok(Self {
            settings,
            gateway,
            ledger: Arc::new(ledger),
        })
    }

    fn worker(&self) -> HarvestWorker {
        HarvestWorker::new(
            self.gateway.clone(),
            self.ledger.clone(),
            Arc::new(ErrorValueDetector::default()),
            self.settings.harvest.clone(),
        )
    }

    fn dispatcher(&self) -> (PassDispatcher, tokio::task::JoinHandle<DispatcherStats>) {
        PassDispatcher::spawn(self.worker(), self.settings.max_concurrent_passes)
    }

    fn service(&self) -> BotService {
        BotService::new(self.gateway.clone(), self.ledger.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "autoapply=debug"
    } else {
        "autoapply=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut settings = load_settings().await;
    if let Some(target) = cli.target {
        settings.data_dir = target;
    }

    if matches!(cli.command, Commands::Link { .. } | Commands::LoginUrl)
        && !settings.platform.has_credentials()
    {
        bail!("HH_CLIENT_ID and HH_CLIENT_SECRET must be set");
    }

    let app = App::open(settings).await?;

    match cli.command {
        Commands::Init => {
            println!("Database ready at {}", app.settings.database_path().display());
        }
        Commands::LoginUrl => {
            println!("{}", app.service().login_url()?);
        }
        Commands::Link { user, code } => {
            let me = app.service().link_account(user, &code).await?;
            println!("Linked platform account {} to user {}", me.id, user);
        }
        Commands::Settings { command } => match command {
            SettingsCommand::Show { user } => match app.service().get_settings(user).await? {
                Some(settings) => println!("{}", serde_json::to_string_pretty(&settings)?),
                None => println!("No settings for user {}", user),
            },
            SettingsCommand::Set {
                user,
                resume,
                text,
                area,
                salary,
                currency,
                period,
                schedule,
                employment,
                order_by,
                cover_letter,
            } => {
                let settings = SearchSettings {
                    resume_id: resume,
                    search_text: text,
                    area_id: area,
                    salary,
                    currency,
                    period,
                    schedule,
                    employment,
                    order_by,
                    cover_letter,
                };
                let saved = app.service().upsert_settings(user, &settings).await?;
                println!("{}", serde_json::to_string_pretty(&saved)?);
            }
        },
        Commands::Resumes { user } => {
            for resume in app.service().list_resumes(user).await? {
                println!("{}\t{}", resume.id, resume.title.unwrap_or_default());
            }
        }
        Commands::Bot { command } => {
            let (dispatcher, handle) = app.dispatcher();
            let service = app.service().with_dispatcher(dispatcher);
            let state = match command {
                BotCommand::Start { user } => service.set_bot_state(user, true).await?,
                BotCommand::Stop { user } => service.set_bot_state(user, false).await?,
            };
            println!("Bot {}", state.as_str());

            // Let the triggered pass finish before exiting.
            drop(service);
            handle.await?;
        }
        Commands::Pass { user } => {
            let summary = app.worker().run_pass(user).await;
            println!(
                "{:?}: {} applied, {} already applied, {} skipped, {} failed over {} page(s)",
                summary.end,
                summary.applied,
                summary.already_applied,
                summary.skipped,
                summary.failed,
                summary.pages
            );
        }
        Commands::Run => run_scheduler(&app).await?,
        Commands::History { user, limit } => {
            for record in app.service().history(user).await?.into_iter().take(limit) {
                println!(
                    "{}\t{}\t{}",
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    record.external_posting_id,
                    record.status
                );
            }
        }
    }

    Ok(())
}

/// Enqueue a pass for every active user on each tick until interrupted.
async fn run_scheduler(app: &App) -> Result<()> {
    let (dispatcher, handle) = app.dispatcher();
    let mut ticker = tokio::time::interval(app.settings.pass_interval());
    tracing::info!(
        interval_secs = app.settings.pass_interval_secs,
        "scheduler started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let users = app.ledger.active_users().await?;
                tracing::info!(users = users.len(), "scheduling passes");
                for user_id in users {
                    dispatcher.start_pass(user_id);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    drop(dispatcher);
    let stats = handle.await?;
    tracing::info!(
        started = stats.started,
        completed = stats.completed,
        skipped = stats.skipped,
        "scheduler stopped"
    );
    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use dealflow::catalog::JsonCatalogStore;
use dealflow::config::AppConfig;
use dealflow::credentials::{CredentialMonitor, TokenLifetime};
use dealflow::feed::{CoupangFeed, FeedSource};
use dealflow::notify::notifier_from_credentials;
use dealflow::observability::{self, LogFormat};
use dealflow::pipeline::{Collaborators, Orchestrator, RunSettings, Unavailable};
use dealflow::propagation::{HttpProbe, PropagationChecker};
use dealflow::publish::GitPublisher;
use dealflow::render::{CardFont, CardRenderer};
use dealflow::retention::{DirectoryPruner, RetentionPruner};
use dealflow::site::HtmlSiteGenerator;
use dealflow::social::{InstagramPublisher, SocialPublisher};

#[derive(Parser)]
#[command(
    name = "dealflow",
    version,
    about = "Daily deal pipeline: feed, cards, catalog, site and carousel"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Secrets file (JSON object of credential keys)
    #[arg(long, default_value = "secrets.json", global = true)]
    secrets: PathBuf,

    /// Optional settings file overriding the defaults
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily job
    Run,
    /// Remove card directories older than the retention window
    Prune {
        /// Days to keep (default: the configured retention)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Report how long the social access token has left
    CheckToken,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    observability::init(&cli.log_level, cli.log_format);

    let result = match AppConfig::load(&cli.secrets, cli.settings.as_deref()) {
        Ok(config) => execute(cli.command, config).await,
        Err(e) => Err(anyhow::Error::new(e).context("loading configuration")),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "dealflow failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: AppConfig) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Run => run(&config).await,
        Commands::Prune { days } => {
            let days = days.unwrap_or(config.settings.retention_days);
            let summary = DirectoryPruner::new(&config.settings.images_dir)
                .prune(days)
                .await
                .context("pruning card directories")?;
            info!(removed = summary.removed_count(), failed = summary.failed.len(), "Prune done");
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckToken => {
            let monitor = TokenLifetime::from_config(&config.credentials, &config.settings);
            let today = Local::now().date_naive();
            match monitor.check(today)? {
                Some(warning) => println!("{warning}"),
                None => match monitor.remaining_days(today)? {
                    Some(days) => println!("Token has {days} days left."),
                    None => println!("Token refresh date is not configured."),
                },
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let collaborators = build_collaborators(config)?;
    let outcome = Orchestrator::new(collaborators, RunSettings::from_config(config))
        .run()
        .await;
    Ok(ExitCode::from(outcome.exit_code()))
}

fn build_collaborators(config: &AppConfig) -> anyhow::Result<Collaborators> {
    let client = config.http_client().context("building HTTP client")?;
    let settings = &config.settings;
    let credentials = &config.credentials;

    let feed: Arc<dyn FeedSource> = match Unavailable::or_unavailable(
        CoupangFeed::from_credentials(client.clone(), credentials),
    ) {
        Ok(feed) => Arc::new(feed),
        Err(missing) => Arc::new(missing),
    };
    let social: Arc<dyn SocialPublisher> = match Unavailable::or_unavailable(
        InstagramPublisher::from_config(client.clone(), credentials, settings),
    ) {
        Ok(social) => Arc::new(social),
        Err(missing) => Arc::new(missing),
    };

    let font = CardFont::load_or_bundled(&settings.font_path).context("loading card font")?;
    let renderer = CardRenderer::new(client.clone(), &settings.images_dir, font)
        .with_carousel_size(settings.carousel_item_limit);

    Ok(Collaborators {
        feed,
        renderer: Arc::new(renderer),
        catalog: Arc::new(JsonCatalogStore::new(&settings.catalog_path)),
        site: Arc::new(HtmlSiteGenerator::new(&settings.site_dir)),
        publisher: Arc::new(GitPublisher::new(
            &settings.repo_dir,
            settings.git_remote.clone(),
            settings.git_branch.clone(),
        )),
        propagation: PropagationChecker::new(Arc::new(HttpProbe::new(client.clone()))),
        social,
        pruner: Arc::new(DirectoryPruner::new(&settings.images_dir)),
        credentials: Arc::new(TokenLifetime::from_config(credentials, settings)),
        notifier: Arc::from(notifier_from_credentials(client, credentials)),
    })
}

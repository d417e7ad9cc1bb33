use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use image_description_bot::api::{ApiServer, ApiState};
use image_description_bot::pipeline::format;
use image_description_bot::vision::MAX_CAPTIONS;
use image_description_bot::{
    ActivityRouter, BotConnector, Config, HttpImageFetcher, ImagePipeline, VisionClient,
    VisionService, VisualFeature,
};

/// Describe Bot - describes images sent in chat conversations
#[derive(Parser)]
#[command(name = "describe-bot", version, about)]
struct Cli {
    /// Port to listen on (overrides config file)
    #[arg(long, env = "BOT_PORT")]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long, env = "BOT_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration and print a summary
    CheckConfig,
    /// Describe a local image file and print the replies the bot would send
    Describe {
        /// Image file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,image_description_bot=info",
        1 => "info,image_description_bot=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    let http = reqwest::Client::builder()
        .timeout(config.pipeline.call_timeout)
        .build()?;
    let vision = Arc::new(VisionClient::new(
        http.clone(),
        config.vision.api_key.clone(),
        &config.vision.endpoint,
    )?);

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::CheckConfig => {
                check_config(&config);
                Ok(())
            }
            Command::Describe { path } => describe_file(vision.as_ref(), &path).await,
        };
    }

    let connector = BotConnector::new(http.clone(), config.bot.clone());
    if !connector.has_credentials() {
        tracing::warn!("no bot credentials configured; replies will be unauthenticated");
    }

    let fetcher = HttpImageFetcher::new(http).with_max_bytes(config.pipeline.max_image_bytes);
    let pipeline = ImagePipeline::new(vision.clone(), Arc::new(fetcher))
        .with_call_timeout(config.pipeline.call_timeout);

    let state = Arc::new(ApiState {
        router: ActivityRouter::new(Arc::new(pipeline)),
        authenticated: connector.has_credentials(),
        channel: Arc::new(connector),
        vision_endpoint: vision.endpoint().to_string(),
    });

    tracing::info!(
        port = config.server.port,
        vision_endpoint = %config.vision.endpoint,
        "starting describe bot"
    );

    ApiServer::new(state, config.server.port).run().await?;

    Ok(())
}

/// Print a configuration summary without secrets
fn check_config(config: &Config) {
    println!("Configuration OK");
    println!("  vision endpoint: {}", config.vision.endpoint);
    match &config.bot {
        Some(bot) => println!("  bot app id:      {} (tenant {})", bot.app_id, bot.tenant),
        None => println!("  bot app id:      <none, unauthenticated>"),
    }
    println!("  port:            {}", config.server.port);
    println!("  call timeout:    {:?}", config.pipeline.call_timeout);
    println!("  max image bytes: {}", config.pipeline.max_image_bytes);
}

/// Describe a local image file
async fn describe_file(vision: &dyn VisionService, path: &std::path::Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path).await?;
    println!("Describing {} ({} bytes)...\n", path.display(), bytes.len());

    let (description, analysis) = futures::try_join!(
        vision.describe(&bytes, MAX_CAPTIONS),
        vision.analyze(&bytes, &[VisualFeature::Categories, VisualFeature::Faces]),
    )?;

    println!("{}", format::captions_reply(&description));
    if let Some(faces) = format::faces_reply(&analysis) {
        println!("\n{faces}");
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "topicmark")]
#[command(about = "Find the first timestamp a YouTube video discusses a topic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service (POST /ask, GET / liveness).
    Serve(ServeCmd),
    /// Answer one question from the command line, without a server.
    Ask(AskCmd),
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor,
    /// Print version info.
    Version,
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    /// Address to bind.
    #[arg(long, env = "TOPICMARK_BIND", default_value = "0.0.0.0:8000")]
    bind: String,
}

#[derive(clap::Args, Debug)]
struct AskCmd {
    /// YouTube video URL.
    #[arg(long)]
    video_url: String,
    /// Topic phrase to locate.
    #[arg(long)]
    topic: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(cmd) => serve(cmd).await,
        Commands::Ask(cmd) => ask(cmd).await,
        Commands::Doctor => doctor(),
        Commands::Version => {
            println!("topicmark {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(cmd: ServeCmd) -> Result<()> {
    // Missing credentials are startup-fatal: refuse to serve rather than
    // answer every request with a 500.
    let state = topicmark::server::build_state()
        .context("refusing to serve: configuration incomplete")?;
    tracing::info!(
        bind = %cmd.bind,
        backend = state.backend.as_str(),
        "topicmark listening"
    );

    let listener = tokio::net::TcpListener::bind(&cmd.bind)
        .await
        .with_context(|| format!("bind {}", cmd.bind))?;
    axum::serve(listener, topicmark::server::router(state))
        .await
        .context("server stopped")?;
    Ok(())
}

async fn ask(cmd: AskCmd) -> Result<()> {
    let state = topicmark::server::build_state().context("configuration incomplete")?;
    let timestamp = topicmark::server::answer(&state, &cmd.video_url, &cmd.topic).await?;
    println!(
        "{}",
        serde_json::json!({
            "timestamp": timestamp,
            "video_url": cmd.video_url,
            "topic": cmd.topic,
        })
    );
    Ok(())
}

fn doctor() -> Result<()> {
    let report = serde_json::json!({
        "gemini_api_key_present": topicmark_local::gemini::api_key_from_env().is_some(),
        "gemini_model": topicmark_local::gemini::model_from_env(),
        "locator_backend": topicmark_local::LocatorBackend::from_env().as_str(),
        "transcript_languages": topicmark_local::transcript_api::languages_from_env(),
        "mirror_endpoints": topicmark_local::mirrors::mirror_endpoints_from_env(),
        "ytdlp_available": topicmark_local::media::ytdlp_available(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

//! CLI for tindergen - serve the gated generator, or run one generation locally.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tindergen::config::{DEFAULT_BIND, DEFAULT_MAX_UPLOAD_BYTES};
use tindergen::image::providers::{GeminiProviderFactory, DEFAULT_BASE_URL as GEMINI_BASE_URL};
use tindergen::mailing::DEFAULT_BASE_URL as MAILERLITE_BASE_URL;
use tindergen::{Credential, GenerationWorkflow, ImageFormat, ServerConfig, UploadedImage};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tindergen")]
#[command(about = "Email-gated profile photo generator (MailerLite + Gemini)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web app
    Serve(ServeArgs),

    /// Transform one local photo with a prompt, without the web form
    Generate(GenerateArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "TINDERGEN_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// MailerLite API token
    #[arg(long, env = "MAILERLITE_API_KEY", hide_env_values = true)]
    mailerlite_api_key: String,

    /// MailerLite group that new subscribers join
    #[arg(long, env = "MAILERLITE_GROUP_ID")]
    mailerlite_group_id: String,

    /// MailerLite API root
    #[arg(long, env = "MAILERLITE_BASE_URL", default_value = MAILERLITE_BASE_URL)]
    mailerlite_base_url: String,

    /// Gemini API root
    #[arg(long, env = "GEMINI_BASE_URL", default_value = GEMINI_BASE_URL)]
    gemini_base_url: String,

    /// Largest accepted upload in bytes
    #[arg(long, env = "TINDERGEN_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// Minutes of inactivity before a session is forgotten
    #[arg(long, env = "TINDERGEN_SESSION_TTL_MINUTES", default_value_t = 60)]
    session_ttl_minutes: u64,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the transformation
    prompt: String,

    /// Input photo (JPEG or PNG)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tindergen=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            serve(args).await?;
        }
        Commands::Generate(args) => {
            generate_image(args, cli.json).await?;
        }
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = ServerConfig::new(args.mailerlite_api_key, args.mailerlite_group_id);
    config.bind = args.bind;
    config.mailerlite_base_url = args.mailerlite_base_url;
    config.gemini_base_url = args.gemini_base_url;
    config.max_upload_bytes = args.max_upload_bytes;
    config.session_ttl = Duration::from_secs(args.session_ttl_minutes.saturating_mul(60));
    config.validate()?;

    tracing::info!(?config, "starting tindergen");
    tindergen::web::serve(config).await?;
    Ok(())
}

async fn generate_image(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    if let Some(ext) = args.output.extension().and_then(|e| e.to_str()) {
        if ImageFormat::from_extension(ext).is_none() {
            anyhow::bail!("unsupported output extension: .{ext}");
        }
    }

    let input_data = std::fs::read(&args.input)?;
    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let photo = UploadedImage::from_bytes(input_data, file_name)?;
    let credential = args.api_key.as_deref().and_then(Credential::new);

    let workflow = GenerationWorkflow::new(Arc::new(GeminiProviderFactory::new()));
    let image = workflow
        .generate(&args.prompt, Some(&photo), credential.as_ref())
        .await?;

    image.save(&args.output)?;

    if json_output {
        let result = serde_json::json!({
            "type": "image",
            "success": true,
            "output": args.output.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format.extension(),
            "provider": image.provider.to_string(),
            "model": image.metadata.model,
            "duration_ms": image.metadata.duration_ms,
            "image_parts": image.metadata.image_parts,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated image: {} ({} bytes) via {}",
            args.output.display(),
            image.size(),
            image.provider
        );
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
        if image.metadata.image_parts > 1 {
            println!(
                "Note: {} images returned, kept the first",
                image.metadata.image_parts
            );
        }
    }

    Ok(())
}

//! CLI for Veo Studio - Veo video generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veo_studio::config::{API_KEY_ENV, ENDPOINT_ENV};
use veo_studio::{
    load_handle, AspectRatio, CredentialIssue, GeneratedArtifact, GenerationRequest, ImageInput,
    ProviderConfig, Resolution, VeoModel, VeoStudio, VeoStudioError,
};

#[derive(Parser)]
#[command(name = "veo-studio")]
#[command(about = "Generate videos with Veo (text, frames, references or extension)")]
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
    /// Generate a video
    Generate(GenerateArgs),

    /// List available models
    Models,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the video
    #[arg(default_value = "")]
    prompt: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Generation mode
    #[arg(short, long, value_enum, default_value = "text")]
    mode: ModeArg,

    /// Model identifier
    #[arg(long, default_value = "veo-3.1-fast-generate-preview")]
    model: VeoModel,

    /// Aspect ratio
    #[arg(long, value_enum, default_value = "16:9")]
    aspect_ratio: AspectRatioArg,

    /// Output resolution
    #[arg(long, value_enum, default_value = "720p")]
    resolution: ResolutionArg,

    /// Video duration in seconds (legacy model only)
    #[arg(short, long)]
    duration: Option<u32>,

    /// Allow generation of adult people (legacy model only)
    #[arg(long)]
    allow_people: bool,

    /// Seed image for text mode (legacy model only)
    #[arg(long)]
    image: Option<PathBuf>,

    /// Start frame for frames mode
    #[arg(long)]
    start_frame: Option<PathBuf>,

    /// End frame for frames mode
    #[arg(long)]
    end_frame: Option<PathBuf>,

    /// Loop back to the start frame (frames mode)
    #[arg(long = "loop")]
    looping: bool,

    /// Asset reference image (references mode, repeatable)
    #[arg(long = "reference")]
    references: Vec<PathBuf>,

    /// Style reference image (references mode)
    #[arg(long)]
    style: Option<PathBuf>,

    /// Handle file saved by an earlier run (extend mode)
    #[arg(long)]
    extend_from: Option<PathBuf>,

    /// API key (falls back to GEMINI_API_KEY)
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Alternate API endpoint (proxy)
    #[arg(long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// Seconds between status checks
    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,

    /// Give up after this many seconds of polling
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Text,
    Frames,
    References,
    Extend,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    #[value(name = "720p")]
    P720,
    #[value(name = "1080p")]
    P1080,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::P720 => Resolution::P720,
            ResolutionArg::P1080 => Resolution::P1080,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veo_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Models => list_models(cli.json)?,
    }

    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<ImageInput> {
    Ok(ImageInput::from_path(path)?)
}

fn read_optional(path: Option<&PathBuf>) -> anyhow::Result<Option<ImageInput>> {
    path.map(|p| read_image(p)).transpose()
}

fn build_request(args: &GenerateArgs) -> anyhow::Result<GenerationRequest> {
    let request = match args.mode {
        ModeArg::Text => {
            let mut request = GenerationRequest::text_to_video(&args.prompt);
            if let Some(image) = read_optional(args.image.as_ref())? {
                request = request.with_seed_image(image);
            }
            request
        }
        ModeArg::Frames => GenerationRequest::frames_to_video(
            &args.prompt,
            read_optional(args.start_frame.as_ref())?,
            read_optional(args.end_frame.as_ref())?,
        )
        .with_looping(args.looping),
        ModeArg::References => {
            let references = args
                .references
                .iter()
                .map(|p| read_image(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            GenerationRequest::references_to_video(
                &args.prompt,
                references,
                read_optional(args.style.as_ref())?,
            )
        }
        ModeArg::Extend => {
            let handle = args.extend_from.as_ref().map(load_handle).transpose()?;
            GenerationRequest::extend_video(&args.prompt, handle)
        }
    };

    let mut request = request
        .with_model(args.model)
        .with_aspect_ratio(args.aspect_ratio.into())
        .with_resolution(args.resolution.into());
    if let Some(d) = args.duration {
        request = request.with_duration(d);
    }
    if args.allow_people {
        request = request.with_allow_people(true);
    }
    Ok(request)
}

fn handle_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".handle.json");
    PathBuf::from(name)
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let request = build_request(&args)?;

    let config = provider_config(
        args.api_key.as_deref(),
        args.endpoint.as_deref(),
        ProviderConfig::from_env(),
    );

    let mut builder = VeoStudio::builder().poll_interval(Duration::from_secs(args.poll_interval_secs));
    if let Some(secs) = args.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let studio = builder.build()?;

    let video = match studio.generate(&request, &config).await {
        Ok(video) => video,
        Err(e) => {
            print_credential_hint(&e);
            return Err(e.into());
        }
    };

    let handle_file = handle_path(&args.output);
    video.save(&args.output)?;
    video.save_handle(&handle_file)?;
    report(&video, &args.output, &handle_file, json_output)?;
    studio.revoke(&video);

    Ok(())
}

/// Flags win over the environment; an absent flag falls back to every env
/// source the library knows, including `GEMINI_API_KEY`.
fn provider_config(
    api_key: Option<&str>,
    endpoint: Option<&str>,
    env: ProviderConfig,
) -> ProviderConfig {
    let mut config = ProviderConfig::new(api_key.unwrap_or(env.api_key()));
    if let Some(endpoint) = endpoint.or(env.raw_endpoint()) {
        config = config.with_endpoint(endpoint);
    }
    config
}

fn print_credential_hint(err: &VeoStudioError) {
    let hint = match err.credential_issue() {
        Some(CredentialIssue::InvalidKey) => "The API key was rejected. Check GOOGLE_API_KEY.",
        Some(CredentialIssue::PermissionDenied) => {
            "The API key lacks access to this model. Use a key from a project with Veo enabled."
        }
        Some(CredentialIssue::EntityNotFound) => {
            "The model or project was not found. Select a different API key."
        }
        None => return,
    };
    eprintln!("{hint}");
}

fn report(
    video: &GeneratedArtifact,
    output: &Path,
    handle_file: &Path,
    json_output: bool,
) -> anyhow::Result<()> {
    if json_output {
        let result = serde_json::json!({
            "type": "video",
            "success": true,
            "output": output.display().to_string(),
            "handle": handle_file.display().to_string(),
            "size_bytes": video.size(),
            "mime_type": video.mime_type,
            "model": video.metadata.model,
            "operation": video.metadata.operation,
            "duration_ms": video.metadata.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated video: {} ({} bytes)",
            output.display(),
            video.size()
        );
        println!("Handle for extension: {}", handle_file.display());
        if let Some(duration) = video.metadata.duration_ms {
            println!("Generation time: {}ms", duration);
        }
    }
    Ok(())
}

fn list_models(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ModelInfo {
        id: &'static str,
        legacy: bool,
        default: bool,
    }

    let models: Vec<ModelInfo> = VeoModel::ALL
        .iter()
        .map(|m| ModelInfo {
            id: m.as_str(),
            legacy: m.is_legacy(),
            default: *m == VeoModel::default(),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else {
        println!("Available models:\n");
        for m in &models {
            let marker = if m.default { "*" } else { " " };
            let note = if m.legacy { " (legacy: duration, people, seed image)" } else { "" };
            println!("  {} {}{}", marker, m.id, note);
        }
    }

    Ok(())
}

use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toolbox_hub::core::Device;
use toolbox_hub::utils::{logger, validation::Validate};
use toolbox_hub::{FfmpegExtractor, HubConfig, HubError, PipelineSettings, TranscriptionPipeline, WhisperCli};

const PREVIEW_CHARS: usize = 800;

#[derive(Parser)]
#[command(name = "video-transcript")]
#[command(about = "Transcribe a video to text with Whisper.")]
struct Args {
    /// Path to video file
    video: Option<PathBuf>,

    /// cpu | cuda
    #[arg(long, default_value = "cpu")]
    device: Device,

    /// TOML configuration file ([stt] section is used)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory with ggml-<model>.bin files
    #[arg(long, env = "WHISPER_MODELS_DIR")]
    models_dir: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn prompt_for_path() -> std::io::Result<PathBuf> {
    print!("Enter the path to your video file: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim()))
}

fn transcript_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video.with_file_name(format!("{}_transcript.txt", stem))
}

async fn run(args: Args, video: PathBuf) -> Result<(), HubError> {
    let mut config = HubConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.models_dir {
        config.stt.models_dir = Some(dir);
    }
    config.validate()?;

    let pipeline = TranscriptionPipeline::new(
        Arc::new(FfmpegExtractor::new(config.stt.ffmpeg_binary.clone())),
        Arc::new(WhisperCli::from_config(&config)),
        PipelineSettings::from(&config.stt),
    );

    let transcript = pipeline.run(&video, args.device).await?;

    let out_file = transcript_path(&video);
    tokio::fs::write(&out_file, &transcript.transcript).await?;
    println!("\n✅ Transcript saved to: {}", out_file.display());
    println!("\n📝 Transcript preview:\n");
    println!("{}", transcript.preview(PREVIEW_CHARS));
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let video = match args.video.clone() {
        Some(path) => path,
        None => match prompt_for_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
    };

    if !video.exists() {
        eprintln!("❌ File not found: {}", video.display());
        std::process::exit(1);
    }

    if let Err(e) = run(args, video).await {
        tracing::error!(
            "❌ Transcription failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_path_sits_next_to_video() {
        assert_eq!(
            transcript_path(Path::new("/videos/talk.mp4")),
            PathBuf::from("/videos/talk_transcript.txt")
        );
    }
}

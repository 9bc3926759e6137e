use clap::Parser;
use toolbox_hub::app::console::{speak_or_save, Console};
use toolbox_hub::core::{SpeechRate, SynthesisRequest};
use toolbox_hub::utils::logger;
use toolbox_hub::{EspeakEngine, HubError};

/// Tiny text-to-speech CLI: one-shot with --text, interactive otherwise.
#[derive(Parser)]
#[command(name = "tts-cli")]
#[command(about = "Simple espeak-ng TTS")]
struct Args {
    /// Text to convert (skips interactive prompt)
    #[arg(short, long)]
    text: Option<String>,

    /// Output WAV filename (implies --text)
    #[arg(short, long, requires = "text")]
    out: Option<String>,

    /// Speech rate (wpm, 60-200)
    #[arg(short, long, default_value_t = SpeechRate::DEFAULT)]
    rate: u32,

    /// Volume, 0.0 - 1.0
    #[arg(long, default_value_t = 0.9)]
    volume: f32,

    /// espeak-ng voice name
    #[arg(long)]
    voice: Option<String>,

    #[arg(long, default_value = "espeak-ng", env = "ESPEAK_BINARY")]
    espeak_binary: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

async fn run(args: Args) -> Result<(), HubError> {
    let rate = SpeechRate::new(args.rate)?;
    let engine = EspeakEngine::new(args.espeak_binary)
        .with_voice(args.voice)
        .with_volume(args.volume);

    match args.text {
        Some(text) => {
            let request = SynthesisRequest::new(&text, rate)?;
            if let Some(path) = speak_or_save(&engine, &request, args.out.as_deref()).await? {
                println!("Saved → {}", path.display());
            }
        }
        None => {
            let stdin = std::io::stdin();
            let mut console = Console::new(stdin.lock(), std::io::stdout());
            console.run(&engine, rate).await?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if let Err(e) = run(args).await {
        tracing::error!("❌ tts-cli failed: {} (Severity: {:?})", e, e.severity());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

use crate::domain::model::{SpeechRate, SynthesisRequest};
use crate::domain::ports::SpeechSynthesizer;
use crate::utils::error::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// (menu key, label, preset rate). `None` asks for a custom rate.
pub const SPEED_MENU: [(&str, &str, Option<u32>); 5] = [
    ("1", "Very Slow", Some(60)),
    ("2", "Slow", Some(80)),
    ("3", "Normal", Some(95)),
    ("4", "Fast", Some(100)),
    ("5", "Custom", None),
];

pub fn menu_text() -> String {
    let mut lines = vec!["\nSpeed Options:".to_string()];
    for (key, label, rate) in SPEED_MENU {
        let rate = rate.map_or_else(|| "custom".to_string(), |r| r.to_string());
        lines.push(format!("{}. {} ({} wpm)", key, label, rate));
    }
    lines.join("\n")
}

/// Append `.wav` unless already present; blank names become `output.wav`.
pub fn wav_filename(name: &str) -> String {
    let name = name.trim();
    let name = if name.is_empty() { DEFAULT_OUTPUT_NAME } else { name };
    if name.ends_with(".wav") {
        name.to_string()
    } else {
        format!("{}.wav", name)
    }
}

/// Speak `request`, or save it when `outfile` is given. Returns the absolute saved path.
pub async fn speak_or_save(
    engine: &dyn SpeechSynthesizer,
    request: &SynthesisRequest,
    outfile: Option<&str>,
) -> Result<Option<PathBuf>> {
    match outfile {
        Some(name) => {
            let path = PathBuf::from(wav_filename(name));
            engine.save_to_file(request, &path).await?;
            Ok(Some(std::path::absolute(&path)?))
        }
        None => {
            engine.speak(request).await?;
            Ok(None)
        }
    }
}

/// Line-oriented prompt session over any reader/writer pair.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    /// `None` on end of input.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask until a valid speed is chosen. `None` on end of input.
    pub fn choose_speed(&mut self, current: SpeechRate) -> Result<Option<SpeechRate>> {
        self.say(&format!(
            "\nCurrent speed: {} (120-150 ≈ normal human)",
            current
        ))?;
        loop {
            self.say(&menu_text())?;
            let Some(choice) = self.ask("Select speed (1-5): ")? else {
                return Ok(None);
            };
            match SPEED_MENU.iter().find(|(key, _, _)| *key == choice) {
                Some((_, _, Some(rate))) => return Ok(Some(SpeechRate::new(*rate)?)),
                Some((_, _, None)) => {
                    let Some(raw) = self.ask("Enter custom speed (60-200): ")? else {
                        return Ok(None);
                    };
                    match raw.parse::<u32>() {
                        Ok(value) => match SpeechRate::new(value) {
                            Ok(rate) => return Ok(Some(rate)),
                            Err(_) => self.say("Range must be 60-200")?,
                        },
                        Err(_) => self.say("Enter a number")?,
                    }
                }
                None => self.say("Invalid choice")?,
            }
        }
    }

    /// REPL-style session: text, speed, then speak or save. `quit` exits.
    pub async fn run(&mut self, engine: &dyn SpeechSynthesizer, start_rate: SpeechRate) -> Result<()> {
        self.say("\n=== Text-to-Speech Converter ===")?;
        self.say(&format!(
            "Default speed = {} (very slow)\nType 'quit' to exit.",
            start_rate
        ))?;

        let mut rate = start_rate;
        loop {
            let Some(text) = self.ask("\nEnter text:\n> ")? else {
                break;
            };
            if text.eq_ignore_ascii_case("quit") {
                break;
            }
            if text.is_empty() {
                self.say("Please enter some text")?;
                continue;
            }

            rate = match self.choose_speed(rate)? {
                Some(rate) => rate,
                None => break,
            };

            self.say("\nOutput Options:\n1. Speak now\n2. Save to file")?;
            let Some(option) = self.ask("Choose (1-2): ")? else {
                break;
            };
            let request = SynthesisRequest::new(&text, rate)?;
            let outfile = if option == "2" {
                Some(
                    self.ask("Filename (without extension): ")?
                        .unwrap_or_default(),
                )
            } else {
                None
            };

            match speak_or_save(engine, &request, outfile.as_deref()).await {
                Ok(Some(path)) => self.say(&format!("Saved → {}", path.display()))?,
                Ok(None) => {}
                // 單次失敗不結束互動
                Err(e) => {
                    tracing::warn!("Synthesis failed: {}", e);
                    self.say(&format!("❌ {}", e.user_friendly_message()))?;
                }
            }
        }
        Ok(())
    }
}

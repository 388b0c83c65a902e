use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use sentio_gateway::audio::{MicCapture, SpeakerRenderer, samples_to_wav};
use sentio_gateway::tts::TtsClient;
use sentio_gateway::{ChatRole, ChatSession, Config, decode_mp3};

/// Sentio - streaming speech gateway for digital-human assistants
#[derive(Parser)]
#[command(name = "sentio", version, about)]
struct Cli {
    /// Avatar character model (overrides config)
    #[arg(short, long, env = "SENTIO_CHARACTER")]
    character: Option<String>,

    /// Disable speech synthesis of replies
    #[arg(long, env = "SENTIO_NO_SOUND")]
    no_sound: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "你好！这是语音合成测试。")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sentio_gateway=info",
        1 => "info,sentio_gateway=debug",
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
    let mut config = Config::load()?;
    if let Some(character) = cli.character {
        config.character = Some(character);
    }
    if cli.no_sound {
        config.voice.sound = false;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    tracing::info!(
        agent_url = %config.agent.base_url,
        sound = config.voice.sound,
        character = ?config.character,
        "starting sentio gateway"
    );

    let renderer = Arc::new(SpeakerRenderer::new()?);
    let session = ChatSession::new(config, renderer);
    session.prepare_avatar()?;

    chat_loop(&session).await
}

/// Interactive console chat
async fn chat_loop(session: &ChatSession) -> anyhow::Result<()> {
    println!("sentio ready. Type a message, /mic to speak, /stop to silence, /quit to exit.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/stop" => {
                session.stop_audio();
                println!("(audio stopped)");
            }
            "/mic" => {
                if let Err(e) = voice_turn(session).await {
                    tracing::warn!(error = %e, "voice turn failed");
                    println!("(voice input failed, try again)");
                }
            }
            text => {
                session.send(text).await;
                print_reply(session);
            }
        }
    }

    Ok(())
}

/// Record a few seconds of audio and run it through the voice turn path
async fn voice_turn(session: &ChatSession) -> anyhow::Result<()> {
    const RECORD_SECS: u64 = 5;

    // Starting a recording supersedes the in-flight request by default.
    session.begin_voice_turn();

    let mut capture = MicCapture::new()?;
    capture.start()?;
    println!("(recording for {RECORD_SECS}s...)");
    tokio::time::sleep(Duration::from_secs(RECORD_SECS)).await;
    let samples = capture.stop();

    let wav = samples_to_wav(&samples, capture.sample_rate())?;
    match session.complete_voice_turn(wav).await? {
        Some(text) => {
            println!("you said: {text}");
            print_reply(session);
        }
        None => println!("(nothing recognized)"),
    }
    Ok(())
}

/// Print the last assistant reply from the transcript
fn print_reply(session: &ChatSession) {
    if let Some(record) = session.transcript().last() {
        if record.role == ChatRole::Assistant {
            if !record.think.is_empty() {
                println!("[think] {}", record.think);
            }
            println!("{}", record.content);
        }
    }
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = MicCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    use sentio_gateway::{AudioRenderer, DecodedAudio};

    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let renderer = SpeakerRenderer::new()?;

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    renderer
        .render(DecodedAudio {
            samples,
            sample_rate,
        })
        .await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output end to end
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    use sentio_gateway::AudioRenderer;

    println!("Testing TTS with text: \"{text}\"\n");

    let client = TtsClient::new(config.voice.tts.clone());

    println!("Synthesizing speech...");
    let Some(mp3_data) = client.synthesize(text).await? else {
        println!("Engine produced no audio for this text.");
        return Ok(());
    };
    println!("Got {} bytes of audio data", mp3_data.len());

    if mp3_data.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            mp3_data[0], mp3_data[1], mp3_data[2], mp3_data[3]
        );
    }

    println!("Playing audio...");
    let audio = decode_mp3(&mp3_data)?;
    let renderer = SpeakerRenderer::new()?;
    renderer.render(audio).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

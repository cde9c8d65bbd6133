use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use doorghost::voice::capture::rms;
use doorghost::voice::{AudioCapture, AudioPlayback};
use doorghost::{
    apply_ghost_effect, AudioBuffer, ChatSession, Config, DialogueLoop, ListenAdapter,
    PlaybackSink, SpeakOrchestrator, SpeechToText, Synthesizer, TtsSessionFactory,
    OUTPUT_SAMPLE_RATE,
};

/// Opening instruction that puts the model in character for the night
const PERSONA_INSTRUCTION: &str = "From now on, you are a ghost haunting a house on Halloween \
    night. You have returned from the dead to greet trick-or-treaters at your doorstep. Speak in \
    a threatening, dramatic, and haunting tone with a ghost-like whisper. Keep your responses \
    short, 1-2 sentences, and make them chilling, mysterious, and playful enough to frighten or \
    intrigue children. Use spooky Halloween imagery and sudden dramatic pauses to enhance the \
    eerie effect.";

/// Doorghost - a haunted voice agent for the front porch
#[derive(Parser)]
#[command(name = "doorghost", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to ~/.config/doorghost/config.toml)
    #[arg(short, long, env = "DOORGHOST_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output with the ghost effect applied
    TestTts {
        /// Text to speak
        #[arg(default_value = "Welcome, mortal. I have been expecting you.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,doorghost=info",
        1 => "info,doorghost=debug",
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

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref());

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    tracing::info!("starting the door ghost");

    let stt = match config.stt.endpoint.clone() {
        Some(endpoint) => {
            SpeechToText::with_endpoint(config.stt.api_key.clone(), config.stt.model.clone(), endpoint)?
        }
        None => SpeechToText::new(config.stt.api_key.clone(), config.stt.model.clone())?,
    };
    let listener = ListenAdapter::new(stt).with_capture_limit(config.stt.capture_limit);

    let synth = build_synthesizer(&config)?;
    let playback = AudioPlayback::new()?;
    let speaker = SpeakOrchestrator::new(synth, playback, config.effect.clone());

    let mut chat = match config.llm.endpoint.clone() {
        Some(endpoint) => {
            ChatSession::with_endpoint(config.llm.api_key.clone(), config.llm.model.clone(), endpoint)?
        }
        None => ChatSession::new(config.llm.api_key.clone(), config.llm.model.clone())?,
    };
    chat.prime(PERSONA_INSTRUCTION);
    chat.warmup().await;

    tracing::info!(model = %config.llm.model, "the ghost is awake, waiting at the door");

    let mut dialogue = DialogueLoop::with_config(listener, speaker, chat, config.dialogue.clone());
    dialogue.run().await;

    Ok(())
}

/// Build the TTS factory from config
fn build_synthesizer(config: &Config) -> anyhow::Result<TtsSessionFactory> {
    let factory = match config.tts.endpoint.clone() {
        Some(endpoint) => TtsSessionFactory::with_endpoint(
            config.tts.api_key.clone(),
            config.tts.voice.clone(),
            endpoint,
        )?,
        None => TtsSessionFactory::new(config.tts.api_key.clone(), config.tts.voice.clone())?,
    };
    Ok(factory.with_model(config.tts.model.clone()))
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", doorghost::voice::CAPTURE_SAMPLE_RATE);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms(&samples);
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

        // Clear buffer each second
        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let num_samples = OUTPUT_SAMPLE_RATE as usize * 2;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let samples: Vec<i16> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / OUTPUT_SAMPLE_RATE as f32;
            let v = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3;
            (v * f32::from(i16::MAX)) as i16
        })
        .collect();

    let buffer = AudioBuffer::new(samples, OUTPUT_SAMPLE_RATE, 1)?;
    println!(
        "Playing {} samples at {} Hz...",
        buffer.samples().len(),
        OUTPUT_SAMPLE_RATE
    );

    playback.play(&buffer)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test TTS output with the ghost effect applied
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let synth = build_synthesizer(config)?;

    println!("Synthesizing speech...");
    let artifact = synth.synthesize(text).await?;
    println!(
        "Got {} ms of audio at {} Hz",
        artifact.buffer().duration_ms(),
        artifact.buffer().sample_rate()
    );

    println!("Applying the ghost effect...");
    let ghost = apply_ghost_effect(artifact.buffer(), &config.effect)?;

    println!("Playing audio...");
    let mut playback = AudioPlayback::new()?;
    playback.play(&ghost)?;

    println!("\n---");
    println!("If you heard a spectral voice, TTS is working!");

    Ok(())
}

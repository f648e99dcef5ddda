use std::{path::PathBuf, thread, time::Duration};

use audio_visualiser_core::{
    AppConfig, ClipSource, PngRecorder, PresetLibrary, RecordingSettings, RendererConfig,
    Visualiser,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

fn main() -> audio_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Config { output } => print_config(output.as_ref()),
    }
}

fn run(args: RunArgs) -> audio_visualiser_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.renderers = select_renderers(&args.style, std::mem::take(&mut config.renderers))?;

    let source = match &args.input {
        Some(path) => ClipSource::from_wav(path)?,
        None => ClipSource::tone(44_100, args.seconds, &[110.0, 220.0, 330.0], 2.0),
    }
    .looping(args.looping);
    tracing::info!(
        input = ?args.input,
        duration_ms = source.duration().as_millis() as u64,
        "loaded source"
    );

    let mut visualiser = Visualiser::new(&config)?;
    visualiser.link(&source)?;
    visualiser.trigger_flash();

    let recorder = PngRecorder::new(RecordingSettings {
        output_dir: args.output.clone(),
        every: args.every,
        width: args.width,
        height: args.height,
    })?;
    let render_loop = visualiser.start_rendering(recorder)?;

    thread::sleep(Duration::from_secs_f32(args.seconds.max(0.0)));

    visualiser.release()?;
    let (recorder, compositor) = render_loop.stop()?;

    let last = args.output.join("last.png");
    std::fs::create_dir_all(&args.output)?;
    if recorder.save_last(&last)? {
        tracing::info!(path = %last.display(), "saved final frame");
    }

    let stats = compositor.stats();
    tracing::info!(
        passes = stats.passes,
        presented = stats.presented,
        skipped = stats.skipped,
        written = recorder.written(),
        fps = stats.fps,
        "finished"
    );
    Ok(())
}

/// Styles named on the command line win over the configured renderers; with
/// neither, a plain line is drawn.
fn select_renderers(
    styles: &[Style],
    configured: Vec<RendererConfig>,
) -> audio_visualiser_core::Result<Vec<RendererConfig>> {
    let presets = PresetLibrary::builtin();

    if styles.is_empty() {
        if configured.is_empty() {
            return Ok(presets.resolve("line")?.to_vec());
        }
        return Ok(configured);
    }

    let mut renderers = Vec::new();
    for style in styles {
        renderers.extend_from_slice(presets.resolve(style.preset_name())?);
    }
    Ok(renderers)
}

fn print_config(output: Option<&PathBuf>) -> audio_visualiser_core::Result<()> {
    let config = AppConfig {
        renderers: PresetLibrary::builtin().resolve("line")?.to_vec(),
        ..AppConfig::default()
    };
    let json = config.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a clip through the visualiser and record what it draws.
    Run(RunArgs),
    /// Print the default configuration as JSON.
    Config {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// WAV file to visualise. A synthesised chord is used when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Visual styles to stack, in drawing order.
    #[arg(short, long, value_enum)]
    style: Vec<Style>,
    #[arg(long, default_value_t = 5.0)]
    seconds: f32,
    /// Restart the clip when it ends.
    #[arg(long = "loop")]
    looping: bool,
    #[arg(long, default_value_t = 720)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Directory for recorded frames.
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,
    /// Write every n-th frame; 0 keeps only the final one.
    #[arg(long, default_value_t = 0)]
    every: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Style {
    Line,
    Bars,
    Circle,
    CircleBar,
}

impl Style {
    fn preset_name(self) -> &'static str {
        match self {
            Style::Line => "line",
            Style::Bars => "bars",
            Style::Circle => "circle",
            Style::CircleBar => "circle_bar",
        }
    }
}

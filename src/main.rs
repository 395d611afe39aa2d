use choir2midi::{validate_input, Choir2Midi, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Choir Part Export System
#[derive(Parser)]
#[command(name = "choir2midi")]
#[command(about = "Export per-voice MIDI files for choir rehearsal with accompaniment tracks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export per-voice MIDI files from a choral arrangement
    Export {
        /// Input MIDI file
        input_midi: PathBuf,

        /// Specific part name to export (default: all configured parts)
        part: Option<String>,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Render exported MIDI files to MP3 via fluidsynth and ffmpeg
    Render {
        /// Input MIDI file, or a stem matching several exported parts
        input_midi: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fluidsynth configuration file (soundfont selection)
        #[arg(short, long)]
        soundfont_config: Option<PathBuf>,

        /// Suffix to append to output file names
        #[arg(long)]
        suffix: Option<String>,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "choir2midi=debug"
    } else {
        "choir2midi=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_or_default(config: Option<PathBuf>) -> anyhow::Result<Config> {
    Ok(match config {
        Some(path) => choir2midi::config::load_config(path)?,
        None => Config::default(),
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input_midi,
            part,
            output,
            config,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }
            init_tracing(verbose);

            let config = load_or_default(config)?;
            validate_input(&input_midi, &config)?;

            let exporter = Choir2Midi::new(config);

            if !quiet {
                println!("Processing {}...", input_midi.display());
            }

            let written = exporter.export(&input_midi, &output, part.as_deref())?;

            if !quiet {
                for path in &written {
                    println!("  wrote {}", path.display());
                }
                println!("Results saved to {}", output.display());
            }
        }
        Commands::Render {
            input_midi,
            output,
            config,
            soundfont_config,
            suffix,
        } => {
            init_tracing(false);
            let config = load_or_default(config)?;
            let exporter = Choir2Midi::new(config);
            let rendered = exporter.render(
                &input_midi,
                &output,
                soundfont_config.as_deref(),
                suffix.as_deref(),
            )?;
            for path in &rendered {
                println!("  rendered {}", path.display());
            }
        }
        Commands::ValidateConfig { config } => {
            let config = choir2midi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}

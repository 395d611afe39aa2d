//! Choir Part Export System
//!
//! Processes multi-track MIDI files for choral arrangements, producing
//! per-voice derivative files with altered instrumentation, volume, and
//! channel assignment, plus an optional synthesized accompaniment track
//! derived from an existing part.

pub mod config;
pub mod copy;
pub mod error;
pub mod export;
pub mod instruments;
pub mod render;

pub use config::Config;
pub use copy::ExtraTrackSpec;
pub use error::{ChoirError, Result as ChoirResult};

use midly::Smf;
use std::path::{Path, PathBuf};

/// Main export pipeline for choir part generation
pub struct Choir2Midi {
    config: Config,
}

impl Choir2Midi {
    /// Create a new exporter with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Export derivative MIDI files for one part, or for every configured
    /// part plus the combined ensemble file when `part` is `None`.
    ///
    /// Per-song sidecar settings next to the input file are merged over the
    /// base configuration first. Returns the paths written.
    pub fn export<P: AsRef<Path>>(
        &self,
        input_midi: P,
        output_dir: P,
        part: Option<&str>,
    ) -> ChoirResult<Vec<PathBuf>> {
        let input_midi = input_midi.as_ref();
        let output_dir = output_dir.as_ref();

        let config = config::config_for_input(&self.config, input_midi)?;
        std::fs::create_dir_all(output_dir)?;

        let bytes = std::fs::read(input_midi)?;
        let smf = Smf::parse(&bytes)?;

        match part {
            Some(part) => {
                export::export_single(&smf, input_midi, output_dir, &config, part)
                    .map(|path| vec![path])
            }
            None => export::export_all(&smf, input_midi, output_dir, &config),
        }
    }

    /// Render exported MIDI files to MP3 via the external synthesizer chain
    pub fn render<P: AsRef<Path>>(
        &self,
        input_midi: P,
        output_dir: P,
        soundfont_config: Option<&Path>,
        suffix: Option<&str>,
    ) -> ChoirResult<Vec<PathBuf>> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;
        render::render_batch(
            input_midi.as_ref(),
            output_dir,
            &self.config.render,
            soundfont_config,
            suffix,
        )
    }
}

/// Validate the input file and configuration before processing
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> ChoirResult<()> {
    let path = input_path.as_ref();
    if !path.is_file() {
        return Err(ChoirError::MidiFileError(format!(
            "input file not found: {}",
            path.display()
        )));
    }
    let is_midi = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
        .unwrap_or(false);
    if !is_midi {
        return Err(ChoirError::MidiFileError(format!(
            "not a MIDI file: {}",
            path.display()
        )));
    }
    config::validate_config(config)?;
    Ok(())
}

//! Per-voice part exports
//!
//! Builds the instrument/volume maps for each configured voice, derives the
//! accompaniment spec, and drives the copy engine. Voices missing from the
//! input file are skipped with a warning so one absent part never aborts a
//! batch export.

use crate::config::{Config, VolumeConfig};
use crate::copy::{copy_midi, find_track_by_name, ExtraTrackSpec};
use crate::error::{ChoirError, Result};
use crate::instruments;
use midly::Smf;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Output path for one part: `<input stem>-<label>.mid` in the output dir
pub fn output_file_name(input_midi: &Path, output_dir: &Path, label: &str) -> PathBuf {
    let base = input_midi
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}-{}.mid", base, label))
}

/// Default level for a voice, honoring per-voice overrides
pub fn default_volume_for_part(part: &str, volumes: &VolumeConfig) -> u8 {
    volumes
        .default_override
        .get(part)
        .copied()
        .unwrap_or(volumes.default)
}

/// Instrument map: every woman's voice to the women's program, every man's
/// voice to the men's program
fn voice_instruments(config: &Config) -> Result<HashMap<String, u8>> {
    let women_program = instruments::lookup(&config.women_instrument)?;
    let men_program = instruments::lookup(&config.men_instrument)?;
    let mut instruments = HashMap::new();
    for voice in &config.women_voices {
        instruments.insert(voice.name.clone(), women_program);
    }
    for voice in &config.men_voices {
        instruments.insert(voice.name.clone(), men_program);
    }
    Ok(instruments)
}

/// Baseline volume map for all voices plus the fixed auxiliary tracks
fn voice_volumes(config: &Config) -> HashMap<String, u8> {
    let mut volumes = HashMap::new();
    for voice in config.women_voices.iter().chain(&config.men_voices) {
        volumes.insert(
            voice.name.clone(),
            default_volume_for_part(&voice.name, &config.volumes),
        );
    }
    volumes.insert("Piano".to_string(), config.volumes.piano);
    volumes.insert("Wood Blocks".to_string(), config.volumes.wood_blocks);
    volumes
}

/// Export one derivative file.
///
/// Takes its own copy of the volume map, so repeated exports from the same
/// maps never alias each other's overrides. When all 16 channels are in use
/// the export is retried without the accompaniment track and a warning is
/// logged; the degraded file is still written.
pub fn export_part<'a>(
    smf: &Smf<'a>,
    output_file: &Path,
    part: &str,
    instruments: &HashMap<String, u8>,
    volumes: &HashMap<String, u8>,
    volume_for_part: Option<u8>,
    accompaniment: Option<&'a ExtraTrackSpec>,
) -> Result<()> {
    info!(part, output = %output_file.display(), "exporting part");
    let mut volumes = volumes.clone();
    if let Some(volume) = volume_for_part {
        volumes.insert(part.to_string(), volume);
    }

    let copied = match copy_midi(smf, instruments, &volumes, accompaniment) {
        Err(ChoirError::NoChannelAvailable) if accompaniment.is_some() => {
            warn!(part, "all 16 channels in use; exporting without accompaniment");
            copy_midi(smf, instruments, &volumes, None)?
        }
        other => other?,
    };

    copied.save(output_file).map_err(|e| {
        ChoirError::MidiExportError(format!("{}: {}", output_file.display(), e))
    })?;
    info!("saved {}", output_file.display());
    Ok(())
}

fn accompaniment_spec(config: &Config, part: &str) -> Result<ExtraTrackSpec> {
    Ok(ExtraTrackSpec {
        name: config.accompaniment.name.clone(),
        instrument: instruments::lookup(&config.accompaniment.instrument)?,
        volume: config.volumes.part_piano,
        melody_from: part.to_string(),
        replace_source_name: config.accompaniment.replace_source_name,
    })
}

/// Export a single named part
pub fn export_single(
    smf: &Smf<'_>,
    input_midi: &Path,
    output_dir: &Path,
    config: &Config,
    part: &str,
) -> Result<PathBuf> {
    let voice = config
        .women_voices
        .iter()
        .chain(&config.men_voices)
        .find(|voice| voice.name == part)
        .ok_or_else(|| {
            ChoirError::InvalidConfigParameter(format!("unknown part name: {}", part))
        })?;

    let instruments = voice_instruments(config)?;
    let volumes = voice_volumes(config);
    let accompaniment = accompaniment_spec(config, part)?;
    let output_file = output_file_name(input_midi, output_dir, &voice.label);
    export_part(
        smf,
        &output_file,
        part,
        &instruments,
        &volumes,
        Some(config.volumes.part),
        Some(&accompaniment),
    )?;
    Ok(output_file)
}

/// Export every configured voice present in the file, then the combined
/// ensemble file.
///
/// Voices without a matching track are skipped with a warning. The combined
/// export levels every voice at the ensemble volume and carries no
/// accompaniment track.
pub fn export_all(
    smf: &Smf<'_>,
    input_midi: &Path,
    output_dir: &Path,
    config: &Config,
) -> Result<Vec<PathBuf>> {
    let instruments = voice_instruments(config)?;
    let volumes = voice_volumes(config);
    let mut written = Vec::new();

    for voice in config.women_voices.iter().chain(&config.men_voices) {
        if find_track_by_name(&smf.tracks, &voice.name).is_none() {
            warn!(part = %voice.name, "part not found in input file; skipping");
            continue;
        }
        let accompaniment = accompaniment_spec(config, &voice.name)?;
        let output_file = output_file_name(input_midi, output_dir, &voice.label);
        export_part(
            smf,
            &output_file,
            &voice.name,
            &instruments,
            &volumes,
            Some(config.volumes.part),
            Some(&accompaniment),
        )?;
        written.push(output_file);
    }

    let mut satb_volumes = volumes.clone();
    for voice in config.women_voices.iter().chain(&config.men_voices) {
        satb_volumes.insert(voice.name.clone(), config.volumes.satb);
    }
    let output_file = output_file_name(input_midi, output_dir, "SATB");
    export_part(
        smf,
        &output_file,
        "SATB",
        &instruments,
        &satb_volumes,
        None,
        None,
    )?;
    written.push(output_file);

    Ok(written)
}

//! Configuration system for the choir part exporter

use crate::error::{ChoirError, Result};
use crate::instruments;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    /// Women's voice parts in export order
    pub women_voices: Vec<Voice>,
    /// Men's voice parts in export order
    pub men_voices: Vec<Voice>,
    /// GM instrument name used for all women's parts
    pub women_instrument: String,
    /// GM instrument name used for all men's parts
    pub men_instrument: String,
    pub volumes: VolumeConfig,
    pub accompaniment: AccompanimentConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            women_voices: default_women_voices(),
            men_voices: default_men_voices(),
            women_instrument: "Voice Oohs".to_string(),
            men_instrument: "Choir Aahs".to_string(),
            volumes: VolumeConfig::default(),
            accompaniment: AccompanimentConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

/// A voice part: the track name it matches in the input file and the short
/// label used in output file names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub label: String,
}

impl Voice {
    fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
        }
    }
}

fn default_women_voices() -> Vec<Voice> {
    vec![
        Voice::new("Soprano", "S"),
        Voice::new("Mezzo-soprano", "MS"),
        Voice::new("Alto", "A"),
        Voice::new("Alto 1", "A1"),
        Voice::new("Alto 2", "A2"),
    ]
}

fn default_men_voices() -> Vec<Voice> {
    vec![
        Voice::new("Tenor", "T"),
        Voice::new("Tenor 1", "T1"),
        Voice::new("Tenor 2", "T2"),
        Voice::new("Baritone", "Bar"),
        Voice::new("Bass", "B"),
    ]
}

/// Volume policy for exports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Level for every voice that has no override
    pub default: u8,
    /// Per-voice overrides of the default level
    pub default_override: HashMap<String, u8>,
    /// Level of the exported part itself in its own export
    pub part: u8,
    /// Level of the derived accompaniment track in a part export
    pub part_piano: u8,
    /// Level of every voice in the combined export
    pub satb: u8,
    /// Fixed level for a pre-existing Piano track
    pub piano: u8,
    /// Fixed level for a pre-existing Wood Blocks track
    pub wood_blocks: u8,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            default: 70,
            default_override: HashMap::new(),
            part: 110,
            part_piano: 127,
            satb: 90,
            piano: 70,
            wood_blocks: 70,
        }
    }
}

/// Derived accompaniment track settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccompanimentConfig {
    /// Name of the derived track
    pub name: String,
    /// GM instrument name for the derived track
    pub instrument: String,
    /// Drop the melody source's own name event from the derived track
    pub replace_source_name: bool,
}

impl Default for AccompanimentConfig {
    fn default() -> Self {
        Self {
            name: "Piano for part".to_string(),
            instrument: "Acoustic Grand Piano".to_string(),
            replace_source_name: false,
        }
    }
}

/// External renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Synthesizer executable rendering MIDI to WAV
    pub fluidsynth: String,
    /// Encoder executable converting WAV to MP3
    pub ffmpeg: String,
    /// Synthesizer gain, passed through when set
    pub gain: Option<f32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fluidsynth: "fluidsynth".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            gain: None,
        }
    }
}

/// Load configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to a JSON file
pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Validate configuration value ranges and instrument names
pub fn validate_config(config: &Config) -> Result<()> {
    for voice in config.women_voices.iter().chain(&config.men_voices) {
        if voice.name.is_empty() || voice.label.is_empty() {
            return Err(ChoirError::ConfigValidationFailed(
                "voice entries need a non-empty name and label".to_string(),
            ));
        }
    }
    instruments::lookup(&config.women_instrument)?;
    instruments::lookup(&config.men_instrument)?;
    instruments::lookup(&config.accompaniment.instrument)?;

    let volumes = &config.volumes;
    let levels = [
        ("volumes.default", volumes.default),
        ("volumes.part", volumes.part),
        ("volumes.part_piano", volumes.part_piano),
        ("volumes.satb", volumes.satb),
        ("volumes.piano", volumes.piano),
        ("volumes.wood_blocks", volumes.wood_blocks),
    ];
    for (field, level) in levels {
        if level > 127 {
            return Err(ChoirError::InvalidConfigParameter(format!(
                "{} = {} outside 0..=127",
                field, level
            )));
        }
    }
    for (voice, level) in &volumes.default_override {
        if *level > 127 {
            return Err(ChoirError::InvalidConfigParameter(format!(
                "volumes.default_override.{} = {} outside 0..=127",
                voice, level
            )));
        }
    }
    Ok(())
}

/// Resolve the effective configuration for one input file.
///
/// A JSON sidecar with the same stem as the input MIDI (`song.mid` →
/// `song.json`), if present, is recursively merged over the base
/// configuration: nested objects merge field by field, scalars and arrays
/// from the sidecar win.
pub fn config_for_input(config: &Config, input_midi: &Path) -> Result<Config> {
    let sidecar = input_midi.with_extension("json");
    if !sidecar.is_file() {
        return Ok(config.clone());
    }
    debug!(settings = %sidecar.display(), "merging per-song settings");
    let overrides: Value = serde_json::from_str(&std::fs::read_to_string(&sidecar)?)?;
    let merged = merge_values(serde_json::to_value(config)?, overrides);
    let merged: Config = serde_json::from_value(merged)?;
    validate_config(&merged)?;
    Ok(merged)
}

fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

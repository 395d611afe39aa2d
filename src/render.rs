//! External audio rendering glue
//!
//! Renders exported MIDI files to MP3 by chaining two external processes:
//! fluidsynth for MIDI to WAV, ffmpeg for WAV to MP3. The intermediate WAV
//! is removed afterwards. Synchronous, no retries; a non-zero exit status
//! surfaces as a [`ChoirError::Render`].

use crate::config::RenderConfig;
use crate::error::{ChoirError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

fn run(program: &str, args: &[&str]) -> Result<()> {
    debug!(program, ?args, "running external process");
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| ChoirError::Render(format!("failed to run {}: {}", program, e)))?;
    if !status.success() {
        return Err(ChoirError::Render(format!("{} exited with {}", program, status)));
    }
    Ok(())
}

fn output_path(input_midi: &Path, output_dir: &Path, suffix: Option<&str>, ext: &str) -> PathBuf {
    let stem = input_midi
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = suffix.map(|s| format!("-{}", s)).unwrap_or_default();
    output_dir.join(format!("{}{}.{}", stem, suffix, ext))
}

/// Render a single MIDI file to MP3 in `output_dir`
pub fn render_midi_to_mp3(
    input_midi: &Path,
    output_dir: &Path,
    render: &RenderConfig,
    soundfont_config: Option<&Path>,
    suffix: Option<&str>,
) -> Result<PathBuf> {
    let output_wav = output_path(input_midi, output_dir, suffix, "wav");
    let output_mp3 = output_path(input_midi, output_dir, suffix, "mp3");

    let gain = render.gain.map(|g| g.to_string());
    let mut args: Vec<&str> = vec!["-ni"];
    if let Some(config) = soundfont_config.and_then(|p| p.to_str()) {
        args.push("-f");
        args.push(config);
    }
    if let Some(gain) = gain.as_deref() {
        args.push("-g");
        args.push(gain);
    }
    let input = input_midi.to_string_lossy();
    let wav = output_wav.to_string_lossy();
    args.push(&input);
    args.push("-F");
    args.push(&wav);
    run(&render.fluidsynth, &args)?;

    let mp3 = output_mp3.to_string_lossy();
    run(&render.ffmpeg, &["-y", "-i", &wav, &mp3])?;

    std::fs::remove_file(&output_wav)?;
    info!("rendered {}", output_mp3.display());
    Ok(output_mp3)
}

/// Render one file, or every `<stem>*.mid` sibling when the given path does
/// not exist as a file (the shape the part exporter leaves behind)
pub fn render_batch(
    input_midi: &Path,
    output_dir: &Path,
    render: &RenderConfig,
    soundfont_config: Option<&Path>,
    suffix: Option<&str>,
) -> Result<Vec<PathBuf>> {
    if input_midi.is_file() {
        return Ok(vec![render_midi_to_mp3(
            input_midi,
            output_dir,
            render,
            soundfont_config,
            suffix,
        )?]);
    }

    let input_dir = input_midi.parent().unwrap_or_else(|| Path::new("."));
    let stem = input_midi
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if file_name.starts_with(&stem) && file_name.ends_with(".mid") {
            inputs.push(path);
        }
    }
    inputs.sort();
    if inputs.is_empty() {
        return Err(ChoirError::MidiFileError(format!(
            "no MIDI files matching {} in {}",
            stem,
            input_dir.display()
        )));
    }

    let mut rendered = Vec::new();
    for input in &inputs {
        rendered.push(render_midi_to_mp3(
            input,
            output_dir,
            render,
            soundfont_config,
            suffix,
        )?);
    }
    Ok(rendered)
}

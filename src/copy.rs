//! MIDI track copy engine
//!
//! The core of the exporter: copies a multi-track MIDI file while rewriting
//! instrument programs, channel-volume controllers, and channel assignments,
//! and optionally derives one extra accompaniment track from an existing part
//! on a free MIDI channel.
//!
//! Transformations never reorder or drop events; the only permitted change in
//! event count is the synthetic track-name event prepended to a derived track.
//! Inputs are never mutated, every function builds fresh tracks.

use crate::error::{ChoirError, Result};
use midly::num::{u28, u4, u7};
use midly::{MetaMessage, MidiMessage, Smf, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Specification for the derived accompaniment track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraTrackSpec {
    /// Display name of the new track
    pub name: String,
    /// Program number for the new track (0..=127)
    pub instrument: u8,
    /// Channel volume for the new track (0..=127)
    pub volume: u8,
    /// Name of the part whose events the new track is derived from
    pub melody_from: String,
    /// Drop the source track's own name event instead of keeping both
    #[serde(default)]
    pub replace_source_name: bool,
}

fn check_seven_bit(field: &str, value: u8) -> Result<u7> {
    if value > 127 {
        return Err(ChoirError::InvalidValue(field.to_string(), value));
    }
    Ok(u7::new(value))
}

/// Copy a track, overriding the instrument program and/or the channel volume.
///
/// Program-change events get `new_instrument` (channel untouched), controller
/// 7 events get `new_volume`. Everything else is copied verbatim.
pub fn copy_track<'a>(
    track: &Track<'a>,
    new_instrument: Option<u8>,
    new_volume: Option<u8>,
) -> Result<Track<'a>> {
    let new_instrument = new_instrument
        .map(|p| check_seven_bit("program", p))
        .transpose()?;
    let new_volume = new_volume
        .map(|v| check_seven_bit("volume", v))
        .transpose()?;

    let mut new_track = Track::with_capacity(track.len());
    for event in track {
        let kind = match event.kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program },
            } => TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: new_instrument.unwrap_or(program),
                },
            },
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::Controller { controller, value },
            } if controller.as_int() == 7 => TrackEventKind::Midi {
                channel,
                message: MidiMessage::Controller {
                    controller,
                    value: new_volume.unwrap_or(value),
                },
            },
            other => other,
        };
        new_track.push(TrackEvent {
            delta: event.delta,
            kind,
        });
    }
    Ok(new_track)
}

/// Copy a track onto a new channel under a new name.
///
/// Used only for the derived accompaniment track: a synthetic track-name
/// event is prepended, every channel-voice event is moved to `new_channel`,
/// and program/volume overrides apply as in [`copy_track`]. The source
/// track's own name event is kept unless `replace_source_name` is set, so a
/// derived track may carry two name events; the first one wins for naming.
pub fn copy_track_to_new_channel<'a>(
    track: &Track<'a>,
    new_name: &'a str,
    new_instrument: Option<u8>,
    new_volume: Option<u8>,
    new_channel: u8,
    replace_source_name: bool,
) -> Result<Track<'a>> {
    if new_channel > 15 {
        return Err(ChoirError::InvalidChannel(new_channel));
    }
    let channel = u4::new(new_channel);
    let new_instrument = new_instrument
        .map(|p| check_seven_bit("program", p))
        .transpose()?;
    let new_volume = new_volume
        .map(|v| check_seven_bit("volume", v))
        .transpose()?;

    let mut new_track = Track::with_capacity(track.len() + 1);
    new_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(new_name.as_bytes())),
    });

    // Delta of a suppressed name event is carried into the next event so
    // absolute timing never shifts.
    let mut carried_delta = 0u32;
    for event in track {
        if replace_source_name {
            if let TrackEventKind::Meta(MetaMessage::TrackName(_)) = event.kind {
                carried_delta += event.delta.as_int();
                continue;
            }
        }
        let kind = match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            } => TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: new_instrument.unwrap_or(program),
                },
            },
            TrackEventKind::Midi {
                message: MidiMessage::Controller { controller, value },
                ..
            } if controller.as_int() == 7 => TrackEventKind::Midi {
                channel,
                message: MidiMessage::Controller {
                    controller,
                    value: new_volume.unwrap_or(value),
                },
            },
            TrackEventKind::Midi { message, .. } => TrackEventKind::Midi { channel, message },
            other => other,
        };
        new_track.push(TrackEvent {
            delta: u28::new(event.delta.as_int() + carried_delta),
            kind,
        });
        carried_delta = 0;
    }
    Ok(new_track)
}

/// Find the lowest MIDI channel not referenced by any channel-voice event.
///
/// Returns `None` when all 16 channels are in use; callers decide whether
/// that means dropping the derived track or failing the export.
pub fn find_unused_channel(tracks: &[Track<'_>]) -> Option<u8> {
    let mut in_use = [false; 16];
    for track in tracks {
        for event in track {
            if let TrackEventKind::Midi { channel, .. } = event.kind {
                in_use[channel.as_int() as usize] = true;
            }
        }
    }
    (0..16).find(|&channel| !in_use[channel as usize])
}

/// Name of a track, taken from its first track-name meta event
pub fn track_name(track: &Track<'_>) -> Option<String> {
    track.iter().find_map(|event| match event.kind {
        TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
            Some(String::from_utf8_lossy(raw).into_owned())
        }
        _ => None,
    })
}

/// Find the first track whose declared name matches `name` exactly.
///
/// A track with no name event never matches. `None` means the part is not
/// present in this file; batch callers skip it rather than fail.
pub fn find_track_by_name<'s, 'a>(tracks: &'s [Track<'a>], name: &str) -> Option<&'s Track<'a>> {
    tracks
        .iter()
        .find(|track| track_name(track).as_deref() == Some(name))
}

/// Copy a whole MIDI file, applying per-part overrides by track name.
///
/// Tracks keep their input order; the derived accompaniment track, if
/// requested, is appended last. Both the melody-source lookup and the
/// channel allocation run against the output built so far, not the input.
/// Pure function: the input file is never touched, any error discards the
/// partial output.
pub fn copy_midi<'a>(
    smf: &Smf<'a>,
    instruments: &HashMap<String, u8>,
    volumes: &HashMap<String, u8>,
    extra_track: Option<&'a ExtraTrackSpec>,
) -> Result<Smf<'a>> {
    let mut new_smf = Smf {
        header: smf.header,
        tracks: Vec::with_capacity(smf.tracks.len() + 1),
    };

    for track in &smf.tracks {
        let name = track_name(track);
        let instrument = name.as_deref().and_then(|n| instruments.get(n)).copied();
        if let Some(program) = instrument {
            debug!(
                track = name.as_deref().unwrap_or(""),
                program,
                gm_name = crate::instruments::program_name(program).unwrap_or("?"),
                "overriding instrument"
            );
        }
        let volume = name.as_deref().and_then(|n| volumes.get(n)).copied();
        if let Some(volume) = volume {
            debug!(
                track = name.as_deref().unwrap_or(""),
                volume, "overriding volume"
            );
        }
        new_smf.tracks.push(copy_track(track, instrument, volume)?);
    }

    if let Some(extra) = extra_track {
        let source = find_track_by_name(&new_smf.tracks, &extra.melody_from)
            .ok_or_else(|| ChoirError::SourcePartNotFound(extra.melody_from.clone()))?;
        let channel =
            find_unused_channel(&new_smf.tracks).ok_or(ChoirError::NoChannelAvailable)?;
        debug!(
            name = %extra.name,
            melody_from = %extra.melody_from,
            channel,
            "adding derived track"
        );
        let derived = copy_track_to_new_channel(
            source,
            &extra.name,
            Some(extra.instrument),
            Some(extra.volume),
            channel,
            extra.replace_source_name,
        )?;
        new_smf.tracks.push(derived);
    }

    Ok(new_smf)
}

/// Read, transform, and save a MIDI file in one step
pub fn copy_midi_file(
    input_file: &Path,
    output_file: &Path,
    instruments: &HashMap<String, u8>,
    volumes: &HashMap<String, u8>,
    extra_track: Option<&ExtraTrackSpec>,
) -> Result<()> {
    debug!(input = %input_file.display(), "copying MIDI file");
    let bytes = std::fs::read(input_file)?;
    let smf = Smf::parse(&bytes)?;
    let copied = copy_midi(&smf, instruments, volumes, extra_track)?;
    copied.save(output_file).map_err(|e| {
        ChoirError::MidiExportError(format!("{}: {}", output_file.display(), e))
    })?;
    info!("saved MIDI file to {}", output_file.display());
    Ok(())
}

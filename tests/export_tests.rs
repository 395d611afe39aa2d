//! End-to-end tests for the part exporter pipeline

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;

fn name_event(name: &str) -> TrackEvent<'_> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    }
}

fn program_change(channel: u8, program: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message: MidiMessage::ProgramChange {
                program: u7::new(program),
            },
        },
    }
}

fn volume_change(channel: u8, value: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message: MidiMessage::Controller {
                controller: u7::new(7),
                value: u7::new(value),
            },
        },
    }
}

fn note_on(channel: u8, key: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(64),
            },
        },
    }
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

/// Write a two-part choral fixture to `dir/song.mid`
fn write_fixture(dir: &Path) -> std::path::PathBuf {
    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::new(480)),
        },
        tracks: vec![
            vec![
                TrackEvent {
                    delta: u28::new(0),
                    kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000))),
                },
                end_of_track(),
            ],
            vec![
                name_event("Soprano"),
                program_change(0, 73),
                volume_change(0, 100),
                note_on(0, 72),
                end_of_track(),
            ],
            vec![
                name_event("Bass"),
                program_change(1, 34),
                volume_change(1, 100),
                note_on(1, 40),
                end_of_track(),
            ],
        ],
    };
    let path = dir.join("song.mid");
    smf.save(&path).unwrap();
    path
}

fn read_midi(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

fn first_program(track: &[TrackEvent<'_>]) -> Option<u8> {
    track.iter().find_map(|event| match event.kind {
        TrackEventKind::Midi {
            message: MidiMessage::ProgramChange { program },
            ..
        } => Some(program.as_int()),
        _ => None,
    })
}

fn first_volume(track: &[TrackEvent<'_>]) -> Option<u8> {
    track.iter().find_map(|event| match event.kind {
        TrackEventKind::Midi {
            message: MidiMessage::Controller { controller, value },
            ..
        } if controller.as_int() == 7 => Some(value.as_int()),
        _ => None,
    })
}

fn channels_of(track: &[TrackEvent<'_>]) -> Vec<u8> {
    track
        .iter()
        .filter_map(|event| match event.kind {
            TrackEventKind::Midi { channel, .. } => Some(channel.as_int()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use choir2midi::copy::track_name;
    use choir2midi::{ChoirError, Choir2Midi, Config};

    #[test]
    fn test_export_all_writes_present_parts_and_ensemble() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let output = dir.path().join("out");

        let exporter = Choir2Midi::new(Config::default());
        let written = exporter.export(&input, &output, None).unwrap();

        // Only Soprano and Bass exist in the fixture; the other eight
        // configured voices are skipped, plus the combined export
        assert_eq!(written.len(), 3);
        assert!(output.join("song-S.mid").is_file());
        assert!(output.join("song-B.mid").is_file());
        assert!(output.join("song-SATB.mid").is_file());
        assert!(!output.join("song-A.mid").exists());
    }

    #[test]
    fn test_part_export_contents() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let output = dir.path().join("out");

        let exporter = Choir2Midi::new(Config::default());
        exporter.export(&input, &output, None).unwrap();

        let bytes = read_midi(&output.join("song-S.mid"));
        let soprano_file = Smf::parse(&bytes).unwrap();
        assert_eq!(soprano_file.tracks.len(), 4);

        // Soprano sings at part volume with the women's instrument
        let soprano = &soprano_file.tracks[1];
        assert_eq!(first_program(soprano), Some(53)); // Voice Oohs
        assert_eq!(first_volume(soprano), Some(110));

        // Bass stays at the default level with the men's instrument
        let bass = &soprano_file.tracks[2];
        assert_eq!(first_program(bass), Some(52)); // Choir Aahs
        assert_eq!(first_volume(bass), Some(70));

        // Derived accompaniment follows the exported part on channel 2
        let piano = &soprano_file.tracks[3];
        assert_eq!(track_name(piano).as_deref(), Some("Piano for part"));
        assert_eq!(first_program(piano), Some(0));
        assert_eq!(first_volume(piano), Some(127));
        for channel in channels_of(piano) {
            assert_eq!(channel, 2);
        }
    }

    #[test]
    fn test_ensemble_export_has_no_accompaniment() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let output = dir.path().join("out");

        let exporter = Choir2Midi::new(Config::default());
        exporter.export(&input, &output, None).unwrap();

        let bytes = read_midi(&output.join("song-SATB.mid"));
        let satb = Smf::parse(&bytes).unwrap();
        assert_eq!(satb.tracks.len(), 3);
        assert_eq!(first_volume(&satb.tracks[1]), Some(90));
        assert_eq!(first_volume(&satb.tracks[2]), Some(90));
    }

    #[test]
    fn test_single_part_export_with_sidecar_settings() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        std::fs::write(
            dir.path().join("song.json"),
            r#"{"volumes": {"part": 120}}"#,
        )
        .unwrap();
        let output = dir.path().join("out");

        let exporter = Choir2Midi::new(Config::default());
        let written = exporter.export(&input, &output, Some("Soprano")).unwrap();
        assert_eq!(written, vec![output.join("song-S.mid")]);

        let bytes = read_midi(&output.join("song-S.mid"));
        let soprano_file = Smf::parse(&bytes).unwrap();
        assert_eq!(first_volume(&soprano_file.tracks[1]), Some(120));
    }

    #[test]
    fn test_single_export_of_unknown_part_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let output = dir.path().join("out");

        let exporter = Choir2Midi::new(Config::default());
        let result = exporter.export(&input, &output, Some("Countertenor"));
        assert!(matches!(
            result,
            Err(ChoirError::InvalidConfigParameter(_))
        ));
    }

    #[test]
    fn test_saturated_channels_export_without_accompaniment() {
        use choir2midi::export::export_part;
        use choir2midi::ExtraTrackSpec;
        use std::collections::HashMap;

        // Soprano plus a track referencing every MIDI channel: no channel is
        // left for the accompaniment, so the export must fall back to a
        // degraded file instead of failing
        let smf = Smf {
            header: Header {
                format: Format::Parallel,
                timing: Timing::Metrical(u15::new(480)),
            },
            tracks: vec![
                vec![
                    name_event("Soprano"),
                    program_change(0, 73),
                    volume_change(0, 100),
                    note_on(0, 72),
                    end_of_track(),
                ],
                (0..16)
                    .map(|ch| note_on(ch, 60))
                    .chain([end_of_track()])
                    .collect(),
            ],
        };

        let dir = tempfile::tempdir().unwrap();
        let output_file = dir.path().join("saturated-S.mid");
        let spec = ExtraTrackSpec {
            name: "Piano for part".to_string(),
            instrument: 0,
            volume: 127,
            melody_from: "Soprano".to_string(),
            replace_source_name: false,
        };
        export_part(
            &smf,
            &output_file,
            "Soprano",
            &HashMap::new(),
            &HashMap::new(),
            Some(110),
            Some(&spec),
        )
        .unwrap();

        // The degraded file is still written, with no track appended
        let bytes = read_midi(&output_file);
        let exported = Smf::parse(&bytes).unwrap();
        assert_eq!(exported.tracks.len(), smf.tracks.len());
        for track in &exported.tracks {
            assert_ne!(track_name(track).as_deref(), Some("Piano for part"));
        }
        // The part volume override was still applied
        assert_eq!(first_volume(&exported.tracks[0]), Some(110));
    }

    #[test]
    fn test_validate_input_checks_extension_and_existence() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let config = Config::default();

        assert!(choir2midi::validate_input(&input, &config).is_ok());
        assert!(choir2midi::validate_input(dir.path().join("missing.mid"), &config).is_err());

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "not midi").unwrap();
        assert!(choir2midi::validate_input(&text, &config).is_err());
    }
}

//! Validation tests for the General MIDI instrument table

#[cfg(test)]
mod tests {
    use choir2midi::instruments::{lookup, program_name};
    use choir2midi::ChoirError;

    #[test]
    fn test_lookup_known_instruments() {
        assert_eq!(lookup("Acoustic Grand Piano").unwrap(), 0);
        assert_eq!(lookup("Choir Aahs").unwrap(), 52);
        assert_eq!(lookup("Voice Oohs").unwrap(), 53);
        assert_eq!(lookup("Flute").unwrap(), 73);
        assert_eq!(lookup("Woodblock").unwrap(), 115);
        assert_eq!(lookup("Gunshot").unwrap(), 127);
    }

    #[test]
    fn test_lookup_unknown_instrument() {
        let result = lookup("Kazoo");
        assert!(matches!(
            result,
            Err(ChoirError::UnknownInstrument(name)) if name == "Kazoo"
        ));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(lookup("choir aahs").is_err());
    }

    #[test]
    fn test_program_name_round_trip() {
        for program in 0..=127u8 {
            let name = program_name(program).expect("every program has a name");
            assert_eq!(lookup(name).unwrap(), program);
        }
        assert_eq!(program_name(128), None);
    }
}

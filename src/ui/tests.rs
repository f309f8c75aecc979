//! Tests for the command-line interface

#[cfg(test)]
mod tests {
    use super::super::*;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_args_parsing() {
        use clap::CommandFactory;
        let app = Args::command();
        app.debug_assert();
    }

    #[test]
    fn test_args_from_command_line() {
        let args = Args::try_parse_from([
            "r-focusplay",
            "song.mp3",
            "--duck-volume",
            "0.3",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.media.as_deref(), Some("song.mp3"));
        assert_eq!(args.duck_volume, Some(0.3));
        assert!(args.dry_run);
        assert!(!args.list);
    }

    #[test]
    fn test_control_input_parsing() {
        assert_eq!("p".parse::<ControlInput>(), Ok(ControlInput::Pause));
        assert_eq!(" Resume \n".parse::<ControlInput>(), Ok(ControlInput::Resume));
        assert_eq!("q".parse::<ControlInput>(), Ok(ControlInput::Quit));
        assert_eq!("duck".parse::<ControlInput>(), Ok(ControlInput::Duck));
        assert_eq!("CALL".parse::<ControlInput>(), Ok(ControlInput::Call));
        assert_eq!("steal".parse::<ControlInput>(), Ok(ControlInput::Steal));
        assert!("dance".parse::<ControlInput>().is_err());
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("2\n", 3).unwrap(), 1);
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("two", 3).is_err());
    }

    #[test]
    fn test_format_position() {
        assert_eq!(format_position(Duration::from_secs(0)), "0:00");
        assert_eq!(format_position(Duration::from_millis(125_900)), "2:05");
    }
}

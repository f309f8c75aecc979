//! Command-line interface implementation

use clap::Parser;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use crate::library::MediaRecord;
use crate::player::{PlayerSnapshot, PlayerStateUpdate};

/// Command-line arguments for r-focusplay
#[derive(Parser, Debug)]
#[command(author, version, about = "Focus-aware audio player", long_about = None)]
pub struct Args {
    /// File path or http(s) URL to play. Without it the library is listed for selection.
    pub media: Option<String>,

    /// Directory scanned for playable media
    #[arg(short, long, env = "FOCUSPLAY_MEDIA_DIR")]
    pub media_dir: Option<PathBuf>,

    /// Config file path
    #[arg(short, long, env = "FOCUSPLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output gain while another client ducks us, in [0.0, 1.0]
    #[arg(long, env = "FOCUSPLAY_DUCK_VOLUME")]
    pub duck_volume: Option<f32>,

    /// List the library and exit
    #[arg(short, long)]
    pub list: bool,

    /// Use the scripted engine instead of decoding real audio
    #[arg(long)]
    pub dry_run: bool,
}

/// One interactive command read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlInput {
    Pause,
    Resume,
    Stop,
    Quit,
    /// Another client takes duckable focus for a moment.
    Duck,
    /// Another client takes transient focus, like an incoming call.
    Call,
    /// Another client takes focus for good, then gives it back later.
    Steal,
    Status,
    Help,
}

impl FromStr for ControlInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p" | "pause" => Ok(ControlInput::Pause),
            "r" | "resume" | "play" => Ok(ControlInput::Resume),
            "s" | "stop" => Ok(ControlInput::Stop),
            "q" | "quit" | "exit" => Ok(ControlInput::Quit),
            "duck" => Ok(ControlInput::Duck),
            "call" => Ok(ControlInput::Call),
            "steal" => Ok(ControlInput::Steal),
            "i" | "status" => Ok(ControlInput::Status),
            "h" | "help" | "?" => Ok(ControlInput::Help),
            other => Err(format!("Unknown command '{}'. Type 'h' for help.", other)),
        }
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli { args: Args::parse() }
    }

    /// Display the media library
    pub fn display_records(&self, records: &[MediaRecord]) {
        println!("\nAvailable Media:");
        println!("{:<5} {:<30} {:<20} {}", "#", "Title", "Artist", "Album");
        println!("{}", "-".repeat(80));

        for (index, record) in records.iter().enumerate() {
            println!(
                "{:<5} {:<30} {:<20} {}",
                index + 1,
                truncate(&record.title, 28),
                truncate(&record.artist, 18),
                record.album
            );
        }
        println!();
    }

    /// Prompt user to select a media record
    pub fn select_record<'a>(&self, records: &'a [MediaRecord]) -> Result<&'a MediaRecord, Box<dyn Error>> {
        if records.is_empty() {
            return Err("No media available".into());
        }

        print!("Enter the number of the track to play (1-{}): ", records.len());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        parse_selection(&input, records.len()).map(|index| &records[index])
    }

    pub fn display_help(&self) {
        println!("Commands: p pause, r resume, s stop, q quit, duck, call, steal, i status, h help");
    }

    /// Display one state update
    pub fn display_update(&self, update: &PlayerStateUpdate) {
        match update {
            PlayerStateUpdate::StateChanged { from, to } => println!("[state] {} -> {}", from, to),
            PlayerStateUpdate::FocusChanged { change, focus } => println!("[focus] {} (focus {})", change, focus),
            PlayerStateUpdate::VolumeChanged(volume) => {
                println!("[volume] left {:.2} right {:.2}", volume.left, volume.right)
            }
            // Progress is shown on demand through `status`.
            PlayerStateUpdate::Progress { .. } => {}
            PlayerStateUpdate::Error(e) => eprintln!("[error] {}", e),
            PlayerStateUpdate::Terminated => println!("[player] terminated"),
        }
    }

    pub fn display_snapshot(&self, snapshot: &PlayerSnapshot) {
        println!(
            "{} | focus {} | {} | {}",
            snapshot.session,
            snapshot.focus,
            format_position(snapshot.position),
            snapshot.locator.as_deref().unwrap_or("-")
        );
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a 1-based selection into an index.
pub fn parse_selection(input: &str, count: usize) -> Result<usize, Box<dyn Error>> {
    let selection = input.trim().parse::<usize>()?;
    if selection < 1 || selection > count {
        return Err(format!("Invalid selection. Please enter a number between 1 and {}", count).into());
    }
    Ok(selection - 1)
}

/// Formats a position as `m:ss`.
pub fn format_position(position: std::time::Duration) -> String {
    let secs = position.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

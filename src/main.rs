use r_focusplay::audio::{PlaybackEngine, ScriptedEngine, StreamCategory, SymphoniaEngine};
use r_focusplay::config::Settings;
use r_focusplay::focus::{AudioArbiter, FocusClientId, FocusGain, FocusRequest, LocalArbiter};
use r_focusplay::init_app_dirs;
use r_focusplay::library::{DirectoryLibrary, MediaSource};
use r_focusplay::player::{Player, PlayerHandle, PlayerOptions, PlayerStateUpdate};
use r_focusplay::ui::{Cli, ControlInput};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_TARGET: &str = "r_focusplay::main";

/// Length of the simulated track in dry-run mode.
const DRY_RUN_TRACK_LENGTH: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse command-line arguments and initialize CLI
    let cli = Cli::new();
    let args = &cli.args;

    // Initialize application directories
    init_app_dirs()?;

    // Load configuration from file or create default
    let config_path = args.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&config_path)?;

    // Command-line arguments (and their env fallbacks) win over the file
    if let Some(dir) = &args.media_dir {
        settings.media_dir = Some(dir.clone());
    }
    if let Some(duck_volume) = args.duck_volume {
        settings.duck_volume = duck_volume;
    }
    settings.validate()?;

    // Logs go to stderr so they do not interleave with the interactive output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(target: LOG_TARGET, config = %config_path.display(), "Settings loaded.");

    let locator = match (&args.media, args.list) {
        (Some(media), false) => media.clone(),
        _ => {
            let root = settings
                .media_dir
                .clone()
                .or_else(dirs::audio_dir)
                .unwrap_or_else(|| PathBuf::from("."));
            let records = DirectoryLibrary::new(root).list_media()?;
            cli.display_records(&records);
            if args.list {
                return Ok(());
            }
            cli.select_record(&records)?.locator.clone()
        }
    };

    let engine: Arc<dyn PlaybackEngine> = if args.dry_run {
        info!(target: LOG_TARGET, "Dry run: using the scripted engine.");
        Arc::new(
            ScriptedEngine::new()
                .with_auto_prepare()
                .with_realtime_clock()
                .with_track_length(DRY_RUN_TRACK_LENGTH),
        )
    } else {
        Arc::new(SymphoniaEngine::new())
    };
    let arbiter = Arc::new(LocalArbiter::new());
    let (handle, task) = Player::spawn(engine, arbiter.clone(), PlayerOptions::from(&settings));
    let mut updates = handle.subscribe();

    println!("\nPlaying: {}", locator);
    cli.display_help();
    if let Err(e) = handle.play_media(locator).await {
        cli.display_error(&e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => {
                        // stdin closed
                        let _ = handle.shutdown().await;
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ControlInput>() {
                    Ok(ControlInput::Quit) => {
                        let _ = handle.shutdown().await;
                        break;
                    }
                    Ok(input) => run_control(&cli, &handle, &arbiter, input).await,
                    Err(message) => eprintln!("{}", message),
                }
            }
            update = updates.recv() => match update {
                Ok(PlayerStateUpdate::Terminated) => {
                    cli.display_update(&PlayerStateUpdate::Terminated);
                    break;
                }
                Ok(update) => cli.display_update(&update),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: LOG_TARGET, skipped, "State updates lagged.");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    task.await?;
    Ok(())
}

async fn run_control(cli: &Cli, handle: &PlayerHandle, arbiter: &Arc<LocalArbiter>, input: ControlInput) {
    let result = match input {
        ControlInput::Pause => handle.pause_media().await,
        ControlInput::Resume => handle.resume_media().await,
        ControlInput::Stop => handle.stop_media().await,
        ControlInput::Status => handle.snapshot().await.map(|snapshot| cli.display_snapshot(&snapshot)),
        ControlInput::Help => {
            cli.display_help();
            Ok(())
        }
        ControlInput::Duck => {
            simulate_interruption(arbiter.clone(), FocusGain::GainTransientMayDuck, Duration::from_secs(3));
            Ok(())
        }
        ControlInput::Call => {
            simulate_interruption(arbiter.clone(), FocusGain::GainTransient, Duration::from_secs(5));
            Ok(())
        }
        ControlInput::Steal => {
            simulate_interruption(arbiter.clone(), FocusGain::Gain, Duration::from_secs(5));
            Ok(())
        }
        // Handled by the caller.
        ControlInput::Quit => Ok(()),
    };
    if let Err(e) = result {
        cli.display_error(&e);
    }
}

/// Another client takes focus with `gain`, holds it for `hold`, then gives it back.
fn simulate_interruption(arbiter: Arc<LocalArbiter>, gain: FocusGain, hold: Duration) {
    tokio::spawn(async move {
        let client = FocusClientId::next();
        let request = FocusRequest {
            client,
            category: StreamCategory::Notification,
            gain,
            listener: Arc::new(move |change| info!(target: LOG_TARGET, %client, %change, "Simulated client notified.")),
        };
        println!("[sim] {} takes focus ({:?}) for {}s", client, gain, hold.as_secs());
        arbiter.request_focus(request).await;
        tokio::time::sleep(hold).await;
        arbiter.abandon_focus(client).await;
        println!("[sim] {} released focus", client);
    });
}

use std::io::Write;
use std::sync::Arc;

use clap::Subcommand;
use pomowatch_core::error::Result as CoreResult;
use pomowatch_core::{
    AlertLoop, Config, Database, Event, HeadlessAlertLoop, SessionEngine, SystemClock,
    TokioAlertLoop,
};
use tokio::io::{AsyncBufReadExt, BufReader};

type CliEngine = SessionEngine<SystemClock, Database, Box<dyn AlertLoop>>;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the session
    Start,
    /// Pause the running session
    Pause,
    /// Pause if running, start otherwise
    Toggle,
    /// Reset to idle with nothing elapsed
    Reset,
    /// Set the session length in minutes (clamped to 1..=60)
    Duration {
        #[arg(allow_negative_numbers = true)]
        minutes: f64,
    },
    /// Switch between focus and break
    Mode,
    /// Dismiss a ringing session
    StopRinging,
    /// Print current timer state as JSON
    Status,
    /// Run in the foreground: tick once a second and ring when done.
    ///
    /// Reads commands from stdin: Enter/t toggle, r reset, m mode,
    /// s stop ringing, a number sets the duration, q quits.
    Watch,
}

fn open_engine(config: &Config, alerts: Box<dyn AlertLoop>) -> CoreResult<CliEngine> {
    let db = Database::open()?;
    Ok(SessionEngine::with_options(
        SystemClock,
        db,
        alerts,
        config.engine_options(),
    ))
}

fn print_json(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    match action {
        TimerAction::Start => one_shot(&config, |engine| engine.start()),
        TimerAction::Pause => one_shot(&config, |engine| engine.pause()),
        TimerAction::Toggle => one_shot(&config, |engine| engine.toggle()),
        TimerAction::Reset => one_shot(&config, |engine| engine.reset()),
        TimerAction::Duration { minutes } => {
            one_shot(&config, |engine| engine.set_duration(minutes))
        }
        TimerAction::Mode => one_shot(&config, |engine| engine.toggle_mode()),
        TimerAction::StopRinging => one_shot(&config, |engine| engine.stop_ringing()),
        TimerAction::Status => one_shot(&config, |engine| engine.tick()),
        TimerAction::Watch => watch(&config),
    }
}

/// Open the engine, apply one operation, and print the event and final snapshot.
fn one_shot<F>(config: &Config, apply: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut CliEngine) -> Option<Event>,
{
    // A one-shot process exits before a second pulse could fire.
    let mut engine = open_engine(config, Box::new(HeadlessAlertLoop::new()))?;
    if let Some(event) = apply(&mut engine) {
        print_json(&event)?;
    }
    print_json(&engine.snapshot())?;
    Ok(())
}

fn status_line(engine: &CliEngine) -> String {
    format!(
        "{} {} [{}] {}",
        engine.session_label(),
        engine.remaining_display(),
        engine.progress_band().as_str(),
        engine.state().kind().as_str(),
    )
}

/// Apply one stdin command. Returns false when the user asked to quit.
fn handle_command(engine: &mut CliEngine, line: &str) -> bool {
    let line = line.trim();
    let event = match line {
        "" | "t" => engine.toggle(),
        "r" => engine.reset(),
        "m" => engine.toggle_mode(),
        "s" => engine.stop_ringing(),
        "q" => return false,
        other => match other.parse::<f64>() {
            Ok(minutes) => engine.set_duration(minutes),
            Err(_) => {
                tracing::warn!(command = other, "unknown command");
                None
            }
        },
    };
    if let Some(event) = event {
        tracing::info!(?event, "command applied");
    }
    true
}

fn watch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    let alerts: Box<dyn AlertLoop> = if config.alert.enabled {
        let bell = config.alert.bell;
        let pulse = Arc::new(move || {
            let mut out = std::io::stderr();
            if bell {
                let _ = write!(out, "\x07");
            }
            let _ = writeln!(out, "\ntime's up");
        });
        Box::new(TokioAlertLoop::with_interval(
            runtime.handle().clone(),
            config.alert_interval(),
            pulse,
        ))
    } else {
        Box::new(HeadlessAlertLoop::new())
    };

    let mut engine = open_engine(config, alerts)?;
    let tick_interval = config.tick_interval();

    let result = runtime.block_on(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(event) = engine.tick() {
                        tracing::info!(?event, "session completed");
                    }
                    let mut out = std::io::stdout();
                    write!(out, "\r{}    ", status_line(&engine))?;
                    out.flush()?;
                }
                line = lines.next_line(), if stdin_open => {
                    match line? {
                        Some(line) => {
                            if !handle_command(&mut engine, &line) {
                                break;
                            }
                        }
                        None => stdin_open = false,
                    }
                }
                _ = &mut ctrl_c => break,
            }
        }
        println!();
        Ok::<(), Box<dyn std::error::Error>>(())
    });

    // A pending stdin read would otherwise hold shutdown until the next line.
    runtime.shutdown_background();
    result
}

mod app;

use action::Action;
use app::App;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Read;
use std::path::PathBuf;
use std::{error::Error, io, time::Duration};
use tursim::ProgramLoader;

/// Redraw interval. Machines run on their own workers; the UI only samples them.
const FRAME: Duration = Duration::from_millis(20);

/// Runs several Turing machines side by side in the terminal.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  tursim-tui programs/binary-increment.tm programs/ping-pong.tm
  cat programs/bit-flipper.tm | tursim-tui")]
struct Cli {
    /// Program files (.tm) to load, one machine each.
    /// If none are given, programs piped via stdin or the built-in programs are loaded.
    program_files: Vec<PathBuf>,
}

/// Represents the state of the application loop.
#[derive(PartialEq)]
enum AppState {
    Running,
    ShouldQuit,
}

/// A wrapper around the terminal to ensure it's restored on drop.
struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Tui {
    /// Creates a new TUI.
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Restore the terminal to its original state.
        // The results are ignored as we can't do much about errors during drop.
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Load programs before initializing the TUI so that errors can go to stderr
    // without interfering with the terminal's alternate screen.
    let app = match load_app(&cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize the TUI. The `Tui` struct will handle cleanup on drop.
    let mut tui = Tui::new()?;

    // Run the application. Machines are dropped (and their workers joined) with `app`.
    run_app(&mut tui.terminal, app)?;

    Ok(())
}

/// Builds the initial registry from CLI arguments.
///
/// It loads every file given on the command line, then tries stdin, and finally
/// falls back to the built-in programs.
fn load_app(cli: &Cli) -> Result<App, String> {
    let mut app = App::new();

    if !cli.program_files.is_empty() {
        for path in &cli.program_files {
            let program = ProgramLoader::load_program(path).map_err(|e| e.to_string())?;
            app.add(path.display().to_string(), &program)?;
        }
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        let program =
            ProgramLoader::load_program_from_string(&buffer).map_err(|e| e.to_string())?;
        app.add("stdin".to_string(), &program)?;
    } else {
        app.add_builtin_programs()?;
    }

    Ok(app)
}

/// Runs the main application loop.
fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        if event::poll(FRAME)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && handle_key_event(&mut app, key) == AppState::ShouldQuit
                {
                    return Ok(());
                }
            }
        }
    }
}

/// Handles key events and updates the application state.
fn handle_key_event(app: &mut App, key: KeyEvent) -> AppState {
    if app.is_editing() {
        match key.code {
            KeyCode::Enter => app.submit_input(),
            KeyCode::Esc => app.cancel_input(),
            KeyCode::Backspace => app.pop_input(),
            KeyCode::Char(c) => app.push_input(c),
            _ => {}
        }
        return AppState::Running;
    }

    if let Some(action) = app.keymap.get(&key) {
        match action {
            Action::Quit => return AppState::ShouldQuit,
            Action::Open => app.start_input(),
            Action::Previous => app.select_previous(),
            Action::Next => app.select_next(),
            Action::TogglePlay => app.toggle_running(),
            Action::Delete => app.delete_selected(),
            Action::Duplicate => app.duplicate_selected(),
            Action::ToggleHelp => app.toggle_help(),
        }
    }
    AppState::Running
}

use action::Action;
use keymap::{Config, KeyMapConfig};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Padding, Paragraph},
    Frame,
};
use std::ops::Range;
use std::path::Path;
use tursim::{Machine, Program, ProgramLoader, ProgramManager, Snapshot};

const BLOCK_PADDING: Padding = Padding::new(1, 1, 0, 0);
/// Lines used by one machine in the list, including the separator.
const PANEL_HEIGHT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Paused,
    Failed,
}

/// One registry entry: a running machine and where it came from.
struct Entry {
    name: String,
    machine: Machine,
}

/// The machine registry plus the UI state around it.
pub struct App {
    machines: Vec<Entry>,
    selected: usize,
    /// File name being typed, while the open prompt is shown.
    input: Option<String>,
    message: String,
    show_help: bool,
    pub(crate) keymap: Config<Action>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            machines: Vec::new(),
            selected: 0,
            input: None,
            message: "Press 'h' for help.".to_string(),
            show_help: false,
            keymap: Action::keymap_config(),
        }
    }

    /// Adds a stopped machine running `program` to the end of the registry.
    pub fn add(&mut self, name: String, program: &Program) -> Result<(), String> {
        let machine = program.machine().map_err(|e| e.to_string())?;
        self.machines.push(Entry { name, machine });
        Ok(())
    }

    pub fn add_builtin_programs(&mut self) -> Result<(), String> {
        for index in 0..ProgramManager::count() {
            if let (Some(name), Some(program)) = (
                ProgramManager::get_program_name(index),
                ProgramManager::get_program_by_index(index),
            ) {
                self.add(name.to_string(), &program)?;
            }
        }
        Ok(())
    }

    pub fn render(&mut self, f: &mut Frame) {
        let inner_area = f.area().inner(Margin::new(1, 0));

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Controls
                Constraint::Length(3), // Message or file prompt
                Constraint::Min(0),    // Machines or help
            ])
            .split(inner_area);

        self.render_controls(f, main_chunks[0]);
        self.render_message(f, main_chunks[1]);

        if self.show_help {
            self.render_help(f, main_chunks[2]);
        } else {
            self.render_machines(f, main_chunks[2]);
        }
    }

    fn render_controls(&self, f: &mut Frame, area: Rect) {
        let controls = if self.is_editing() {
            "enter: open   esc: cancel"
        } else {
            "r: open   w/s: navigate   e: play/pause   c: copy   x: delete   h: help   q: quit"
        };

        let paragraph = Paragraph::new(Line::from(Span::styled(
            controls,
            Style::default().fg(Color::White).bg(Color::Blue),
        )))
        .block(block("Tursim - Turing Machines (TUI)").title_alignment(Alignment::Center));

        f.render_widget(paragraph, area);
    }

    fn render_message(&self, f: &mut Frame, area: Rect) {
        let line = match &self.input {
            Some(filename) => Line::from(vec![
                Span::styled("File: ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{filename}_"),
                    Style::default().fg(Color::Black).bg(Color::White),
                ),
            ]),
            None => Line::from(Span::styled(
                self.message.as_str(),
                Style::default().fg(Color::Red),
            )),
        };

        f.render_widget(Paragraph::new(line).block(block("Status")), area);
    }

    fn render_machines(&self, f: &mut Frame, area: Rect) {
        let title = format!("Machines ({})", self.machines.len());
        let outer = block(&title);
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        if self.machines.is_empty() {
            f.render_widget(Text::from("No machines. Press 'r' to open a program."), inner);
            return;
        }

        let width = inner.width as usize;
        let mut lines = Vec::new();
        for (i, entry) in self.machines.iter().enumerate() {
            // One lock acquisition per machine per frame.
            let snapshot = entry.machine.snapshot();
            let run = if entry.machine.failed() {
                RunState::Failed
            } else if entry.machine.running() {
                RunState::Running
            } else {
                RunState::Paused
            };
            lines.extend(self.machine_lines(i, entry, &snapshot, run, width));
        }

        // Keep the selected panel on screen.
        let height = inner.height as usize;
        let offset =
            (self.selected * PANEL_HEIGHT).saturating_sub(height.saturating_sub(PANEL_HEIGHT));

        let paragraph = Paragraph::new(lines).scroll((offset as u16, 0));
        f.render_widget(paragraph, inner);
    }

    fn machine_lines<'a>(
        &self,
        index: usize,
        entry: &'a Entry,
        snapshot: &Snapshot,
        run: RunState,
        width: usize,
    ) -> Vec<Line<'a>> {
        let selected = index == self.selected;
        let marker = if selected {
            Span::styled(" ", Style::default().bg(Color::Red))
        } else {
            Span::raw(" ")
        };
        let title_style = if selected {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let (halted_text, halted_color) = if snapshot.halted() {
            ("Yes", Color::Green)
        } else {
            ("No", Color::Red)
        };
        let (run_text, run_color) = match (snapshot.halted(), run) {
            (true, _) => ("HALTED", Color::Green),
            (false, RunState::Failed) => ("FAILED", Color::Magenta),
            (false, RunState::Running) => ("RUNNING", Color::Yellow),
            (false, RunState::Paused) => ("PAUSED", Color::Blue),
        };

        let window = tape_window(snapshot.tape.len(), snapshot.cursor, width.saturating_sub(2));
        let tape_spans = snapshot.tape[window.clone()]
            .iter()
            .enumerate()
            .map(|(i, &symbol)| {
                if window.start + i == snapshot.cursor {
                    Span::styled(
                        symbol.to_string(),
                        Style::default()
                            .bg(Color::Yellow)
                            .fg(Color::Black)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw(symbol.to_string())
                }
            });
        let caret = format!("{}^", " ".repeat(snapshot.cursor - window.start));

        vec![
            Line::from(vec![
                marker.clone(),
                Span::styled(format!("#{index} {}", entry.name), title_style),
            ]),
            Line::from(vec![
                marker.clone(),
                Span::raw("Halted: "),
                Span::styled(halted_text, Style::default().fg(halted_color)),
                Span::raw("  State: "),
                Span::styled(snapshot.state.clone(), Style::default().fg(Color::Yellow)),
                Span::raw(format!("  Steps: {}  ", snapshot.steps)),
                Span::styled(run_text, Style::default().fg(run_color)),
            ]),
            Line::from(std::iter::once(marker.clone()).chain(tape_spans).collect::<Vec<_>>()),
            Line::from(vec![
                marker,
                Span::styled(caret, Style::default().fg(Color::Magenta)),
            ]),
            Line::from(""),
        ]
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from("Controls:"),
            Line::from("  r - Open a program file as a new machine"),
            Line::from("  w / Up - Select previous machine"),
            Line::from("  s / Down - Select next machine"),
            Line::from("  e / Space - Play or pause the selected machine"),
            Line::from("  c - Copy the selected machine"),
            Line::from("  x - Delete the selected machine"),
            Line::from("  h - Toggle this help"),
            Line::from("  q - Quit"),
            Line::from(""),
            Line::from("Program format:"),
            Line::from("  <tape> <start> { <state> <read> <write> <L|R> <next> }*"),
            Line::from("  Machines start in state 0 and halt when no rule matches"),
            Line::from("  or the head would leave the tape."),
        ];

        f.render_widget(Paragraph::new(help_text).block(block("Help")), area);
    }

    pub fn is_editing(&self) -> bool {
        self.input.is_some()
    }

    pub fn start_input(&mut self) {
        self.input = Some(String::new());
    }

    pub fn cancel_input(&mut self) {
        self.input = None;
    }

    pub fn push_input(&mut self, c: char) {
        if let Some(input) = &mut self.input {
            input.push(c);
        }
    }

    pub fn pop_input(&mut self) {
        if let Some(input) = &mut self.input {
            input.pop();
        }
    }

    /// Loads the typed file name as a new machine.
    pub fn submit_input(&mut self) {
        let Some(filename) = self.input.take() else {
            return;
        };

        let result = ProgramLoader::load_program(Path::new(&filename))
            .map_err(|e| e.to_string())
            .and_then(|program| self.add(filename.clone(), &program));

        self.message = match result {
            Ok(()) => {
                self.selected = self.machines.len() - 1;
                format!("Loaded {filename}")
            }
            Err(e) => format!("Error: {}", first_line(&e)),
        };
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.machines.len() {
            self.selected += 1;
        }
    }

    pub fn toggle_running(&mut self) {
        if let Some(entry) = self.machines.get(self.selected) {
            let running = !entry.machine.running();
            entry.machine.set_running(running);
            self.message = format!(
                "#{} {}",
                self.selected,
                if running { "started" } else { "paused" }
            );
        }
    }

    /// Removes the selected machine. Dropping it stops and joins its worker.
    pub fn delete_selected(&mut self) {
        if self.selected >= self.machines.len() {
            return;
        }

        self.machines.remove(self.selected);

        if self.selected >= self.machines.len() {
            self.selected = self.machines.len().saturating_sub(1);
        }
        self.message = "Machine removed".to_string();
    }

    /// Appends a copy of the selected machine in its current configuration.
    pub fn duplicate_selected(&mut self) {
        let Some(entry) = self.machines.get(self.selected) else {
            return;
        };

        match entry.machine.try_clone() {
            Ok(machine) => {
                let name = format!("{} (copy)", entry.name);
                self.machines.push(Entry { name, machine });
                self.message = format!("Copied #{}", self.selected);
            }
            Err(e) => self.message = format!("Error: {e}"),
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}

/// The slice of a tape of `len` cells to show in `width` columns, keeping `cursor` visible.
fn tape_window(len: usize, cursor: usize, width: usize) -> Range<usize> {
    if width == 0 || len <= width {
        return 0..len;
    }
    let start = cursor.saturating_sub(width / 2).min(len - width);
    start..start + width
}

/// Pest errors span several lines; the status line only has room for one.
fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

fn block(title: &str) -> Block {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" {title} "))
        .padding(BLOCK_PADDING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tape_window_fits() {
        assert_eq!(tape_window(5, 4, 10), 0..5);
        assert_eq!(tape_window(5, 4, 0), 0..5);
    }

    #[test]
    fn test_tape_window_follows_cursor() {
        assert_eq!(tape_window(100, 0, 10), 0..10);
        assert_eq!(tape_window(100, 50, 10), 45..55);
        assert_eq!(tape_window(100, 99, 10), 90..100);
    }

    #[test]
    fn test_registry_navigation_and_delete() {
        let mut app = App::new();
        app.add_builtin_programs().unwrap();
        let count = app.machines.len();
        assert!(count >= 2);

        app.select_previous();
        assert_eq!(app.selected, 0);

        for _ in 0..count + 3 {
            app.select_next();
        }
        assert_eq!(app.selected, count - 1);

        app.delete_selected();
        assert_eq!(app.machines.len(), count - 1);
        assert_eq!(app.selected, count - 2);
    }

    #[test]
    fn test_toggle_and_duplicate() {
        let mut app = App::new();
        app.add_builtin_programs().unwrap();

        app.toggle_running();
        assert!(app.machines[0].machine.running());

        app.duplicate_selected();
        let copy = app.machines.last().unwrap();
        assert!(copy.name.ends_with("(copy)"));
        assert!(copy.machine.running());

        app.toggle_running();
        assert!(!app.machines[0].machine.running());
    }

    #[test]
    fn test_submit_missing_file() {
        let mut app = App::new();
        app.start_input();
        for c in "does-not-exist.tm".chars() {
            app.push_input(c);
        }
        app.submit_input();

        assert!(!app.is_editing());
        assert!(app.machines.is_empty());
        assert!(app.message.starts_with("Error:"));
    }
}

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pitboard_console::{ConsoleCommand, ConsoleHandle};
use pitboard_types::{
    events::{EventPayload, NoticeLevel, SystemEvent},
    roster::Entrant,
    rounds::RecordKind,
    time_codec,
    view::{ConnectionStatus, ConsoleView, TimerTone},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};

const MAX_LOG_ENTRIES: usize = 120;
const INPUT_POLL: Duration = Duration::from_millis(15);

pub enum UiMessage {
    Event(SystemEvent),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Normal,
    EnterTime(String),
    RemoveRecord,
    Confirm(ConsoleCommand),
    LoadRoster(String),
    EditEntrant { field: EntrantField, draft: Entrant },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EntrantField {
    Number,
    Name,
    Robot,
}

impl EntrantField {
    fn next(self) -> Option<Self> {
        match self {
            Self::Number => Some(Self::Name),
            Self::Name => Some(Self::Robot),
            Self::Robot => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Name => "Name",
            Self::Robot => "Robot",
        }
    }

    fn value(self, entrant: &Entrant) -> &str {
        match self {
            Self::Number => &entrant.number,
            Self::Name => &entrant.name,
            Self::Robot => &entrant.robot_name,
        }
    }

    fn value_mut(self, entrant: &mut Entrant) -> &mut String {
        match self {
            Self::Number => &mut entrant.number,
            Self::Name => &mut entrant.name,
            Self::Robot => &mut entrant.robot_name,
        }
    }
}

#[derive(Debug, PartialEq)]
enum KeyOutcome {
    Nothing,
    Send(ConsoleCommand),
    Quit,
}

struct App {
    view: ConsoleView,
    logs: VecDeque<(NoticeLevel, String)>,
    mode: Mode,
    summary: String,
}

impl App {
    fn new(summary: String) -> Self {
        Self {
            view: ConsoleView::default(),
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            mode: Mode::Normal,
            summary,
        }
    }

    fn apply(&mut self, event: SystemEvent) {
        let timestamp = event.timestamp.format("%H:%M:%S");
        match event.payload {
            EventPayload::View(view) => self.view = *view,
            EventPayload::Notice(notice) => {
                self.push_log(notice.level, format!("[{timestamp}] {}", notice.message));
            }
            EventPayload::Lifecycle(lifecycle) => self.push_log(
                NoticeLevel::Info,
                format!(
                    "[{timestamp}] {:?} {}",
                    lifecycle.phase,
                    lifecycle.details.unwrap_or_default()
                ),
            ),
        }
    }

    fn push_log(&mut self, level: NoticeLevel, line: String) {
        if self.logs.len() == MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back((level, line));
    }

    fn on_key(&mut self, code: KeyCode) -> KeyOutcome {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.on_normal_key(code),
            Mode::EnterTime(mut buffer) => match code {
                KeyCode::Enter if !buffer.trim().is_empty() => {
                    KeyOutcome::Send(ConsoleCommand::EnterTime(buffer))
                }
                KeyCode::Esc | KeyCode::Enter => KeyOutcome::Nothing,
                KeyCode::Backspace => {
                    buffer.pop();
                    self.mode = Mode::EnterTime(buffer);
                    KeyOutcome::Nothing
                }
                KeyCode::Char(c) if c.is_ascii_digit() || c == ':' || c == '.' => {
                    buffer.push(c);
                    self.mode = Mode::EnterTime(buffer);
                    KeyOutcome::Nothing
                }
                _ => {
                    self.mode = Mode::EnterTime(buffer);
                    KeyOutcome::Nothing
                }
            },
            Mode::RemoveRecord => match code {
                KeyCode::Char(c @ '1'..='9') => {
                    let index = c as usize - '1' as usize;
                    KeyOutcome::Send(ConsoleCommand::RemoveRecord(index))
                }
                _ => KeyOutcome::Nothing,
            },
            Mode::Confirm(command) => match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => KeyOutcome::Send(command),
                _ => KeyOutcome::Nothing,
            },
            Mode::LoadRoster(mut path) => match code {
                KeyCode::Enter if !path.trim().is_empty() => {
                    KeyOutcome::Send(ConsoleCommand::LoadRoster(PathBuf::from(path.trim())))
                }
                KeyCode::Esc | KeyCode::Enter => KeyOutcome::Nothing,
                code => {
                    edit_text(&mut path, code);
                    self.mode = Mode::LoadRoster(path);
                    KeyOutcome::Nothing
                }
            },
            Mode::EditEntrant { field, mut draft } => match code {
                KeyCode::Esc => KeyOutcome::Nothing,
                KeyCode::Enter | KeyCode::Tab => match field.next() {
                    Some(field) => {
                        self.mode = Mode::EditEntrant { field, draft };
                        KeyOutcome::Nothing
                    }
                    None => KeyOutcome::Send(ConsoleCommand::EditEntrant(draft)),
                },
                code => {
                    edit_text(field.value_mut(&mut draft), code);
                    self.mode = Mode::EditEntrant { field, draft };
                    KeyOutcome::Nothing
                }
            },
        }
    }

    fn on_normal_key(&mut self, code: KeyCode) -> KeyOutcome {
        let command = match code {
            KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
            KeyCode::Char('c') => ConsoleCommand::ConnectDevice,
            KeyCode::Char('d') => ConsoleCommand::DisconnectDevice,
            KeyCode::Char(' ') => ConsoleCommand::ToggleStopwatch,
            KeyCode::Char('z') => ConsoleCommand::ResetStopwatch,
            KeyCode::Char('t') => ConsoleCommand::ToggleRoundClock,
            KeyCode::Char('T') => ConsoleCommand::ResetRoundClock,
            KeyCode::Enter => ConsoleCommand::CommitReceived,
            KeyCode::Char('r') => ConsoleCommand::Retire,
            KeyCode::Char('n') => ConsoleCommand::NextEntrant,
            KeyCode::Char('a') => ConsoleCommand::ToggleAutoCommit,
            KeyCode::Char('u') => ConsoleCommand::UpdateLeaderboard,
            KeyCode::Char('e') => {
                self.mode = Mode::EnterTime(String::new());
                return KeyOutcome::Nothing;
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                self.mode = Mode::RemoveRecord;
                return KeyOutcome::Nothing;
            }
            KeyCode::Char('C') => {
                self.mode = Mode::Confirm(ConsoleCommand::ClearRecords);
                return KeyOutcome::Nothing;
            }
            KeyCode::Char('L') => {
                self.mode = Mode::Confirm(ConsoleCommand::ClearLeaderboard);
                return KeyOutcome::Nothing;
            }
            KeyCode::Char('o') => {
                self.mode = Mode::LoadRoster(String::new());
                return KeyOutcome::Nothing;
            }
            KeyCode::Char('E') => {
                self.mode = Mode::EditEntrant {
                    field: EntrantField::Number,
                    draft: self.view.entrant.clone(),
                };
                return KeyOutcome::Nothing;
            }
            _ => return KeyOutcome::Nothing,
        };
        KeyOutcome::Send(command)
    }

    fn prompt(&self) -> String {
        match &self.mode {
            Mode::Normal => "space stopwatch · z reset · t/T round clock · e enter time · \
                             enter commit · r retire · x remove · C clear · n next · \
                             a auto · u leaderboard · L clear board · o open list · \
                             E edit entrant · c/d gate · q quit"
                .to_string(),
            Mode::EnterTime(buffer) => format!("Time (MM:SS.mmm or seconds): {buffer}_"),
            Mode::RemoveRecord => "Remove which record? 1-9, any other key cancels".to_string(),
            Mode::Confirm(ConsoleCommand::ClearLeaderboard) => {
                "Clear the whole leaderboard? y/n".to_string()
            }
            Mode::Confirm(_) => "Clear all records of this entrant? y/n".to_string(),
            Mode::LoadRoster(path) => format!("Entry list path: {path}_"),
            Mode::EditEntrant { field, draft } => format!(
                "{}: {}_  (enter next, esc cancel)",
                field.label(),
                field.value(draft)
            ),
        }
    }
}

fn edit_text(buffer: &mut String, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) => buffer.push(c),
        _ => {}
    }
}

pub fn run(receiver: Receiver<UiMessage>, console: ConsoleHandle, summary: String) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, &console, summary);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    console: &ConsoleHandle,
    summary: String,
) -> Result<()> {
    let mut app = App::new(summary);

    loop {
        loop {
            match receiver.try_recv() {
                Ok(UiMessage::Event(event)) => app.apply(event),
                Ok(UiMessage::Shutdown) | Err(TryRecvError::Disconnected) => return Ok(()),
                Err(TryRecvError::Empty) => break,
            }
        }

        terminal.draw(|f| draw(f, &app))?;

        if event::poll(INPUT_POLL)? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.on_key(key.code) {
                    KeyOutcome::Nothing => {}
                    KeyOutcome::Send(command) => console.blocking_send(command)?,
                    KeyOutcome::Quit => break,
                }
            }
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let view = &app.view;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(9),
                Constraint::Length(9),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let connection = match view.connection {
        ConnectionStatus::Connected => {
            Span::styled("gate connected", Style::default().fg(Color::Green))
        }
        ConnectionStatus::Disconnected => {
            Span::styled("gate offline", Style::default().fg(Color::Red))
        }
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} {}", view.entrant.number, view.entrant.name),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  robot: {}", view.entrant.robot_or_default())),
        Span::raw(format!(
            "  entry {}/{}",
            view.roster_index + 1,
            view.roster_len
        )),
        Span::raw("  "),
        connection,
        Span::raw("  "),
        Span::styled(app.summary.as_str(), Style::default().fg(Color::Magenta)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Pitboard"));
    f.render_widget(header, rows[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[1]);
    f.render_widget(timers(view), middle[0]);
    f.render_widget(records(view), middle[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[2]);
    f.render_widget(standings(view), bottom[0]);
    f.render_widget(logs(app, bottom[1].height as usize), bottom[1]);

    let footer = Paragraph::new(app.prompt())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, rows[3]);
}

fn timers(view: &ConsoleView) -> Paragraph<'static> {
    let tone = match view.live.tone {
        TimerTone::Idle => Color::White,
        TimerTone::Running => Color::Green,
        TimerTone::Final => Color::Yellow,
        TimerTone::Ready => Color::Cyan,
    };
    let clock_style = if view.round_clock_secs == 0 {
        Style::default().fg(Color::Red)
    } else if view.round_clock_running {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };
    let position = view
        .position
        .map_or_else(|| "-".to_string(), |p| p.to_string());

    Paragraph::new(vec![
        Line::from(vec![
            Span::raw("Live      "),
            Span::styled(
                time_codec::format_seconds(view.live.seconds),
                Style::default().fg(tone).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "Received  {}",
            time_codec::format(view.received_time)
        )),
        Line::from(vec![
            Span::raw("Round clk "),
            Span::styled(time_codec::format_clock(view.round_clock_secs), clock_style),
        ]),
        Line::from(format!("Best      {}", time_codec::format(view.best_time))),
        Line::from(format!("Position  {position}")),
        Line::from(format!(
            "Auto      {}",
            if view.auto_commit { "on" } else { "off" }
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title("Timers"))
}

fn records(view: &ConsoleView) -> List<'static> {
    let items: Vec<ListItem> = view
        .records
        .iter()
        .enumerate()
        .map(|(slot, record)| {
            let value = match record.kind {
                RecordKind::Time => time_codec::format(record.time),
                RecordKind::Retired => "RETIRED".to_string(),
            };
            let best = record.is_time() && record.time == view.best_time;
            let style = if best {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}. round {}  {value}", slot + 1, record.round)).style(style)
        })
        .collect();
    let title = format!(
        "Records (next round {}/{})",
        view.current_round, view.max_rounds
    );
    List::new(items).block(Block::default().borders(Borders::ALL).title(title))
}

fn standings(view: &ConsoleView) -> List<'static> {
    let items: Vec<ListItem> = view
        .standings
        .iter()
        .enumerate()
        .map(|(rank, entry)| {
            ListItem::new(format!(
                "{}. {}  {}",
                rank + 1,
                entry.display_name(),
                time_codec::format(Some(entry.best_time))
            ))
        })
        .collect();
    List::new(items).block(Block::default().borders(Borders::ALL).title("Leaderboard"))
}

fn logs(app: &App, height: usize) -> List<'static> {
    let items: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .take(height.saturating_sub(2))
        .map(|(level, line)| {
            let color = match level {
                NoticeLevel::Info => Color::Gray,
                NoticeLevel::Warning => Color::Yellow,
                NoticeLevel::Error => Color::Red,
            };
            ListItem::new(line.clone()).style(Style::default().fg(color))
        })
        .collect();
    List::new(items).block(Block::default().borders(Borders::ALL).title("Notices"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new("test".into())
    }

    #[test]
    fn manual_time_entry_collects_digits() {
        let mut app = app();
        assert_eq!(app.on_key(KeyCode::Char('e')), KeyOutcome::Nothing);
        for c in "01:2x3.5".chars() {
            assert_eq!(app.on_key(KeyCode::Char(c)), KeyOutcome::Nothing);
        }
        app.on_key(KeyCode::Backspace);
        assert_eq!(
            app.on_key(KeyCode::Enter),
            KeyOutcome::Send(ConsoleCommand::EnterTime("01:23.".into()))
        );
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn destructive_keys_need_confirmation() {
        let mut app = app();
        assert_eq!(app.on_key(KeyCode::Char('C')), KeyOutcome::Nothing);
        assert_eq!(app.on_key(KeyCode::Char('n')), KeyOutcome::Nothing);
        assert_eq!(app.mode, Mode::Normal);

        app.on_key(KeyCode::Char('L'));
        assert_eq!(
            app.on_key(KeyCode::Char('y')),
            KeyOutcome::Send(ConsoleCommand::ClearLeaderboard)
        );
    }

    #[test]
    fn remove_record_takes_one_based_slot() {
        let mut app = app();
        app.on_key(KeyCode::Char('x'));
        assert_eq!(
            app.on_key(KeyCode::Char('2')),
            KeyOutcome::Send(ConsoleCommand::RemoveRecord(1))
        );
    }

    #[test]
    fn plain_keys_map_to_commands() {
        let mut app = app();
        assert_eq!(
            app.on_key(KeyCode::Enter),
            KeyOutcome::Send(ConsoleCommand::CommitReceived)
        );
        assert_eq!(
            app.on_key(KeyCode::Char('n')),
            KeyOutcome::Send(ConsoleCommand::NextEntrant)
        );
        assert_eq!(app.on_key(KeyCode::Char('q')), KeyOutcome::Quit);
    }

    #[test]
    fn open_list_sends_typed_path() {
        let mut app = app();
        app.on_key(KeyCode::Char('o'));
        for c in "entries.csvv".chars() {
            app.on_key(KeyCode::Char(c));
        }
        app.on_key(KeyCode::Backspace);
        assert_eq!(app.prompt(), "Entry list path: entries.csv_");
        assert_eq!(
            app.on_key(KeyCode::Enter),
            KeyOutcome::Send(ConsoleCommand::LoadRoster(PathBuf::from("entries.csv")))
        );

        app.on_key(KeyCode::Char('o'));
        assert_eq!(app.on_key(KeyCode::Enter), KeyOutcome::Nothing);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn edit_entrant_walks_fields_from_current() {
        let mut app = app();
        app.view.entrant = Entrant::new("#001", "Ada", "Byte");
        app.on_key(KeyCode::Char('E'));
        for _ in 0..3 {
            app.on_key(KeyCode::Backspace);
        }
        for c in "042".chars() {
            app.on_key(KeyCode::Char(c));
        }
        assert_eq!(app.on_key(KeyCode::Enter), KeyOutcome::Nothing);
        assert_eq!(app.on_key(KeyCode::Tab), KeyOutcome::Nothing);
        app.on_key(KeyCode::Char('2'));
        assert_eq!(
            app.on_key(KeyCode::Enter),
            KeyOutcome::Send(ConsoleCommand::EditEntrant(Entrant::new("#042", "Ada", "Byte2")))
        );
    }

    #[test]
    fn edit_entrant_cancels_on_escape() {
        let mut app = app();
        app.on_key(KeyCode::Char('E'));
        app.on_key(KeyCode::Char('9'));
        assert_eq!(app.on_key(KeyCode::Esc), KeyOutcome::Nothing);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn notices_are_kept_in_a_bounded_log() {
        let mut app = app();
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            app.apply(SystemEvent::notice(
                pitboard_types::events::Notice::info(format!("n{i}")),
            ));
        }
        assert_eq!(app.logs.len(), MAX_LOG_ENTRIES);
        assert!(app.logs.back().is_some_and(|(_, line)| line.ends_with("n124")));
    }
}

use crate::announcement::{self, Announcement};
use crate::model::{PauseChange, Schedule};
use crate::parser::clock_label;
use crate::projector::{future_items, previous_items, project, Countdown, DisplayColor, ScheduleItem};
use crate::settings::{self, DisplayPreferences};
use crate::storage::{load_schedule, save_schedule, FileStore, RefreshWatcher};
use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_secs(1);
const STATUS_TTL: Duration = Duration::from_secs(2);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Role {
    /// Sole writer: operator commands mutate and persist the schedule.
    Control,
    /// Read-only mirror of whatever the control surface last wrote.
    Display,
}

pub fn run(store: FileStore, role: Role) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store, role);
    let result = app
        .refresh()
        .and_then(|_| app.event_loop(&mut terminal));
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    store: FileStore,
    role: Role,
    schedule: Schedule,
    watcher: RefreshWatcher,
    prefs: DisplayPreferences,
    countdown: Countdown,
    future: Vec<ScheduleItem>,
    previous: Vec<ScheduleItem>,
    announcement: Option<Announcement>,
    focus: ListFocus,
    future_idx: usize,
    previous_idx: usize,
    mode: Mode,
    status: String,
    status_at: Instant,
    last_tick: Instant,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ListFocus {
    Upcoming,
    Previous,
}

enum Mode {
    Normal,
    ConfirmEndProgramme,
}

impl App {
    fn new(store: FileStore, role: Role) -> Self {
        let status = format!("Following {}", store.location().path.display());
        App {
            store,
            role,
            schedule: Schedule::new(),
            watcher: RefreshWatcher::new(),
            prefs: DisplayPreferences::default(),
            countdown: project(&[], Utc::now()),
            future: Vec::new(),
            previous: Vec::new(),
            announcement: None,
            focus: ListFocus::Upcoming,
            future_idx: 0,
            previous_idx: 0,
            mode: Mode::Normal,
            status,
            status_at: Instant::now(),
            last_tick: Instant::now(),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            if self.last_tick.elapsed() >= TICK {
                self.refresh()?;
            }
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// One countdown tick: pick up changes from the store, then re-project.
    fn refresh(&mut self) -> Result<()> {
        self.last_tick = Instant::now();
        self.store.reload()?;
        if self.watcher.poll(&self.store)? {
            self.schedule = load_schedule(&self.store)?;
            self.prefs = settings::load(&self.store)?;
        }
        let now = Utc::now();
        self.announcement = announcement::current(&self.store, now)?;
        self.reproject();
        Ok(())
    }

    fn reproject(&mut self) {
        let now = Utc::now();
        let activities = self.schedule.activities();
        self.countdown = project(activities, now);
        self.future = future_items(activities, now);
        self.previous = previous_items(activities, now);
        self.future_idx = self.future_idx.min(self.future.len().saturating_sub(1));
        self.previous_idx = self.previous_idx.min(self.previous.len().saturating_sub(1));
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if let KeyCode::Char('q') = key.code {
            return Ok(true);
        }
        match self.role {
            Role::Display => Ok(false),
            Role::Control => match self.mode {
                Mode::Normal => self.handle_control_key(key),
                Mode::ConfirmEndProgramme => self.handle_confirm_key(key),
            },
        }
    }

    fn handle_control_key(&mut self, key: KeyEvent) -> Result<bool> {
        let now = Utc::now();
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    ListFocus::Upcoming => ListFocus::Previous,
                    ListFocus::Previous => ListFocus::Upcoming,
                };
            }
            KeyCode::Up | KeyCode::Char('k') => match self.focus {
                ListFocus::Upcoming => self.future_idx = self.future_idx.saturating_sub(1),
                ListFocus::Previous => self.previous_idx = self.previous_idx.saturating_sub(1),
            },
            KeyCode::Down | KeyCode::Char('j') => match self.focus {
                ListFocus::Upcoming if self.future_idx + 1 < self.future.len() => {
                    self.future_idx += 1
                }
                ListFocus::Previous if self.previous_idx + 1 < self.previous.len() => {
                    self.previous_idx += 1
                }
                _ => {}
            },
            KeyCode::Char('n') => match self.schedule.start_next(now) {
                Ok(idx) => {
                    let title = self.schedule.activities()[idx].title.clone();
                    self.persist(format!("Started: {}", title))?;
                }
                Err(err) => self.set_status(err.to_string()),
            },
            KeyCode::Char('e') => match self.schedule.end_current(now) {
                Ok(idx) => {
                    let title = self.schedule.activities()[idx].title.clone();
                    self.persist(format!("Ended: {}", title))?;
                }
                Err(err) => self.set_status(err.to_string()),
            },
            KeyCode::Char('p') | KeyCode::Char(' ') => match self.schedule.toggle_pause(now) {
                Ok(PauseChange::Paused) => self.persist("Paused")?,
                Ok(PauseChange::Resumed) => self.persist("Resumed")?,
                Err(err) => self.set_status(err.to_string()),
            },
            KeyCode::Char('s') | KeyCode::Enter if self.focus == ListFocus::Upcoming => {
                let Some(item) = self.future.get(self.future_idx).cloned() else {
                    self.set_status("Nothing upcoming to select");
                    return Ok(false);
                };
                match self.schedule.select_skip_target(item.index) {
                    Ok(()) => self.persist(format!(
                        "Selected activity: {}. Press n to begin.",
                        item.title
                    ))?,
                    Err(err) => self.set_status(err.to_string()),
                }
            }
            KeyCode::Char('r') | KeyCode::Enter if self.focus == ListFocus::Previous => {
                let Some(item) = self.previous.get(self.previous_idx).cloned() else {
                    self.set_status("Nothing earlier to re-start");
                    return Ok(false);
                };
                match self.schedule.restart_activity(item.index, now) {
                    Ok(()) => self.persist(format!("Re-started: {}", item.title))?,
                    Err(err) => self.set_status(err.to_string()),
                }
            }
            KeyCode::Char('x') => {
                self.mode = Mode::ConfirmEndProgramme;
                self.set_status("End the programme and clear it? (y to confirm, n/Esc to cancel)");
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.schedule.end_programme();
                self.persist("Programme ended and cleared.")?;
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.set_status("End programme canceled");
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn persist(&mut self, message: impl Into<String>) -> Result<()> {
        save_schedule(&mut self.store, &self.schedule, Utc::now())?;
        self.set_status(message);
        self.reproject();
        Ok(())
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.status_at = Instant::now();
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        if self.role == Role::Display && self.prefs.always_fullscreen {
            self.draw_countdown(f, f.size());
            return;
        }

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(layout[1]);
        self.draw_countdown(f, body[0]);
        self.draw_lists(f, body[1]);
        self.draw_footer(f, layout[2]);

        if let Mode::ConfirmEndProgramme = self.mode {
            self.draw_confirm(f);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let role = match self.role {
            Role::Control => "control",
            Role::Display => "display",
        };
        let title = Line::from(vec![
            Span::styled(
                "nowplaying ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(role, Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.store.location().path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} activities", self.schedule.activities().len()),
                Style::default().fg(Color::Magenta),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_countdown(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let color = color_for(self.countdown.color);
        let mut clock_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
        if self.countdown.remaining_ms.is_some_and(|ms| ms < 0) && !self.countdown.paused {
            clock_style = clock_style.add_modifier(Modifier::SLOW_BLINK);
        }
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                self.countdown.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(self.countdown.remaining.clone(), clock_style)),
        ];
        if self.countdown.paused {
            lines.push(Line::from(Span::styled(
                "paused",
                Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            )));
        }
        if let Some(notice) = &self.announcement {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                notice.text.clone(),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
        }
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Now"));
        f.render_widget(paragraph, area);
    }

    fn draw_lists(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let halves = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        let skip = self.schedule.skip_target();
        let running = self.countdown.index;
        self.draw_list(
            f,
            halves[0],
            "Upcoming",
            &self.future,
            self.future_idx,
            self.focus == ListFocus::Upcoming,
            |idx| {
                if Some(idx) == running {
                    ">"
                } else if Some(idx) == skip {
                    "*"
                } else {
                    " "
                }
            },
        );
        self.draw_list(
            f,
            halves[1],
            "Previous",
            &self.previous,
            self.previous_idx,
            self.focus == ListFocus::Previous,
            |idx| if Some(idx) == running { ">" } else { " " },
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_list<M>(
        &self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        title: &str,
        items: &[ScheduleItem],
        selected: usize,
        focused: bool,
        marker: M,
    ) where
        M: Fn(usize) -> &'static str,
    {
        let rows: Vec<ListItem> = items
            .iter()
            .map(|item| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{} ", marker(item.index))),
                    Span::styled(
                        format!("{:>5} ", clock_label(item.scheduled_start)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(item.title.clone()),
                ]))
            })
            .collect();
        let border = if focused && self.role == Role::Control {
            Color::LightCyan
        } else {
            Color::DarkGray
        };
        let list = List::new(rows)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(title.to_string()),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::LightCyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
        let mut state = ListState::default();
        if focused && self.role == Role::Control && !items.is_empty() {
            state.select(Some(selected));
        }
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let message = if self.status_at.elapsed() < STATUS_TTL
            || matches!(self.mode, Mode::ConfirmEndProgramme)
        {
            self.status.clone()
        } else {
            String::new()
        };
        let status = Paragraph::new(message)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::LightCyan));
        match self.role {
            Role::Display => Line::from(vec![key("q"), Span::raw(" quit")]),
            Role::Control => Line::from(vec![
                key("n"),
                Span::raw(" next  "),
                key("e"),
                Span::raw(" end  "),
                key("p"),
                Span::raw(" pause  "),
                key("Tab"),
                Span::raw(" lists  "),
                key("s"),
                Span::raw(" select  "),
                key("r"),
                Span::raw(" re-start  "),
                key("x"),
                Span::raw(" end programme  "),
                key("q"),
                Span::raw(" quit"),
            ]),
        }
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>) {
        let area = centered_rect(50, 20, f.size());
        let text = vec![
            Line::from("End the programme and clear every activity?"),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().fg(Color::LightRed)),
                Span::raw(" confirm   "),
                Span::styled("n", Style::default().fg(Color::LightCyan)),
                Span::raw(" cancel"),
            ]),
        ];
        let paragraph = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("End programme"));
        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }
}

fn color_for(color: DisplayColor) -> Color {
    match color {
        DisplayColor::Normal => Color::White,
        DisplayColor::Warning => Color::Rgb(255, 165, 0),
        DisplayColor::Critical | DisplayColor::Overrun => Color::Red,
        DisplayColor::Inactive => Color::Gray,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

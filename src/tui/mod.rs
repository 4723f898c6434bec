//! TUI module - Day-by-day plan browser with rest timer

use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
};

use crate::db::{Exercise, Storage, Workout, WorkoutPlan};
use crate::progress::{week_of, weekday_of};
use crate::timer::{RestTimer, preset_label};
use crate::tracker::{self, ProgressReport};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// App state for TUI
pub struct App {
    store: Box<dyn Storage + Send>,
    user_id: i64,
    plan: WorkoutPlan,
    workouts: Vec<Workout>,
    exercises: Vec<Exercise>,
    report: Option<ProgressReport>,
    selected_day: usize,
    selected_exercise: usize,
    timer: RestTimer,
    last_tick: Instant,
    status: String,
    should_quit: bool,
}

impl App {
    pub fn new(mut store: Box<dyn Storage + Send>, plan_id: i64) -> Result<Self> {
        let user_id = tracker::ensure_default_user(&mut *store)?;
        let plan = store
            .plan(plan_id)?
            .with_context(|| format!("workout plan {plan_id} not found"))?;

        let mut app = Self {
            store,
            user_id,
            plan,
            workouts: Vec::new(),
            exercises: Vec::new(),
            report: None,
            selected_day: 0,
            selected_exercise: 0,
            timer: RestTimer::default(),
            last_tick: Instant::now(),
            status: String::new(),
            should_quit: false,
        };
        app.reload()?;

        // Open on the next expected day when the plan enumerates it
        let expected = app.report.as_ref().map(|r| r.progress.current_day);
        if let Some(idx) = expected.and_then(|day| app.workouts.iter().position(|w| w.day == day)) {
            app.selected_day = idx;
            app.load_exercises()?;
        }
        Ok(app)
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        let result = self.event_loop(&mut terminal);

        restore_terminal()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
            self.advance_timer();
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.workouts = self.store.workouts_for_plan(self.plan.id)?;
        self.report = tracker::progress_report(&*self.store, self.user_id, self.plan.id)?;
        self.selected_day = self.selected_day.min(self.workouts.len().saturating_sub(1));
        self.load_exercises()
    }

    fn load_exercises(&mut self) -> Result<()> {
        self.exercises = match self.workouts.get(self.selected_day) {
            Some(w) => self.store.exercises_for_workout(w.id)?,
            None => Vec::new(),
        };
        self.selected_exercise = self.selected_exercise.min(self.exercises.len().saturating_sub(1));
        Ok(())
    }

    fn advance_timer(&mut self) {
        if self.last_tick.elapsed() < Duration::from_secs(1) {
            return;
        }
        self.last_tick = Instant::now();
        if self.timer.tick() {
            self.status = "Rest over - next set!".to_string();
        }
    }

    fn select_day(&mut self, delta: isize) -> Result<()> {
        if self.workouts.is_empty() {
            return Ok(());
        }
        let last = self.workouts.len() as isize - 1;
        let next = (self.selected_day as isize + delta).clamp(0, last) as usize;
        if next != self.selected_day {
            self.selected_day = next;
            self.selected_exercise = 0;
            self.load_exercises()?;
        }
        Ok(())
    }

    fn complete_selected_workout(&mut self) -> Result<()> {
        let Some(workout) = self.workouts.get(self.selected_day) else {
            return Ok(());
        };
        let (id, day, done) = (workout.id, workout.day, workout.is_completed);
        tracker::complete_workout(&mut *self.store, self.user_id, id)?;
        self.status = if done {
            format!("Day {day} was already completed")
        } else {
            format!("Day {day} completed")
        };
        self.reload()
    }

    fn complete_selected_exercise(&mut self) -> Result<()> {
        let Some(exercise) = self.exercises.get(self.selected_exercise) else {
            return Ok(());
        };
        let id = exercise.id;
        if let Some(e) = tracker::complete_exercise(&mut *self.store, id)? {
            self.status = format!("{} done", e.name);
        }
        self.load_exercises()
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let header = Paragraph::new(format!("fitplan - {}", self.plan.name))
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        frame.render_widget(self.progress_gauge(), chunks[1]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);
        frame.render_widget(self.days_table(), body[0]);
        frame.render_widget(self.exercises_table(), body[1]);

        // Footer
        let timer_label = preset_label(self.timer.preset()).unwrap_or("Custom");
        let footer = Paragraph::new(format!(
            "Timer {} [{}]{} | ←/→ day  ↑/↓ exercise  c: complete day  x: complete exercise  space: timer  r: reset  p: preset  q: quit  {}",
            self.timer.display(),
            timer_label,
            if self.timer.is_running() { " ▶" } else { "" },
            self.status,
        ))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);
    }

    fn progress_gauge(&self) -> Gauge<'_> {
        let (pct, label) = match &self.report {
            Some(r) => (
                r.completion_percentage,
                format!(
                    "{}/{} days ({}%) | streak {} | best {}",
                    r.progress.completed_days,
                    r.total_days,
                    r.completion_percentage,
                    r.progress.current_streak,
                    r.progress.longest_streak
                ),
            ),
            None => (0, "No progress data available".to_string()),
        };
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Green))
            .ratio((pct as f64 / 100.0).min(1.0))
            .label(label)
    }

    fn days_table(&self) -> Table<'_> {
        let rows: Vec<Row> = self
            .workouts
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let style = if i == self.selected_day {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(format!("Day {}", w.day)),
                    Cell::from(format!("W{} {}", week_of(w.day), weekday_of(w.day))),
                    Cell::from(w.name.clone()),
                    Cell::from(if w.is_completed { "✓" } else { "" }),
                ])
                .style(style)
            })
            .collect();

        Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(7),
                Constraint::Min(10),
                Constraint::Length(2),
            ],
        )
        .header(Row::new(vec!["Day", "Week", "Workout", ""]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title("Days"))
    }

    fn exercises_table(&self) -> Table<'_> {
        let rows: Vec<Row> = self
            .exercises
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let style = if i == self.selected_exercise {
                    Style::default().bold()
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(e.name.clone()),
                    Cell::from(format!("{}x{}", e.sets, e.reps)),
                    Cell::from(e.notes.clone().unwrap_or_default()),
                    Cell::from(if e.is_completed { "✓" } else { "" }),
                ])
                .style(style)
            })
            .collect();

        let title = match self.workouts.get(self.selected_day) {
            Some(w) => match w.notes.as_deref().filter(|n| !n.is_empty()) {
                Some(notes) => format!("{} - {}", w.name, notes),
                None => w.name.clone(),
            },
            None => "No workout days available".to_string(),
        };

        Table::new(
            rows,
            [
                Constraint::Length(20),
                Constraint::Length(12),
                Constraint::Min(20),
                Constraint::Length(2),
            ],
        )
        .header(Row::new(vec!["Exercise", "Sets x Reps", "Notes", ""]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title(title))
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Left | KeyCode::Char('h') => self.select_day(-1)?,
                KeyCode::Right | KeyCode::Char('l') => self.select_day(1)?,
                KeyCode::Up | KeyCode::Char('k') => {
                    self.selected_exercise = self.selected_exercise.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.selected_exercise + 1 < self.exercises.len() {
                        self.selected_exercise += 1;
                    }
                }
                KeyCode::Char('c') => self.complete_selected_workout()?,
                KeyCode::Char('x') => self.complete_selected_exercise()?,
                KeyCode::Char(' ') => {
                    self.timer.toggle();
                    self.last_tick = Instant::now();
                }
                KeyCode::Char('r') => self.timer.reset(),
                KeyCode::Char('p') => self.timer.cycle_preset(),
                _ => {}
            }
        }
        Ok(())
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

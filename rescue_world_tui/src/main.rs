use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use rescue_world_core::{
    Action, Entity, KeyColor, Level, MissionStatus, RescueConfig, RescueEnvironment, Tutorial,
    camera::CameraMode, infer_room_size, load_level_from_string,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CameraArg {
    Full,
    Room,
    Edge,
}

impl From<CameraArg> for CameraMode {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Full => CameraMode::FullView,
            CameraArg::Room => CameraMode::RoomCentered,
            CameraArg::Edge => CameraMode::EdgeFollow,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Play a rescue mission in the terminal", long_about = None)]
struct Args {
    /// JSON config file; omitted fields keep their defaults
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,
    /// Hand-written layout to play instead of a generated mission
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,
    /// Room size of the `--map` layout; read off its walls when omitted
    #[arg(long, requires = "map")]
    room_size: Option<usize>,
    /// Walk through the controls, one small level per part
    #[arg(long, conflicts_with = "map")]
    tutorial: bool,
    /// Seed for reproducible missions
    #[arg(short, long)]
    seed: Option<u64>,
    #[arg(long, value_enum)]
    camera: Option<CameraArg>,
    /// Write logs here; the terminal itself is taken by the UI
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

/// Where the levels of this session come from.
enum Source {
    Generated,
    Map { text: String, room_size: usize },
    Tutorial(Tutorial),
}

impl Source {
    /// A fresh hand-built level, or `None` for generated missions.
    fn level(&self) -> Result<Option<Level>> {
        let level = match self {
            Source::Generated => return Ok(None),
            Source::Map { text, room_size } => load_level_from_string(text, *room_size)?,
            Source::Tutorial(tutorial) => tutorial.level()?,
        };
        Ok(Some(level))
    }
}

struct App {
    environment: RescueEnvironment,
    /// Kept so `r` can replay a hand-written layout.
    source: Source,
    /// Text of the last step's outcome.
    last_event: String,
    should_quit: bool,
    episode_over: bool,
}

impl App {
    fn new(config: RescueConfig, source: Source) -> Result<Self> {
        let environment = match source.level()? {
            Some(level) => RescueEnvironment::with_level(config, level)?,
            None => RescueEnvironment::new(config)?,
        };
        Ok(App {
            environment,
            source,
            last_event: String::from("New mission"),
            should_quit: false,
            episode_over: false,
        })
    }

    fn restart(&mut self) -> Result<()> {
        match self.source.level()? {
            Some(level) => {
                self.environment.load_scenario(level)?;
            }
            None => {
                self.environment.reset(None)?;
            }
        }
        self.episode_over = false;
        self.last_event = String::from("New mission");
        Ok(())
    }

    /// Loads the next tutorial part once the current one is won.
    fn next_part(&mut self) -> Result<()> {
        let Source::Tutorial(tutorial) = &mut self.source else {
            return Ok(());
        };
        let won = self.environment.get_mission_status().status == MissionStatus::Success;
        if !won || !tutorial.next_part() {
            return Ok(());
        }
        info!(part = tutorial.part(), "tutorial_part_started");
        self.restart()
    }

    /// Extra status line for tutorial sessions.
    fn tutorial_hint(&self) -> Option<String> {
        match &self.source {
            Source::Tutorial(tutorial) => Some(format!(
                "Tutorial {}/{}: {}{}",
                tutorial.part(),
                tutorial.num_parts(),
                tutorial.hint(),
                if tutorial.is_last() { "" } else { " (n: next part when done)" }
            )),
            _ => None,
        }
    }

    fn act(&mut self, action: Action) {
        if self.episode_over {
            return;
        }
        let result = self.environment.step(action);
        self.last_event = if result.info.mission_complete {
            format!("Mission complete! ({:+.2})", result.reward)
        } else if result.terminated {
            String::from("The agent walked into lava")
        } else if result.truncated {
            String::from("Out of steps")
        } else if result.reward != 0.0 {
            format!("{action:?}: {:+.2}", result.reward)
        } else {
            format!("{action:?}")
        };
        self.episode_over = result.terminated || result.truncated;
    }

    fn cycle_camera(&mut self) {
        let next = match self.environment.camera().mode() {
            CameraMode::FullView => CameraMode::RoomCentered,
            CameraMode::RoomCentered => CameraMode::EdgeFollow,
            CameraMode::EdgeFollow => CameraMode::FullView,
        };
        let strategy = self.environment.config().camera.strategy_for(next);
        self.environment.switch_camera(strategy);
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    // Without a file, logging stays off so it cannot scribble over the UI.
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("Cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_ref())?;

    let mut config = match &args.config {
        Some(path) => RescueConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RescueConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(camera) = args.camera {
        config.camera.mode = camera.into();
    }
    let source = match &args.map {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Map file does not exist: {}", path.display()))?;
            let room_size = match args.room_size {
                Some(size) => size,
                None => infer_room_size(&text)
                    .with_context(|| format!("Cannot tell the room size of {}", path.display()))?,
            };
            Source::Map { text, room_size }
        }
        None if args.tutorial => Source::Tutorial(Tutorial::new()),
        None => Source::Generated,
    };

    let mut app = App::new(config, source)?;
    info!(seed = ?args.seed, "tui_started");

    let mut terminal = setup_terminal()?;
    let outcome = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    if let Err(err) = &outcome {
        error!(%err, "tui_failed");
    }
    outcome
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop. The world only advances on key presses.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let poll_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui(f, app))?;

        if crossterm::event::poll(poll_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Left => app.act(Action::Left),
                    KeyCode::Right => app.act(Action::Right),
                    KeyCode::Up => app.act(Action::Forward),
                    KeyCode::Char('p') => app.act(Action::Pickup),
                    KeyCode::Char('d') => app.act(Action::Drop),
                    KeyCode::Char(' ') => app.act(Action::Toggle),
                    KeyCode::Enter => app.act(Action::Done),
                    KeyCode::Char('c') => app.cycle_camera(),
                    KeyCode::Char('r') => app.restart()?,
                    KeyCode::Char('n') => app.next_part()?,
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(frame: &mut Frame, app: &mut App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70),
            Constraint::Percentage(20),
            Constraint::Percentage(10),
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &mut app.environment);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new(
        "←/→ turn  ↑ forward  p pickup  d drop  space toggle  c camera  r restart  n next part  q quit",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn key_color(color: KeyColor) -> Color {
    match color {
        KeyColor::Red => Color::Red,
        KeyColor::Green => Color::Green,
        KeyColor::Blue => Color::Blue,
        KeyColor::Purple => Color::Magenta,
        KeyColor::Yellow => Color::Yellow,
        KeyColor::Grey => Color::Gray,
    }
}

fn entity_span(entity: Option<&Entity>) -> Span<'static> {
    match entity {
        None => Span::raw(" "),
        Some(Entity::Wall) => Span::styled("#", Style::default().fg(Color::DarkGray)),
        Some(Entity::Lava) => Span::styled("~", Style::default().fg(Color::LightRed)),
        Some(Entity::Key { color }) => Span::styled("k", Style::default().fg(key_color(*color))),
        Some(Entity::Door(door)) => {
            let glyph = if door.open {
                "+"
            } else if door.locked {
                "L"
            } else {
                "|"
            };
            Span::styled(glyph, Style::default().fg(key_color(door.color)))
        }
        Some(Entity::Victim(_)) => Span::styled("V", Style::default().fg(Color::White).bold()),
        Some(Entity::FakeVictim(_)) => Span::styled("T", Style::default().fg(Color::White)),
    }
}

/// Draws the tiles the active camera sees, one glyph per tile.
fn render_map(frame: &mut Frame, area: Rect, environment: &mut RescueEnvironment) {
    let viewport = environment.camera_viewport();
    let level = environment.level();
    let agent = level.agent();
    let bottom = (viewport.y + viewport.height).min(level.height());
    let right = (viewport.x + viewport.width).min(level.width());

    let mut lines: Vec<Line> = Vec::with_capacity(bottom.saturating_sub(viewport.y));
    for y in viewport.y..bottom {
        let mut spans: Vec<Span> = Vec::with_capacity(right.saturating_sub(viewport.x));
        for x in viewport.x..right {
            let pos = rescue_world_core::Position::new(x, y);
            match agent {
                Some(pose) if pose.position == pos => {
                    let arrow = match pose.direction {
                        rescue_world_core::Direction::Right => ">",
                        rescue_world_core::Direction::Down => "v",
                        rescue_world_core::Direction::Left => "<",
                        rescue_world_core::Direction::Up => "^",
                    };
                    spans.push(Span::styled(arrow, Style::default().fg(Color::Red).bold()));
                }
                _ => spans.push(entity_span(level.get(pos))),
            }
        }
        lines.push(Line::from(spans));
    }

    let title = format!("Rescue World ({:?})", environment.camera().mode());
    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(map_paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let report = app.environment.get_mission_status();
    let env = &app.environment;
    let carrying = match env.level().carrying() {
        Some(entity) => vec![Span::raw("Carrying: "), entity_span(Some(entity))],
        None => vec![Span::raw("Carrying: nothing")],
    };
    let mut lines = vec![
        Line::from(env.mission_text()),
        Line::from(format!(
            "Score: {:.2}  Saved: {}  Remaining: {}  Status: {}",
            env.score(),
            report.saved_victims,
            report.remaining_victims,
            report.status.as_str()
        )),
        Line::from(format!("Steps: {}/{}", env.step_count(), env.max_steps())),
        Line::from(carrying),
        Line::from(app.last_event.clone()),
    ];
    if let Some(hint) = app.tutorial_hint() {
        lines.insert(0, Line::from(hint).style(Style::default().fg(Color::Cyan)));
    }
    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Mission"));
    frame.render_widget(status, area);
}

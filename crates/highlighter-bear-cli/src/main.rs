mod render;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as TermEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use highlighter_bear_config::{Config, EngineConfig};
use highlighter_bear_engine::{
    ChangeWatcher, Document, EngineOptions, Event, JsonRuleFile, ScanOptions, WatcherState,
    read_document,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
    time::{Duration, Instant},
};

/// Poll interval when no engine timer is armed.
const IDLE_POLL: Duration = Duration::from_millis(500);

const USAGE: &str = "[--rules <file>] [--location <url>] [--print] <document.xhtml>";

#[derive(Debug, Default, PartialEq)]
struct Args {
    rules: Option<PathBuf>,
    location: Option<String>,
    print: bool,
    document: PathBuf,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut document = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--rules" => {
                let value = iter.next().ok_or("--rules needs a file")?;
                parsed.rules = Some(PathBuf::from(value));
            }
            "--location" => {
                let value = iter.next().ok_or("--location needs a url")?;
                parsed.location = Some(value.clone());
            }
            "--print" => parsed.print = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            path if document.is_none() => document = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument {extra}")),
        }
    }
    parsed.document = document.ok_or("no document given")?;
    Ok(parsed)
}

#[derive(Debug, PartialEq)]
struct Settings {
    rules_path: PathBuf,
    location: String,
    engine: EngineOptions,
}

/// Command line values win over the config file.
fn resolve_settings(args: &Args, config: Option<Config>) -> Result<Settings, String> {
    let (config_rules, config_location, engine) = match config {
        Some(config) => (Some(config.rules_path), config.location, config.engine),
        None => (None, None, EngineConfig::default()),
    };
    let rules_path = args
        .rules
        .clone()
        .or(config_rules)
        .ok_or("no rule file given and none configured")?;
    let location = args
        .location
        .clone()
        .or(config_location)
        .ok_or("no location given and none configured")?;
    Ok(Settings {
        rules_path,
        location,
        engine: engine_options(&engine),
    })
}

fn engine_options(config: &EngineConfig) -> EngineOptions {
    EngineOptions {
        debounce: Duration::from_millis(config.debounce_ms),
        retry_delays: config
            .retry_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect(),
        scan: ScanOptions {
            excluded_tags: config
                .excluded_tags
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            marker_class: config.marker_class.clone(),
        },
    }
}

struct App {
    document_path: PathBuf,
    doc: Document,
    rules: JsonRuleFile,
    watcher: ChangeWatcher,
    scan: ScanOptions,
    scroll: u16,
    lines: Vec<Line<'static>>,
}

impl App {
    fn new(document_path: PathBuf, settings: Settings) -> Result<Self> {
        let doc = read_document(&document_path)
            .with_context(|| format!("Failed to load {}", document_path.display()))?;
        let scan = settings.engine.scan.clone();
        let mut app = Self {
            document_path,
            doc,
            rules: JsonRuleFile::new(settings.rules_path),
            watcher: ChangeWatcher::new(&settings.location, settings.engine),
            scan,
            scroll: 0,
            lines: Vec::new(),
        };
        app.deliver(Event::Start);
        Ok(app)
    }

    fn deliver(&mut self, event: Event) {
        self.watcher
            .handle(&mut self.doc, &self.rules, event, Instant::now());
        self.settle();
    }

    fn tick(&mut self) {
        if self.watcher.tick(&mut self.doc, Instant::now()) > 0 {
            self.settle();
        }
    }

    /// Hands changes the tree recorded back to the watcher, then refreshes
    /// the rendered lines.
    fn settle(&mut self) {
        let records = self.doc.take_mutations();
        if !records.is_empty() {
            self.watcher.handle(
                &mut self.doc,
                &self.rules,
                Event::Mutations(records),
                Instant::now(),
            );
        }
        self.lines = render::document_lines(&self.doc, &self.scan);
    }

    fn clear(&mut self) {
        self.watcher.dispose(&mut self.doc);
        self.settle();
    }

    fn timeout(&self) -> Duration {
        self.watcher
            .next_deadline()
            .map_or(IDLE_POLL, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            })
    }

    fn span_count(&self) -> usize {
        self.watcher
            .annotator()
            .spans(&self.doc, self.doc.root())
            .len()
    }

    fn scroll_down(&mut self) {
        let max = self.lines.len().saturating_sub(1) as u16;
        self.scroll = (self.scroll + 1).min(max);
    }

    fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("highlighter-bear-cli");

    let parsed = match parse_args(&args[1.min(args.len())..]) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: {program} {USAGE}");
            process::exit(1);
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(if parsed.print {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    let settings = match resolve_settings(&parsed, config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: {program} {USAGE}");
            eprintln!("Or create a config file at {}", Config::config_path().display());
            process::exit(1);
        }
    };

    let mut app = App::new(parsed.document.clone(), settings)?;

    if parsed.print {
        println!("{}", app.doc.to_xhtml(app.doc.root()));
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(app.timeout())?
            && let TermEvent::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('r') => app.deliver(Event::RulesChanged),
                KeyCode::Char('s') => app.deliver(Event::Reload),
                KeyCode::Char('c') => app.clear(),
                KeyCode::Down | KeyCode::Char('j') => app.scroll_down(),
                KeyCode::Up | KeyCode::Char('k') => app.scroll_up(),
                _ => {}
            }
        }
        app.tick();
    }
}

fn state_color(state: WatcherState) -> Color {
    match state {
        WatcherState::Watching => Color::Green,
        WatcherState::Scanning => Color::Yellow,
        WatcherState::Idle => Color::Gray,
        WatcherState::Stopped => Color::Red,
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)].as_ref())
        .split(f.area());

    let content_text = if app.lines.is_empty() {
        vec![Line::from("(no text)")]
    } else {
        app.lines.clone()
    };
    let content = Paragraph::new(content_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.document_path.display().to_string()),
        )
        .wrap(ratatui::widgets::Wrap { trim: true })
        .scroll((app.scroll, 0));
    f.render_widget(content, chunks[0]);

    let state = app.watcher.state();
    let status = Line::from(vec![
        Span::styled(
            format!(" {state:?} "),
            Style::default().fg(Color::Black).bg(state_color(state)),
        ),
        Span::raw(format!(
            " {} | {} spans | {} pending",
            app.watcher.location(),
            app.span_count(),
            app.watcher.pending_len()
        )),
    ]);
    f.render_widget(Paragraph::new(status), chunks[1]);

    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("r: Reload rules | "),
        Span::raw("c: Clear | "),
        Span::raw("s: Restart | "),
        Span::raw("↑/↓: Scroll"),
    ]);
    f.render_widget(Paragraph::new(help_text), chunks[2]);
}

mod app;
mod ui;

use anyhow::{bail, Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use map_press::config::{JobConfig, Orientation, PageSetup, PageSize};
use map_press::data::{self, Database};
use map_press::geo::GeoBounds;
use map_press::map::MapRenderer;
use map_press::style::RuleSet;
use map_press::surface::RecordingSurface;
use ratatui::DefaultTerminal;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Render vector map data onto paginated output
#[derive(Debug, Parser)]
#[command(name = "map-press", version, about)]
struct Args {
    /// Job description (TOML)
    #[arg(long)]
    job: Option<PathBuf>,

    /// Geographic window as min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: Option<GeoBounds>,

    /// Page size: a3, a4 or WIDTHxHEIGHT in points
    #[arg(long, value_parser = parse_page)]
    page: Option<PageSize>,

    /// Page orientation: portrait or landscape
    #[arg(long, value_parser = parse_orientation)]
    orientation: Option<Orientation>,

    /// Page margin in points
    #[arg(long)]
    margin: Option<f64>,

    /// Scale passed to style rules
    #[arg(long)]
    scale: Option<f64>,

    /// Style rule table (JSON)
    #[arg(long)]
    style: Option<PathBuf>,

    /// Map data (GeoJSON)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Write recorded drawing operations as JSON ("-" for stdout)
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Interactive terminal preview
    #[arg(long, conflicts_with = "dump")]
    preview: bool,

    /// Atlas columns
    #[arg(long, default_value_t = 1)]
    pages_x: usize,

    /// Atlas rows
    #[arg(long, default_value_t = 1)]
    pages_y: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let job = build_job(&args)?;
    let styles = load_styles(args.style.as_deref())?;
    let db = match &args.data {
        Some(path) => data::load_geojson(path)?,
        None => {
            warn!("no --data given, rendering an empty map");
            Database::new()
        }
    };

    if args.preview {
        return preview(job, db, styles);
    }
    if args.pages_x > 1 || args.pages_y > 1 {
        return atlas(&args, &job, &db, &styles);
    }

    let mut surface = RecordingSurface::new();
    let summary = MapRenderer::new(&db, &styles)
        .render(&job, &mut surface)
        .context("rendering page")?;
    if let Some(path) = &args.dump {
        write_ops(path, &surface)?;
    }
    println!(
        "{} items, {} labels placed, {} dropped",
        summary.items, summary.labels_placed, summary.labels_dropped
    );
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // already initialized
    }
}

/// Job file, then command-line overrides
fn build_job(args: &Args) -> Result<JobConfig> {
    let mut job = match (&args.job, args.bbox) {
        (Some(path), _) => JobConfig::from_file(path)?,
        (None, Some(bounds)) => JobConfig::new(bounds, PageSetup::default()),
        (None, None) => bail!("either --job or --bbox is required"),
    };
    if let Some(bounds) = args.bbox {
        job.bounds = bounds;
    }
    if let Some(size) = args.page {
        job.page.size = size;
    }
    if let Some(orientation) = args.orientation {
        job.page.orientation = orientation;
    }
    if let Some(margin) = args.margin {
        job.page.margin = margin;
    }
    if let Some(scale) = args.scale {
        job.scale.current = scale;
    }
    job.validate()?;
    Ok(job)
}

fn load_styles(path: Option<&Path>) -> Result<RuleSet> {
    let Some(path) = path else {
        warn!("no --style given, nothing will be drawn");
        return Ok(RuleSet::default());
    };
    RuleSet::from_file(path)
}

fn write_ops(path: &Path, surface: &RecordingSurface) -> Result<()> {
    let json = surface.to_json().context("serializing drawing operations")?;
    if path == Path::new("-") {
        println!("{json}");
    } else {
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), ops = surface.ops.len(), "wrote drawing operations");
    }
    Ok(())
}

fn atlas(args: &Args, job: &JobConfig, db: &Database, styles: &RuleSet) -> Result<()> {
    let pages = MapRenderer::new(db, styles)
        .render_atlas(job, args.pages_x, args.pages_y)
        .context("rendering atlas")?;
    for page in pages {
        println!(
            "page {},{}: {} items, {} labels placed, {} dropped",
            page.column,
            page.row,
            page.summary.items,
            page.summary.labels_placed,
            page.summary.labels_dropped
        );
        if let Some(dump) = &args.dump {
            let path = atlas_path(dump, page.column, page.row);
            let surface = RecordingSurface::from_ops(page.ops);
            write_ops(&path, &surface)?;
        }
    }
    Ok(())
}

/// `out.json` becomes `out-<column>-<row>.json`
fn atlas_path(base: &Path, column: usize, row: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{stem}-{column}-{row}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{column}-{row}"),
    };
    base.with_file_name(name)
}

fn parse_bbox(s: &str) -> Result<GeoBounds, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts[..] {
        [min_lon, min_lat, max_lon, max_lat] => {
            Ok(GeoBounds::new(min_lon, min_lat, max_lon, max_lat))
        }
        _ => Err(format!("expected 4 numbers, got {}", parts.len())),
    }
}

fn parse_page(s: &str) -> Result<PageSize, String> {
    match s.to_ascii_lowercase().as_str() {
        "a3" => Ok(PageSize::A3),
        "a4" => Ok(PageSize::A4),
        other => {
            let (w, h) = other
                .split_once('x')
                .ok_or_else(|| format!("unknown page size {s:?}"))?;
            let width = w.parse::<f64>().map_err(|e| e.to_string())?;
            let height = h.parse::<f64>().map_err(|e| e.to_string())?;
            Ok(PageSize::Custom { width, height })
        }
    }
}

fn parse_orientation(s: &str) -> Result<Orientation, String> {
    match s.to_ascii_lowercase().as_str() {
        "portrait" => Ok(Orientation::Portrait),
        "landscape" => Ok(Orientation::Landscape),
        _ => Err(format!("unknown orientation {s:?}")),
    }
}

fn preview(job: JobConfig, db: Database, styles: RuleSet) -> Result<()> {
    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, job, db, styles);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in(),
        MouseEventKind::ScrollDown => app.zoom_out(),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-1, 0),
        MouseEventKind::ScrollRight => app.pan(1, 0),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, job: JobConfig, db: Database, styles: RuleSet) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(job, db, styles, size.width as usize, size.height as usize);

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-2, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(2, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -2),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 2),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

use crate::app::App;
use map_press::braille::{BrailleCanvas, BrailleSurface};
use map_press::map::RenderSummary;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Longest label drawn before truncation
const MAX_LABEL: usize = 24;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let summary = render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, summary, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) -> Option<RenderSummary> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Page Preview ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let page = app.render(inner.width as usize, inner.height as usize);
    let cursor_pos = app
        .cursor_cell()
        .filter(|&(cx, cy)| cx < inner.width && cy < inner.height);

    frame.render_widget(
        MapWidget {
            surface: page.surface,
            cursor_pos,
        },
        inner,
    );
    page.summary.ok()
}

/// Braille page preview with text labels overlaid
struct MapWidget {
    surface: BrailleSurface,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (col, row, ch) in canvas.cells() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            let (x, y) = (area.x + col as u16, area.y + row as u16);
            buf[(x, y)].set_char(ch).set_fg(color);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: area outlines, strokes, markers
        Self::render_layer(&self.surface.areas, Color::DarkGray, area, buf);
        Self::render_layer(&self.surface.lines, Color::Cyan, area, buf);
        Self::render_layer(&self.surface.markers, Color::Yellow, area, buf);

        let label_style = Style::default().fg(Color::White);
        for label in &self.surface.labels {
            if label.row >= area.height || label.col >= area.width {
                continue;
            }
            let max_len = area.width.saturating_sub(label.col) as usize;
            let (x, y) = (area.x + label.col, area.y + label.row);
            for (i, ch) in label.text.chars().take(max_len.min(MAX_LABEL)).enumerate() {
                buf[(x + i as u16, y)].set_char(ch).set_style(label_style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, summary: Option<RenderSummary>, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", dim),
    ];
    match summary {
        Some(s) => spans.extend([
            Span::styled(format!("{} items ", s.items), Style::default().fg(Color::Green)),
            Span::styled(
                format!("{} labels ", s.labels_placed),
                Style::default().fg(Color::Green),
            ),
            Span::styled(
                format!("{} dropped ", s.labels_dropped),
                Style::default().fg(Color::Magenta),
            ),
        ]),
        None => spans.push(Span::styled("invalid window ", Style::default().fg(Color::Red))),
    }
    spans.push(Span::styled("| ", dim));
    spans.push(Span::styled(
        app.cursor_coords().unwrap_or_else(|| app.center_coords()),
        Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(" | hjkl:pan +/-:zoom r:reset q:quit", dim));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

//! Stateless rendering for the card grid.

use super::app::{App, CardView, GRID_COLUMNS};
use crate::game::CardState;
use crate::timer::format_elapsed;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const CELL_WIDTH: u16 = 9;
const CELL_HEIGHT: u16 = 3;

/// Accent color per environment, matching the card sets.
fn accent(environment: &str) -> Color {
    match environment {
        "fruits" => Color::Rgb(0xff, 0x6f, 0x61),
        "birds" => Color::Rgb(0x42, 0xa5, 0xf5),
        "cars" => Color::Rgb(0xff, 0xb3, 0x00),
        "clothes" => Color::Rgb(0x8e, 0x24, 0xaa),
        "electronics" => Color::Rgb(0x1e, 0x88, 0xe5),
        "animals" => Color::Rgb(0x66, 0xbb, 0x6a),
        "nature" => Color::Rgb(0x38, 0x8e, 0x3c),
        _ => Color::Cyan,
    }
}

/// Renders the whole screen.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(1), // Moves + timer
            Constraint::Min(8),    // Grid
            Constraint::Length(3), // Status
        ])
        .split(area);

    let accent = accent(app.environment());

    let title = Paragraph::new(format!("Pairmatch - {}", app.environment()))
        .style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, chunks[0]);

    let readout = Paragraph::new(format!(
        "Moves: {}    Time: {}",
        app.moves(),
        format_elapsed(app.elapsed())
    ))
    .alignment(Alignment::Center);
    frame.render_widget(readout, chunks[1]);

    draw_grid(frame, chunks[2], app, accent);

    let status = Paragraph::new(app.status_message())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[3]);

    if app.completed() {
        draw_completion(frame, area, app, accent);
    }
}

fn draw_grid(frame: &mut Frame, area: Rect, app: &App, accent: Color) {
    let cards = app.cards();
    if cards.is_empty() {
        let empty = Paragraph::new("No cards dealt").alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    }

    let rows = cards.len().div_ceil(GRID_COLUMNS);
    let grid_area = center_rect(
        area,
        CELL_WIDTH * GRID_COLUMNS as u16,
        CELL_HEIGHT * rows as u16,
    );

    for (index, card) in cards.iter().enumerate() {
        let row = (index / GRID_COLUMNS) as u16;
        let col = (index % GRID_COLUMNS) as u16;
        let cell = Rect {
            x: grid_area.x + col * CELL_WIDTH,
            y: grid_area.y + row * CELL_HEIGHT,
            width: CELL_WIDTH,
            height: CELL_HEIGHT,
        }
        .intersection(area);
        if cell.is_empty() {
            // Terminal too small for the full grid
            continue;
        }
        draw_card(frame, cell, card, index == app.cursor(), accent);
    }
}

fn draw_card(frame: &mut Frame, area: Rect, card: &CardView, selected: bool, accent: Color) {
    let (face, style) = match card.state {
        CardState::Hidden => ("❓".to_string(), Style::default().fg(Color::DarkGray)),
        CardState::Flipped => (
            card.value.clone().unwrap_or_else(|| "…".to_string()),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ),
        CardState::Matched => (
            card.value.clone().unwrap_or_default(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    };

    let border_style = if selected {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let widget = Paragraph::new(face)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(border_style));
    frame.render_widget(widget, area);
}

fn draw_completion(frame: &mut Frame, area: Rect, app: &App, accent: Color) {
    let popup = center_rect(area, 44, 7);
    frame.render_widget(Clear, popup);

    let text = format!(
        "\nYou matched every pair!\n\nMoves: {}    Time: {}",
        app.moves(),
        format_elapsed(app.elapsed())
    );
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Game complete "),
        );
    frame.render_widget(widget, popup);
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Length(area.height.saturating_sub(height) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(area.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Length(area.width.saturating_sub(width) / 2),
        ])
        .split(vert[1])[1]
}

//! Dashboard view: model status and session summary.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::RiskClass;
use crate::tui::styles::MedicalTheme;

use super::{key_hints, render_header};

/// Counts for the current session only; nothing is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub low: usize,
    pub high: usize,
}

impl SessionSummary {
    pub fn record(&mut self, class: RiskClass) {
        self.total += 1;
        match class {
            RiskClass::Low => self.low += 1,
            RiskClass::High => self.high += 1,
        }
    }
}

/// Dashboard state for rendering.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub model_source: String,
    pub n_trees: usize,
    pub schema_width: usize,
    /// Schema columns the encoder never fills
    pub zero_filled: Vec<String>,
    pub signed: bool,
    pub report_dir: String,
    pub session: SessionSummary,
}

/// Render the main dashboard view.
pub fn render_dashboard(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_header(f, chunks[0], "VisionCare", "Vision Risk Screening");

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_model_status(f, columns[0], state);
    render_session(f, columns[1], state.session);
}

fn status_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {label}: "), MedicalTheme::text_secondary()),
        Span::styled(value, MedicalTheme::text()),
    ])
}

fn render_model_status(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .margin(1)
        .split(area);

    let (sig_text, sig_style) = if state.signed {
        ("  OK Signed artifact", MedicalTheme::success())
    } else {
        ("  !  Unsigned artifact", MedicalTheme::warning())
    };

    let zero_filled = if state.zero_filled.is_empty() {
        "none".to_string()
    } else {
        state.zero_filled.join(", ")
    };

    let lines = vec![
        status_line("Model", state.model_source.clone()),
        status_line("Trees", state.n_trees.to_string()),
        status_line("Schema columns", state.schema_width.to_string()),
        status_line("Zero-filled", zero_filled),
        Line::from(Span::styled(sig_text, sig_style)),
        status_line("Reports", state.report_dir.clone()),
    ];

    let block = Block::default()
        .title(Span::styled(" Model Status ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    let actions = Paragraph::new(vec![
        key_hints(&[("N", "New Screening")]),
        key_hints(&[("Q", "Quit")]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Actions ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(actions, chunks[1]);
}

fn render_session(f: &mut Frame, area: Rect, session: SessionSummary) {
    let block = Block::default()
        .title(Span::styled(" This Session ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    if session.total == 0 {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No screenings yet. Press [N] to start.",
            MedicalTheme::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let lines = vec![
        Line::from(vec![
            Span::styled("Screenings: ", MedicalTheme::text_secondary()),
            Span::styled(session.total.to_string(), MedicalTheme::text()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Low risk: ", MedicalTheme::text_secondary()),
            Span::styled(
                session.low.to_string(),
                MedicalTheme::risk_class(RiskClass::Low),
            ),
            Span::styled("  High risk: ", MedicalTheme::text_secondary()),
            Span::styled(
                session.high.to_string(),
                MedicalTheme::risk_class(RiskClass::High),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Results are kept in memory and cleared on exit.",
            MedicalTheme::text_muted(),
        )),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

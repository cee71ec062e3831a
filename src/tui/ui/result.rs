//! Screening progress and result view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::domain::format_probability;
use crate::tui::styles::MedicalTheme;
use crate::tui::worker::ScreeningOutcome;

use super::{key_hints, render_header};

#[derive(Debug, Clone, Default)]
pub enum ResultState {
    #[default]
    Idle,
    Encoding,
    Predicting,
    Reporting,
    Complete(Box<ScreeningOutcome>),
    Error(String),
}

impl ResultState {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Encoding | Self::Predicting | Self::Reporting)
    }
}

/// Render the result screen.
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(f, chunks[0], "Screening Result", "Random Forest Classifier");

    match state {
        ResultState::Idle => render_message(f, chunks[1], "Submit the intake form to begin."),
        ResultState::Encoding => render_stage(f, chunks[1], "Encoding", 1, "Aligning features with the model schema..."),
        ResultState::Predicting => render_stage(f, chunks[1], "Predicting", 2, "Running the classifier..."),
        ResultState::Reporting => render_stage(f, chunks[1], "Reporting", 3, "Writing the PDF report..."),
        ResultState::Complete(outcome) => render_outcome(f, chunks[1], outcome),
        ResultState::Error(message) => render_error(f, chunks[1], message),
    }

    let hints = match state {
        ResultState::Complete(_) => key_hints(&[("Enter", "Dashboard"), ("N", "New Screening")]),
        ResultState::Error(_) => key_hints(&[("Enter", "Back to Form"), ("Esc", "Dashboard")]),
        _ if state.is_running() => {
            Line::from(Span::styled("Processing...", MedicalTheme::text_muted()))
        }
        _ => key_hints(&[("Esc", "Dashboard")]),
    };
    let footer = Paragraph::new(hints).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(footer, chunks[2]);
}

fn render_message(f: &mut Frame, area: Rect, message: &str) {
    let p = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        MedicalTheme::text_muted(),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(p, area);
}

fn render_stage(f: &mut Frame, area: Rect, stage: &str, step: u16, description: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .margin(2)
        .split(area);

    let label = Paragraph::new(Line::from(vec![
        Span::styled("Stage: ", MedicalTheme::text_secondary()),
        Span::styled(stage.to_string(), MedicalTheme::focused()),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(label, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::info())
        .percent(step * 100 / 3)
        .label(format!("{step}/3"));
    f.render_widget(gauge, chunks[1]);

    let desc = Paragraph::new(Line::from(Span::styled(
        description.to_string(),
        MedicalTheme::text_muted(),
    )))
    .alignment(Alignment::Center);
    f.render_widget(desc, chunks[2]);
}

fn render_outcome(f: &mut Frame, area: Rect, outcome: &ScreeningOutcome) {
    let screening = &outcome.screening;
    let class_style = MedicalTheme::risk_class(screening.result.predicted_class);

    let block = Block::default()
        .title(Span::styled(" Prediction ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border_focused());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .margin(1)
        .split(inner);

    let label = Paragraph::new(Line::from(Span::styled(
        screening.assessment.label.clone(),
        class_style.add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(label, chunks[0]);

    let percent = screening.result.confidence_percent();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" Confidence Score ", MedicalTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::confidence_gauge(percent))
        .ratio(screening.result.risk_probability.clamp(0.0, 1.0))
        .label(format_probability(screening.result.risk_probability));
    f.render_widget(gauge, chunks[1]);

    let recommendation = Paragraph::new(Line::from(vec![
        Span::styled("Recommendation: ", MedicalTheme::text_secondary()),
        Span::styled(screening.assessment.recommendation.clone(), MedicalTheme::text()),
    ]))
    .wrap(Wrap { trim: true });
    f.render_widget(recommendation, chunks[2]);

    let report_line = match &outcome.report {
        Ok(report) => Line::from(vec![
            Span::styled("Report: ", MedicalTheme::text_secondary()),
            Span::styled(report.path.display().to_string(), MedicalTheme::success()),
        ]),
        Err(message) => Line::from(vec![
            Span::styled("Report not written: ", MedicalTheme::danger()),
            Span::styled(message.clone(), MedicalTheme::text()),
        ]),
    };
    f.render_widget(Paragraph::new(report_line).wrap(Wrap { trim: true }), chunks[3]);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Screening failed", MedicalTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), MedicalTheme::text())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::danger()),
    );

    f.render_widget(content, area);
}

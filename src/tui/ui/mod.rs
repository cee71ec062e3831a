//! UI module: view components for the TUI.

pub mod dashboard;
pub mod patient;
pub mod result;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::MedicalTheme;

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "DISCLAIMER: VisionCare gives an indicative risk estimate and does not replace an eye examination.",
            MedicalTheme::text_muted(),
        )),
        Line::from(Span::styled(
            "Consult an ophthalmologist for any vision concern.",
            MedicalTheme::text_muted(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(MedicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}

/// One-line header bar shared by every screen.
pub(crate) fn render_header(f: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled(title.to_string(), MedicalTheme::title()),
        Span::styled(" │ ", MedicalTheme::text_muted()),
        Span::styled(subtitle.to_string(), MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

/// Footer line of `[key] description` hints.
pub(crate) fn key_hints(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    Line::from(
        hints
            .iter()
            .flat_map(|(key, desc)| {
                [
                    Span::styled(format!("[{key}] "), MedicalTheme::key_hint()),
                    Span::styled(format!("{desc} "), MedicalTheme::key_desc()),
                ]
            })
            .collect::<Vec<_>>(),
    )
}

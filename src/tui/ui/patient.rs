//! Patient intake form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{
    limits, BlueLightExposure, OccupationType, PatientInput, SmokingStatus, TearProduction,
    VisionSharpness,
};
use crate::tui::styles::MedicalTheme;

use super::{key_hints, render_header};

/// Editable value of one form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Typed or stepped number, kept as text until submission
    Number {
        value: String,
        min: f64,
        max: f64,
        step: f64,
        decimal: bool,
    },
    Toggle(bool),
    Choice {
        options: Vec<&'static str>,
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FormField {
    fn number(label: &'static str, value: f64, min: f64, max: f64, step: f64, decimal: bool) -> Self {
        Self {
            label,
            kind: FieldKind::Number {
                value: format_number(value, decimal),
                min,
                max,
                step,
                decimal,
            },
        }
    }

    fn toggle(label: &'static str, on: bool) -> Self {
        Self {
            label,
            kind: FieldKind::Toggle(on),
        }
    }

    fn choice<T>(label: &'static str, all: &'static [T], name: fn(&T) -> &'static str, index: usize) -> Self {
        Self {
            label,
            kind: FieldKind::Choice {
                options: all.iter().map(name).collect(),
                index,
            },
        }
    }

    /// Text shown in the field box.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.kind {
            FieldKind::Number { value, .. } => value.clone(),
            FieldKind::Toggle(on) => (if *on { "Yes" } else { "No" }).to_string(),
            FieldKind::Choice { options, index } => {
                format!("‹ {} ›", options.get(*index).copied().unwrap_or_default())
            }
        }
    }

    fn hint(&self) -> String {
        match &self.kind {
            FieldKind::Number {
                min, max, decimal, ..
            } => format!(
                "{} - {}",
                format_number(*min, *decimal),
                format_number(*max, *decimal)
            ),
            FieldKind::Toggle(_) => "space to toggle".to_string(),
            FieldKind::Choice { .. } => "←/→ to change".to_string(),
        }
    }
}

fn format_number(value: f64, decimal: bool) -> String {
    if decimal {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    }
}

// Field positions, in form order.
const AGE: usize = 0;
const DIABETES: usize = 1;
const BLOOD_PRESSURE: usize = 2;
const SCREEN_TIME: usize = 3;
const CHOLESTEROL: usize = 4;
const HBA1C: usize = 5;
const BLURRED_VISION: usize = 6;
const EYE_PAIN: usize = 7;
const FAMILY_HISTORY: usize = 8;
const NIGHT_VISION: usize = 9;
const HEADACHE: usize = 10;
const SMOKING: usize = 11;
const TEAR_PRODUCTION: usize = 12;
const WEARS_GLASSES: usize = 13;
const VISION_SHARPNESS: usize = 14;
const OCCUPATION: usize = 15;
const BLUE_LIGHT: usize = 16;

/// Patient form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for PatientFormState {
    fn default() -> Self {
        Self::from_input(&PatientInput::default())
    }
}

impl PatientFormState {
    /// Form prefilled with `input`.
    #[must_use]
    pub fn from_input(input: &PatientInput) -> Self {
        let span = |r: &std::ops::RangeInclusive<u32>| (f64::from(*r.start()), f64::from(*r.end()));
        let (age_min, age_max) = span(&limits::AGE);
        let (bp_min, bp_max) = span(&limits::BLOOD_PRESSURE);
        let (st_min, st_max) = span(&limits::SCREEN_TIME);
        let (ch_min, ch_max) = span(&limits::CHOLESTEROL);

        let fields = vec![
            FormField::number("Age", f64::from(input.age), age_min, age_max, 1.0, false),
            FormField::toggle("Diabetes", input.diabetes),
            FormField::number(
                "Blood Pressure (mm Hg)",
                f64::from(input.blood_pressure),
                bp_min,
                bp_max,
                1.0,
                false,
            ),
            FormField::number(
                "Screen Time (hrs/day)",
                f64::from(input.screen_time),
                st_min,
                st_max,
                1.0,
                false,
            ),
            FormField::number(
                "Cholesterol (mg/dL)",
                f64::from(input.cholesterol),
                ch_min,
                ch_max,
                1.0,
                false,
            ),
            FormField::number(
                "HbA1c (%)",
                input.hba1c,
                *limits::HBA1C.start(),
                *limits::HBA1C.end(),
                0.1,
                true,
            ),
            FormField::toggle("Blurred Vision", input.blurred_vision),
            FormField::toggle("Eye Pain", input.eye_pain),
            FormField::toggle("Family History", input.family_history),
            FormField::toggle("Night Vision Difficulty", input.night_vision_difficulty),
            FormField::toggle("Frequent Headaches", input.headache),
            FormField::choice(
                "Smoking Status",
                SmokingStatus::ALL,
                SmokingStatus::as_str,
                input.smoking_status.index(),
            ),
            FormField::choice(
                "Tear Production",
                TearProduction::ALL,
                TearProduction::as_str,
                input.tear_production.index(),
            ),
            FormField::toggle("Wears Glasses", input.wears_glasses),
            FormField::choice(
                "Vision Sharpness",
                VisionSharpness::ALL,
                VisionSharpness::as_str,
                input.vision_sharpness.index(),
            ),
            FormField::choice(
                "Occupation Type",
                OccupationType::ALL,
                OccupationType::as_str,
                input.occupation_type.index(),
            ),
            FormField::choice(
                "Blue Light Exposure",
                BlueLightExposure::ALL,
                BlueLightExposure::as_str,
                input.blue_light_exposure.index(),
            ),
        ];

        Self {
            fields,
            selected_field: 0,
            error_message: None,
        }
    }

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    fn current(&mut self) -> &mut FieldKind {
        &mut self.fields[self.selected_field].kind
    }

    /// Type a character into the selected number field.
    pub fn input_char(&mut self, c: char) {
        if let FieldKind::Number { value, decimal, .. } = self.current() {
            let accept = c.is_ascii_digit() || (*decimal && c == '.' && !value.contains('.'));
            if accept && value.len() < 6 {
                value.push(c);
            }
        }
        self.error_message = None;
    }

    pub fn delete_char(&mut self) {
        if let FieldKind::Number { value, .. } = self.current() {
            value.pop();
        }
    }

    pub fn clear_field(&mut self) {
        if let FieldKind::Number { value, .. } = self.current() {
            value.zeroize();
        }
    }

    /// Space: flip the selected toggle.
    pub fn toggle(&mut self) {
        if let FieldKind::Toggle(on) = self.current() {
            *on = !*on;
        }
        self.error_message = None;
    }

    /// ←/→: step a number, flip a toggle or cycle a choice.
    pub fn adjust(&mut self, forward: bool) {
        match self.current() {
            FieldKind::Number {
                value,
                min,
                max,
                step,
                decimal,
            } => {
                let current = value.parse::<f64>().unwrap_or(*min);
                let next = if forward { current + *step } else { current - *step };
                let next = next.clamp(*min, *max);
                value.zeroize();
                *value = format_number(next, *decimal);
            }
            FieldKind::Toggle(on) => *on = !*on,
            FieldKind::Choice { options, index } => {
                let n = options.len();
                *index = if forward { (*index + 1) % n } else { (*index + n - 1) % n };
            }
        }
        self.error_message = None;
    }

    /// Restore the form defaults, wiping typed values.
    pub fn reset(&mut self) {
        self.clear_sensitive();
        *self = Self::default();
    }

    /// Wipe typed number buffers from memory.
    pub fn clear_sensitive(&mut self) {
        for field in &mut self.fields {
            if let FieldKind::Number { value, .. } = &mut field.kind {
                value.zeroize();
            }
        }
        self.error_message = None;
        self.selected_field = 0;
    }

    /// Prefill a high-risk example patient.
    pub fn load_sample_data(&mut self) {
        let sample = PatientInput {
            age: 60,
            diabetes: true,
            blood_pressure: 140,
            screen_time: 9,
            cholesterol: 240,
            hba1c: 8.0,
            blurred_vision: true,
            eye_pain: false,
            family_history: true,
            night_vision_difficulty: true,
            headache: true,
            smoking_status: SmokingStatus::Former,
            tear_production: TearProduction::Low,
            wears_glasses: true,
            vision_sharpness: VisionSharpness::Poor,
            occupation_type: OccupationType::ScreenBased,
            blue_light_exposure: BlueLightExposure::High,
        };
        let selected = self.selected_field;
        self.clear_sensitive();
        *self = Self::from_input(&sample);
        self.selected_field = selected;
    }

    fn number_text(&self, idx: usize) -> Result<&str, String> {
        match &self.fields[idx].kind {
            FieldKind::Number { value, .. } => Ok(value.trim()),
            _ => Err(format!("{}: not a number field", self.fields[idx].label)),
        }
    }

    fn integer(&self, idx: usize) -> Result<u32, String> {
        self.number_text(idx)?
            .parse()
            .map_err(|_| format!("{}: enter a whole number", self.fields[idx].label))
    }

    fn decimal(&self, idx: usize) -> Result<f64, String> {
        self.number_text(idx)?
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("{}: enter a number", self.fields[idx].label))
    }

    fn flag(&self, idx: usize) -> bool {
        matches!(self.fields[idx].kind, FieldKind::Toggle(true))
    }

    fn level<T: std::str::FromStr<Err = String>>(&self, idx: usize) -> Result<T, String> {
        match &self.fields[idx].kind {
            FieldKind::Choice { options, index } => options
                .get(*index)
                .ok_or_else(|| format!("{}: no level selected", self.fields[idx].label))?
                .parse(),
            _ => Err(format!("{}: not a choice field", self.fields[idx].label)),
        }
    }

    /// Parse the form into a patient record. Range checks are left to
    /// [`PatientInput::validate`].
    ///
    /// # Errors
    /// Returns a message naming the first field that does not parse.
    pub fn to_patient_input(&self) -> Result<PatientInput, String> {
        Ok(PatientInput {
            age: self.integer(AGE)?,
            diabetes: self.flag(DIABETES),
            blood_pressure: self.integer(BLOOD_PRESSURE)?,
            screen_time: self.integer(SCREEN_TIME)?,
            cholesterol: self.integer(CHOLESTEROL)?,
            hba1c: self.decimal(HBA1C)?,
            blurred_vision: self.flag(BLURRED_VISION),
            eye_pain: self.flag(EYE_PAIN),
            family_history: self.flag(FAMILY_HISTORY),
            night_vision_difficulty: self.flag(NIGHT_VISION),
            headache: self.flag(HEADACHE),
            smoking_status: self.level(SMOKING)?,
            tear_production: self.level(TEAR_PRODUCTION)?,
            wears_glasses: self.flag(WEARS_GLASSES),
            vision_sharpness: self.level(VISION_SHARPNESS)?,
            occupation_type: self.level(OCCUPATION)?,
            blue_light_exposure: self.level(BLUE_LIGHT)?,
        })
    }
}

/// Render the patient intake form.
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState, busy: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(f, chunks[0], "Patient Intake", "Vision Risk Factors");
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state, busy);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;
    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(f, columns[1], &state.fields[mid..], mid, state.selected_field);
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (MedicalTheme::border_focused(), MedicalTheme::focused())
        } else {
            (MedicalTheme::border(), MedicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let display = field.display();
        let mut spans = vec![Span::raw(" ")];
        if display.is_empty() {
            spans.push(Span::styled(field.hint(), MedicalTheme::text_muted()));
        } else {
            spans.push(Span::styled(display, MedicalTheme::text()));
        }
        if is_selected {
            spans.push(Span::styled("▌", MedicalTheme::cursor()));
            if !matches!(field.kind, FieldKind::Number { .. }) {
                spans.push(Span::styled(format!("  {}", field.hint()), MedicalTheme::text_muted()));
            }
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &PatientFormState, busy: bool) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", MedicalTheme::danger()),
            Span::styled(err.clone(), MedicalTheme::danger()),
        ])
    } else if busy {
        Line::from(Span::styled(
            "A screening is already running...",
            MedicalTheme::warning(),
        ))
    } else {
        key_hints(&[
            ("↑↓", "Navigate"),
            ("←→", "Adjust"),
            ("Enter", "Submit"),
            ("S", "Sample"),
            ("R", "Reset"),
            ("Esc", "Cancel"),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(state: &mut PatientFormState, idx: usize) {
        state.selected_field = idx;
    }

    #[test]
    fn test_default_form_is_default_input() {
        let state = PatientFormState::default();
        assert_eq!(state.fields.len(), 17);
        assert_eq!(
            state.to_patient_input().expect("parse"),
            PatientInput::default()
        );
    }

    #[test]
    fn test_typing_replaces_number() {
        let mut state = PatientFormState::default();
        select(&mut state, AGE);
        state.clear_field();
        state.input_char('4');
        state.input_char('x');
        state.input_char('7');
        assert_eq!(state.to_patient_input().expect("parse").age, 47);
    }

    #[test]
    fn test_empty_number_is_an_error() {
        let mut state = PatientFormState::default();
        select(&mut state, CHOLESTEROL);
        state.clear_field();
        let err = state.to_patient_input().expect_err("must fail");
        assert!(err.starts_with("Cholesterol"));
    }

    #[test]
    fn test_stepping_clamps_to_bounds() {
        let mut state = PatientFormState::default();
        select(&mut state, SCREEN_TIME);
        for _ in 0..20 {
            state.adjust(true);
        }
        assert_eq!(state.to_patient_input().expect("parse").screen_time, 12);

        select(&mut state, HBA1C);
        state.adjust(false);
        assert_eq!(state.fields[HBA1C].display(), "6.4");
    }

    #[test]
    fn test_decimal_point_only_for_hba1c() {
        let mut state = PatientFormState::default();
        select(&mut state, AGE);
        state.clear_field();
        state.input_char('3');
        state.input_char('.');
        state.input_char('5');
        assert_eq!(state.to_patient_input().expect("parse").age, 35);

        select(&mut state, HBA1C);
        state.clear_field();
        for c in "7.2.5".chars() {
            state.input_char(c);
        }
        assert_eq!(state.to_patient_input().expect("parse").hba1c, 7.25);
    }

    #[test]
    fn test_toggle_and_choice() {
        let mut state = PatientFormState::default();
        select(&mut state, DIABETES);
        state.toggle();
        select(&mut state, OCCUPATION);
        state.adjust(true);
        select(&mut state, SMOKING);
        state.adjust(false);

        let input = state.to_patient_input().expect("parse");
        assert!(input.diabetes);
        assert_eq!(input.occupation_type, OccupationType::NonScreenBased);
        assert_eq!(input.smoking_status, SmokingStatus::Current);
    }

    #[test]
    fn test_sample_and_reset() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        let sample = state.to_patient_input().expect("parse");
        assert_eq!(sample.age, 60);
        assert_eq!(sample.vision_sharpness, VisionSharpness::Poor);
        assert!(sample.validate().is_ok());

        state.reset();
        assert_eq!(
            state.to_patient_input().expect("parse"),
            PatientInput::default()
        );
    }

    #[test]
    fn test_clear_sensitive_wipes_numbers() {
        let mut state = PatientFormState::default();
        state.clear_sensitive();
        assert!(state.fields.iter().all(|f| match &f.kind {
            FieldKind::Number { value, .. } => value.is_empty(),
            _ => true,
        }));
    }
}

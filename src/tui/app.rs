//! Main TUI application state machine.
//!
//! Owns the screen state, routes key events and hands submissions to the
//! background worker.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::{PdfReportRenderer, RandomForestAdapter};
use crate::application::ScreeningService;
use crate::config::AppConfig;

use super::ui::{
    dashboard::{render_dashboard, DashboardState},
    patient::{render_patient_form, PatientFormState},
    render_disclaimer,
    result::{render_result, ResultState},
};
use super::worker::{ScreeningProgress, ScreeningWorker, ScreeningWorkerHandle};

type Service = ScreeningService<RandomForestAdapter, PdfReportRenderer>;

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    PatientForm,
    Result,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,
    service: Arc<Service>,
    dashboard_state: DashboardState,
    patient_form_state: PatientFormState,
    result_state: ResultState,
    /// At most one screening runs at a time.
    pending_worker: Option<ScreeningWorkerHandle>,
}

impl App {
    /// Load the model and build the screening service from `config`.
    ///
    /// # Errors
    /// Returns error if the model cannot be loaded or its schema is unusable.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let policy = config
            .artifact_policy()
            .context("Failed to load the model verifying key")?;
        let model = RandomForestAdapter::from_path(&config.model_path, &policy).with_context(|| {
            format!(
                "Failed to load model from {:?}. Set VISIONCARE_MODEL_PATH to a directory containing vision_model.json.",
                config.model_path
            )
        })?;

        let mut dashboard_state = DashboardState {
            report_dir: config.report_dir.display().to_string(),
            ..DashboardState::default()
        };
        if let Some(summary) = model.summary() {
            dashboard_state.model_source = summary.source.display().to_string();
            dashboard_state.n_trees = summary.n_trees;
            dashboard_state.signed = summary.signed;
        }

        let renderer = PdfReportRenderer::new(config.report_dir.clone());
        let service = ScreeningService::new(Arc::new(model), Arc::new(renderer))
            .context("Model schema cannot be used by the feature encoder")?;
        dashboard_state.schema_width = service.schema().len();
        dashboard_state.zero_filled = service.schema().unmatched().to_vec();

        Ok(Self::with_service(Arc::new(service), dashboard_state))
    }

    /// Create the application around an already-built service.
    #[must_use]
    pub fn with_service(service: Arc<Service>, dashboard_state: DashboardState) -> Self {
        Self {
            screen: Screen::Dashboard,
            should_quit: false,
            service,
            dashboard_state,
            patient_form_state: PatientFormState::default(),
            result_state: ResultState::default(),
            pending_worker: None,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            self.poll_worker();

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::Dashboard => render_dashboard(f, chunks[0], &self.dashboard_state),
                    Screen::PatientForm => render_patient_form(
                        f,
                        chunks[0],
                        &self.patient_form_state,
                        self.pending_worker.is_some(),
                    ),
                    Screen::Result => render_result(f, chunks[0], &self.result_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn poll_worker(&mut self) {
        // Drain every queued update; stop once the worker has finished.
        loop {
            let Some(progress) = self
                .pending_worker
                .as_ref()
                .and_then(ScreeningWorkerHandle::try_recv)
            else {
                break;
            };

            match progress {
                ScreeningProgress::Encoding => self.result_state = ResultState::Encoding,
                ScreeningProgress::Predicting => self.result_state = ResultState::Predicting,
                ScreeningProgress::Reporting => self.result_state = ResultState::Reporting,
                ScreeningProgress::Complete(outcome) => {
                    self.dashboard_state
                        .session
                        .record(outcome.screening.result.predicted_class);
                    self.result_state = ResultState::Complete(outcome);
                    self.pending_worker = None;
                    // Plaintext form buffers are cleared once the screening succeeded.
                    self.patient_form_state.reset();
                }
                ScreeningProgress::Error(message) => {
                    self.result_state = ResultState::Error(message);
                    self.pending_worker = None;
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::PatientForm => self.handle_patient_form_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n' | 'N') => self.open_form(),
            KeyCode::Char('q' | 'Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_patient_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.screen = Screen::Dashboard,
            KeyCode::Up | KeyCode::BackTab => self.patient_form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.patient_form_state.next_field(),
            KeyCode::Left => self.patient_form_state.adjust(false),
            KeyCode::Right => self.patient_form_state.adjust(true),
            KeyCode::Char(' ') => self.patient_form_state.toggle(),
            KeyCode::Char('s' | 'S') => self.patient_form_state.load_sample_data(),
            KeyCode::Char('r' | 'R') => self.patient_form_state.reset(),
            KeyCode::Char(c) => self.patient_form_state.input_char(c),
            KeyCode::Backspace => self.patient_form_state.delete_char(),
            KeyCode::Delete => self.patient_form_state.clear_field(),
            KeyCode::Enter => self.submit_patient_form(),
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        match &self.result_state {
            ResultState::Complete(_) => match key {
                KeyCode::Enter | KeyCode::Esc => self.screen = Screen::Dashboard,
                KeyCode::Char('n' | 'N') => self.open_form(),
                _ => {}
            },
            ResultState::Error(_) => match key {
                KeyCode::Enter => self.screen = Screen::PatientForm,
                KeyCode::Esc => self.screen = Screen::Dashboard,
                _ => {}
            },
            ResultState::Idle if key == KeyCode::Esc => self.screen = Screen::Dashboard,
            _ => {}
        }
    }

    fn open_form(&mut self) {
        self.patient_form_state.reset();
        self.screen = Screen::PatientForm;
    }

    fn submit_patient_form(&mut self) {
        if self.pending_worker.is_some() {
            return;
        }

        let input = match self.patient_form_state.to_patient_input() {
            Ok(input) => input,
            Err(message) => {
                self.patient_form_state.error_message = Some(message);
                return;
            }
        };
        if let Err(errors) = input.validate() {
            self.patient_form_state.error_message = Some(errors.join(", "));
            return;
        }

        self.screen = Screen::Result;
        self.result_state = ResultState::Encoding;
        // The form keeps its values until the screening completes, so a failed
        // run can be corrected and resubmitted.
        self.pending_worker = Some(ScreeningWorker::spawn(Arc::clone(&self.service), input));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ArtifactPolicy;
    use crate::domain::PatientInput;
    use std::path::Path;
    use std::sync::mpsc;

    fn demo_app(report_dir: &Path) -> App {
        let models = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        let model = RandomForestAdapter::from_path(&models, &ArtifactPolicy::permissive())
            .expect("demo model");
        let renderer = PdfReportRenderer::new(report_dir.to_path_buf());
        let service = ScreeningService::new(Arc::new(model), Arc::new(renderer)).expect("service");
        App::with_service(Arc::new(service), DashboardState::default())
    }

    #[test]
    fn test_failed_screening_keeps_form_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = demo_app(temp.path());
        app.open_form();
        app.patient_form_state.load_sample_data();
        let sample = app.patient_form_state.to_patient_input().expect("sample");

        app.submit_patient_form();
        assert_eq!(app.screen, Screen::Result);
        assert!(app.pending_worker.is_some());

        // Swap in a worker that fails.
        let (tx, rx) = mpsc::channel();
        tx.send(ScreeningProgress::Error("classifier unavailable".into()))
            .expect("send");
        app.pending_worker = Some(ScreeningWorkerHandle::from_receiver(rx));
        app.poll_worker();

        assert!(app.pending_worker.is_none());
        assert!(matches!(app.result_state, ResultState::Error(_)));

        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.screen, Screen::PatientForm);
        assert_eq!(app.patient_form_state.to_patient_input().expect("form"), sample);
    }

    #[test]
    fn test_completed_screening_clears_form() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = demo_app(temp.path());
        app.open_form();
        app.patient_form_state.load_sample_data();

        app.submit_patient_form();
        for _ in 0..500 {
            app.poll_worker();
            if app.pending_worker.is_none() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(matches!(app.result_state, ResultState::Complete(_)));
        assert_eq!(app.dashboard_state.session.total, 1);
        assert_eq!(
            app.patient_form_state.to_patient_input().expect("form"),
            PatientInput::default()
        );
    }
}

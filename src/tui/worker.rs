//! Background worker that runs one screening off the UI thread.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::application::ScreeningService;
use crate::domain::{PatientInput, Screening};
use crate::ports::{ModelGateway, RenderedReport, ReportRenderer};

/// A finished screening plus the outcome of rendering its report.
#[derive(Debug, Clone)]
pub struct ScreeningOutcome {
    pub screening: Screening,
    /// The result stays valid when only the report fails.
    pub report: Result<RenderedReport, String>,
}

/// Progress updates from the screening worker.
#[derive(Debug, Clone)]
pub enum ScreeningProgress {
    Encoding,
    Predicting,
    Reporting,
    Complete(Box<ScreeningOutcome>),
    Error(String),
}

/// Handle to a running screening worker.
pub struct ScreeningWorkerHandle {
    progress_rx: Receiver<ScreeningProgress>,
    _handle: JoinHandle<()>,
}

impl ScreeningWorkerHandle {
    /// Next progress update, if one is waiting.
    ///
    /// A worker that went away without a final update is reported as
    /// [`ScreeningProgress::Error`] so the caller never waits on it forever.
    #[must_use]
    pub fn try_recv(&self) -> Option<ScreeningProgress> {
        match self.progress_rx.try_recv() {
            Ok(progress) => Some(progress),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::error!("Screening worker stopped without a result");
                Some(ScreeningProgress::Error(
                    "Screening worker stopped unexpectedly".into(),
                ))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn from_receiver(progress_rx: Receiver<ScreeningProgress>) -> Self {
        Self {
            progress_rx,
            _handle: thread::spawn(|| {}),
        }
    }
}

pub struct ScreeningWorker;

impl ScreeningWorker {
    /// Run `input` through `service` on a new thread.
    pub fn spawn<M, R>(service: Arc<ScreeningService<M, R>>, input: PatientInput) -> ScreeningWorkerHandle
    where
        M: ModelGateway + 'static,
        R: ReportRenderer + 'static,
    {
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            Self::run_with_progress(&service, input, &tx);
        });

        ScreeningWorkerHandle {
            progress_rx: rx,
            _handle: handle,
        }
    }

    fn run_with_progress<M, R>(
        service: &ScreeningService<M, R>,
        input: PatientInput,
        tx: &Sender<ScreeningProgress>,
    ) where
        M: ModelGateway,
        R: ReportRenderer,
    {
        let _ = tx.send(ScreeningProgress::Encoding);
        let _ = tx.send(ScreeningProgress::Predicting);

        let screening = match service.run_screening(input) {
            Ok(screening) => screening,
            Err(e) => {
                tracing::error!("Screening failed: {}", e);
                let _ = tx.send(ScreeningProgress::Error(e.to_string()));
                return;
            }
        };

        let _ = tx.send(ScreeningProgress::Reporting);
        let report = service.render_report(&screening).map_err(|e| {
            tracing::warn!("Report rendering failed: {}", e);
            e.to_string()
        });

        let _ = tx.send(ScreeningProgress::Complete(Box::new(ScreeningOutcome {
            screening,
            report,
        })));
    }
}

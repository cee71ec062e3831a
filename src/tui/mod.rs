//! TUI module: terminal intake form built on Ratatui.
//!
//! - Dashboard with model status and session counts
//! - Patient intake form
//! - Screening result with confidence gauge and report location

mod app;
mod styles;
mod ui;
mod worker;

pub use app::App;
pub use styles::MedicalTheme;
pub use worker::{ScreeningOutcome, ScreeningProgress, ScreeningWorker, ScreeningWorkerHandle};

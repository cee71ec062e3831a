//! Ports layer: traits at the boundaries to external collaborators.
//!
//! The classifier and the report renderer are consumed through these traits so
//! the pipeline can be driven by fakes in tests.

mod model_gateway;
mod report_renderer;

pub use model_gateway::{ModelError, ModelGateway};
pub use report_renderer::{RenderError, RenderedReport, ReportRenderer};

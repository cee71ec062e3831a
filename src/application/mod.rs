//! Application layer: the screening use case.
//!
//! Orchestrates domain logic with the classifier and renderer ports.

mod screening;

pub use screening::ScreeningService;

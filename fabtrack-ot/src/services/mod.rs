//! Service layer: the progress engine
//!
//! The transition controller is the sole writer of the progress and
//! duration logs; the projector and analytics are read-only consumers.

pub mod analytics;
pub mod projector;
pub mod transitions;

pub use analytics::StepAnalytics;
pub use projector::ProgressProjector;
pub use transitions::TransitionController;

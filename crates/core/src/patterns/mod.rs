//! Multi-game tactical pattern detection

mod aggregate;
mod detector;
pub mod motifs;
pub mod recommend;
mod types;

pub use aggregate::{
    accuracy_from_cp_losses, analyze_phase_performance, detect_tactical_patterns, overall_accuracy,
};
pub use detector::PatternDetector;
pub use recommend::generate_recommendations;
pub use types::*;

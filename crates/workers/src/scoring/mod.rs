mod context;
mod engine;
mod finding;
mod signature;

pub use context::ContextScorer;
pub use engine::{Scorer, ScorerError, ScoringEngine};
pub use finding::{severity_for_score, AlertSeverity, Finding};
pub use signature::SignatureScorer;

/// The default scorer set for a fresh deployment.
pub fn default_scorers() -> Vec<Box<dyn Scorer>> {
    vec![Box::new(SignatureScorer), Box::new(ContextScorer)]
}

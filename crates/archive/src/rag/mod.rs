//! Answer synthesis over retrieved documents.

pub mod synthesizer;
pub mod types;

pub use synthesizer::{build_context, AnswerSynthesizer, APOLOGY_ANSWER};
pub use types::{AnswerResult, Citation};

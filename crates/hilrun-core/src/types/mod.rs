//! # Types
//!
//! Value types shared by the classifier, the annotator and the interpreter.

pub mod line;
pub mod location;
pub mod verdict;

// Re-export all public types
pub use line::OutputLine;
pub use location::Location;
pub use verdict::Verdict;

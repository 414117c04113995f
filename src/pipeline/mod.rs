pub mod analyzer;
pub mod classify;
pub mod extraction;
pub mod llm;
pub mod prompt;

pub use analyzer::*;
pub use classify::*;
pub use prompt::*;

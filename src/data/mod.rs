//! Example construction from feedback and conversation history

pub mod example;
pub mod loader;

pub use example::{Example, FeedbackScore};
pub use loader::{build_example, ExampleLoader};

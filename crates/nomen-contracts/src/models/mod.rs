//! Which Gemini model serves which call.

mod registry;
mod selectors;

pub use registry::{Capability, ModelRegistry, ModelSpec};
pub use selectors::{ModelSelection, ModelSelector};

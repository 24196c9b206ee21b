//! Model synthesis: converts introspected table descriptors into typed
//! record shapes used for validating inbound payloads and serializing rows.

mod synthesize;
mod types;

pub use synthesize::{semantic_type, synthesize};
pub use types::{FieldRules, FieldSpec, SemanticType, SynthesisMode, SynthesizedModel};

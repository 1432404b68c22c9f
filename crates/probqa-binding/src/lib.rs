//! probqa-binding: handle-based surface over the probqa engine.
//!
//! Engines live in a registry and are addressed by opaque [`EngineHandle`]s.
//! Every call reports a stable [`ErrorCode`], which makes this crate the
//! layer to wrap for other languages.

pub mod api;
pub mod error_code;
pub mod registry;

pub use api::ScopedEngine;
pub use error_code::ErrorCode;
pub use registry::{EngineHandle, EngineRegistry};

pub use probqa_core::{AnsweredQuestion, EngineDefinition, RatedTarget, TPqaId};

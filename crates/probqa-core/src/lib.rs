//! probqa-core: probabilistic question-answering engine.
//!
//! This crate holds the knowledge base, its training, the quizzes that read
//! it back, and the id mappers and maintenance operations around them.

pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod id_mapper;
pub mod inference;
pub mod kb;
pub mod model;
pub mod persistence;
pub mod quiz;

pub use config::{EngineDefinition, ProbqaConfig};
pub use engine::{EngineMode, PqaEngine};
pub use error::{PqaError, PqaResult};
pub use factory::{create_engine, load_engine, open_engine};
pub use model::{AnsweredQuestion, EngineDimensions, RatedTarget, TPqaId, DEFAULT_AMOUNT};

//! Engine construction.
//!
//! Dispatches on backend and numeric precision. Only the CPU backend with
//! double precision is implemented.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{EngineDefinition, ProbqaConfig};
use crate::engine::PqaEngine;
use crate::error::{PqaError, PqaResult};
use crate::model::{EngineBackend, Precision};
use crate::persistence;

fn check_supported(backend: EngineBackend, precision: Precision) -> PqaResult<()> {
    match (backend, precision) {
        (EngineBackend::Cpu, Precision::Double) => Ok(()),
        (EngineBackend::Cpu, other) => Err(PqaError::NotImplemented(format!(
            "engine on CPU with {other} precision"
        ))),
        (other, _) => Err(PqaError::NotImplemented(format!("engine on {other}"))),
    }
}

/// Create an engine with a fresh knowledge base.
pub fn create_engine(def: &EngineDefinition) -> PqaResult<PqaEngine> {
    check_supported(def.backend, def.precision)?;
    PqaEngine::new(def)
}

/// Create an engine from a knowledge base file.
pub fn load_engine(path: &Path, max_quizzes: usize) -> PqaResult<PqaEngine> {
    let snapshot = persistence::load_snapshot(path)?;
    check_supported(EngineBackend::Cpu, snapshot.precision)?;
    PqaEngine::from_snapshot(snapshot, max_quizzes)
}

/// Open the engine described by a configuration: load the configured
/// knowledge base if the file exists, otherwise create a fresh one.
pub fn open_engine(config: &ProbqaConfig) -> Result<PqaEngine> {
    check_supported(config.engine.backend, config.engine.precision)?;
    match config.knowledge_base_path() {
        Some(path) if path.exists() => load_engine(&path, config.engine.max_quizzes)
            .with_context(|| format!("failed to load knowledge base: {}", path.display())),
        Some(path) => {
            tracing::info!(
                "knowledge base {} not found, creating a fresh engine",
                path.display()
            );
            Ok(create_engine(&config.engine)?)
        }
        None => Ok(create_engine(&config.engine)?),
    }
}

//! Engine registry: maps opaque handles to live engines.
//!
//! Callers never hold an engine directly. Each call looks the handle up and
//! works on a shared reference, so releasing a handle cannot free an engine
//! that another thread is still using.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, RwLock};

use probqa_core::{EngineDefinition, PqaEngine, PqaError};

use crate::error_code::ErrorCode;

/// Opaque engine handle. Values are never reused within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(u64);

impl EngineHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine#{}", self.0)
    }
}

/// Process-wide registry used by the free functions in `api`.
static GLOBAL_REGISTRY: LazyLock<EngineRegistry> = LazyLock::new(EngineRegistry::new);

/// Owner of every engine created through the binding.
pub struct EngineRegistry {
    engines: RwLock<HashMap<u64, Arc<PqaEngine>>>,
    // 0 is never issued, so a zeroed handle is always invalid.
    next_handle: AtomicU64,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn global() -> &'static EngineRegistry {
        &GLOBAL_REGISTRY
    }

    /// Take ownership of an engine and issue a handle for it.
    pub fn register(&self, engine: PqaEngine) -> Result<EngineHandle, ErrorCode> {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let engine_id = engine.id();
        self.engines
            .write()
            .map_err(|_| ErrorCode::InternalFailure)?
            .insert(raw, Arc::new(engine));
        tracing::debug!(handle = raw, engine_id = %engine_id, "registered engine");
        Ok(EngineHandle(raw))
    }

    /// Create a fresh engine and register it.
    pub fn create(&self, def: &EngineDefinition) -> Result<EngineHandle, ErrorCode> {
        let engine = probqa_core::create_engine(def).map_err(|e| log_error("create", e))?;
        self.register(engine)
    }

    /// Load an engine from a knowledge base file and register it.
    pub fn load(&self, path: &Path, max_quizzes: usize) -> Result<EngineHandle, ErrorCode> {
        let engine =
            probqa_core::load_engine(path, max_quizzes).map_err(|e| log_error("load", e))?;
        self.register(engine)
    }

    /// Shared reference to the engine behind `handle`.
    pub fn get(&self, handle: EngineHandle) -> Result<Arc<PqaEngine>, ErrorCode> {
        self.engines
            .read()
            .map_err(|_| ErrorCode::InternalFailure)?
            .get(&handle.0)
            .cloned()
            .ok_or(ErrorCode::InvalidHandle)
    }

    /// Destroy the engine behind `handle`.
    ///
    /// The handle is unregistered first, then the engine is shut down, which
    /// waits for calls already running on it. The memory is freed once the
    /// last of those calls drops its reference.
    pub fn release(&self, handle: EngineHandle) -> ErrorCode {
        let removed = match self.engines.write() {
            Ok(mut engines) => engines.remove(&handle.0),
            Err(_) => return ErrorCode::InternalFailure,
        };
        let Some(engine) = removed else {
            tracing::debug!(handle = %handle, "release of unknown handle");
            return ErrorCode::InvalidHandle;
        };
        match engine.shutdown(None) {
            Ok(()) | Err(PqaError::ShutDown) => {
                tracing::debug!(handle = %handle, engine_id = %engine.id(), "released engine");
                ErrorCode::Ok
            }
            Err(e) => log_error("release", e),
        }
    }

    /// Number of registered engines.
    pub fn len(&self) -> usize {
        self.engines.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn log_error(operation: &'static str, err: PqaError) -> ErrorCode {
    let code = ErrorCode::from(&err);
    tracing::debug!(operation, code = code.as_i32(), "call failed: {err}");
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use probqa_core::AnsweredQuestion;

    fn registry_with_engine() -> (EngineRegistry, EngineHandle) {
        let registry = EngineRegistry::new();
        let handle = registry
            .create(&EngineDefinition::new(2, 11, 4))
            .unwrap();
        (registry, handle)
    }

    #[test]
    fn handles_are_never_reused() {
        let registry = EngineRegistry::new();
        let def = EngineDefinition::new(2, 3, 3);
        let first = registry.create(&def).unwrap();
        assert_eq!(registry.release(first), ErrorCode::Ok);
        let second = registry.create(&def).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn release_twice_is_invalid_handle() {
        let (registry, handle) = registry_with_engine();
        assert_eq!(registry.release(handle), ErrorCode::Ok);
        assert_eq!(registry.release(handle), ErrorCode::InvalidHandle);
        assert!(registry.is_empty());
    }

    #[test]
    fn zero_handle_is_invalid() {
        let (registry, _) = registry_with_engine();
        assert!(matches!(
            registry.get(EngineHandle::from_raw(0)),
            Err(ErrorCode::InvalidHandle)
        ));
    }

    #[test]
    fn in_flight_reference_sees_shutdown() {
        let (registry, handle) = registry_with_engine();
        let engine = registry.get(handle).unwrap();
        assert_eq!(registry.release(handle), ErrorCode::Ok);
        let err = engine.dims().unwrap_err();
        assert_eq!(ErrorCode::from(err), ErrorCode::InvalidHandle);
        let batch = [AnsweredQuestion::new(0, 1)];
        for result in [
            engine.train(2, &batch, 0, 1.0),
            engine.train(1, &batch, 0, f64::NAN),
        ] {
            assert_eq!(ErrorCode::from(result.unwrap_err()), ErrorCode::InvalidHandle);
        }
    }

    #[test]
    fn create_reports_oversized_definition() {
        let registry = EngineRegistry::new();
        assert!(matches!(
            registry.create(&EngineDefinition::new(2, 1 << 32, 1 << 32)),
            Err(ErrorCode::InvalidDefinition)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn create_reports_bad_definition() {
        let registry = EngineRegistry::new();
        assert!(matches!(
            registry.create(&EngineDefinition::new(1, 3, 3)),
            Err(ErrorCode::InvalidDefinition)
        ));
        assert!(registry.is_empty());
    }
}

//! Knowledge base files.
//!
//! A knowledge base is stored as a single JSON document. Open quizzes are
//! never persisted.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PqaError, PqaResult};
use crate::id_mapper::IdMapper;
use crate::kb::KnowledgeBase;
use crate::model::{EngineDimensions, Precision};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to rebuild an engine's knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbSnapshot {
    pub format_version: u32,
    /// Instance id of the engine that wrote the file.
    pub engine_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub precision: Precision,
    pub dims: EngineDimensions,
    pub kb: KnowledgeBase,
    pub questions: IdMapper,
    pub targets: IdMapper,
    #[serde(default)]
    pub total_questions_asked: u64,
}

impl KbSnapshot {
    /// Check internal consistency of a snapshot read from disk.
    pub fn validate(&self) -> PqaResult<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(PqaError::Format(format!(
                "unsupported format version {}, expected {FORMAT_VERSION}",
                self.format_version
            )));
        }
        self.kb.check_shape()?;
        if self.dims.n_answers < 2 {
            return Err(PqaError::Format(format!(
                "need at least 2 answers, got {}",
                self.dims.n_answers
            )));
        }
        let kb_dims = (
            self.kb.n_answers() as i64,
            self.kb.n_questions() as i64,
            self.kb.n_targets() as i64,
        );
        let declared = (self.dims.n_answers, self.dims.n_questions, self.dims.n_targets);
        if kb_dims != declared {
            return Err(PqaError::Format(format!(
                "dimensions {declared:?} do not match statistics {kb_dims:?}"
            )));
        }
        if self.questions.len() != self.dims.n_questions || self.targets.len() != self.dims.n_targets {
            return Err(PqaError::Format(
                "id mappers do not match dimensions".into(),
            ));
        }
        if self.targets.live_count() == 0 {
            return Err(PqaError::Format("no live targets".into()));
        }
        Ok(())
    }
}

/// Write a snapshot, replacing `path` only once the new file is complete.
pub fn save_snapshot(path: &Path, snapshot: &KbSnapshot) -> PqaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(snapshot)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    tracing::info!(
        path = %path.display(),
        questions = snapshot.dims.n_questions,
        targets = snapshot.dims.n_targets,
        "saved knowledge base"
    );
    Ok(())
}

/// Read and validate a snapshot.
pub fn load_snapshot(path: &Path) -> PqaResult<KbSnapshot> {
    let content = std::fs::read(path)?;
    let snapshot: KbSnapshot = serde_json::from_slice(&content)?;
    snapshot.validate()?;
    tracing::debug!(path = %path.display(), engine_id = %snapshot.engine_id, "loaded knowledge base");
    Ok(snapshot)
}

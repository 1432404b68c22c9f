//! Engine definition and configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{PqaError, PqaResult};
use crate::kb;
use crate::model::{EngineBackend, Precision, TPqaId};

/// Everything needed to create a fresh engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineDefinition {
    /// Number of possible answers to every question.
    #[serde(default = "default_answers")]
    pub n_answers: TPqaId,
    /// Initial number of questions.
    pub n_questions: TPqaId,
    /// Initial number of targets.
    pub n_targets: TPqaId,
    /// Amount every statistics cell starts with.
    #[serde(default = "default_initial_amount")]
    pub initial_amount: f64,
    /// Numeric precision of the knowledge base.
    #[serde(default = "default_precision")]
    pub precision: Precision,
    /// Where the engine runs.
    #[serde(default = "default_backend")]
    pub backend: EngineBackend,
    /// Maximum number of open quizzes; starting one more evicts the oldest.
    #[serde(default = "default_max_quizzes")]
    pub max_quizzes: usize,
}

fn default_answers() -> TPqaId {
    3
}
fn default_initial_amount() -> f64 {
    0.1
}
fn default_precision() -> Precision {
    Precision::Double
}
fn default_backend() -> EngineBackend {
    EngineBackend::Cpu
}
fn default_max_quizzes() -> usize {
    1024
}

impl EngineDefinition {
    /// Definition with the given dimensions and defaults for the rest.
    pub fn new(n_answers: TPqaId, n_questions: TPqaId, n_targets: TPqaId) -> Self {
        Self {
            n_answers,
            n_questions,
            n_targets,
            initial_amount: default_initial_amount(),
            precision: default_precision(),
            backend: default_backend(),
            max_quizzes: default_max_quizzes(),
        }
    }

    /// Check that the definition describes a usable engine.
    pub fn validate(&self) -> PqaResult<()> {
        if self.n_answers < 2 {
            return Err(PqaError::InvalidDefinition(format!(
                "need at least 2 answers, got {}",
                self.n_answers
            )));
        }
        if self.n_questions < 1 {
            return Err(PqaError::InvalidDefinition(format!(
                "need at least 1 question, got {}",
                self.n_questions
            )));
        }
        if self.n_targets < 2 {
            return Err(PqaError::InvalidDefinition(format!(
                "need at least 2 targets, got {}",
                self.n_targets
            )));
        }
        let dims = (
            usize::try_from(self.n_answers),
            usize::try_from(self.n_questions),
            usize::try_from(self.n_targets),
        );
        let fits = match dims {
            (Ok(k), Ok(q), Ok(t)) => kb::cell_counts(k, q, t).is_some(),
            _ => false,
        };
        if !fits {
            return Err(PqaError::InvalidDefinition(format!(
                "{} questions x {} answers x {} targets is too large",
                self.n_questions, self.n_answers, self.n_targets
            )));
        }
        if !self.initial_amount.is_finite() || self.initial_amount <= 0.0 {
            return Err(PqaError::InvalidDefinition(format!(
                "initial amount must be positive and finite, got {}",
                self.initial_amount
            )));
        }
        if self.max_quizzes == 0 {
            return Err(PqaError::InvalidDefinition(
                "max_quizzes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level probqa configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbqaConfig {
    /// Definition used when no knowledge base file is loaded.
    pub engine: EngineDefinition,
    /// Knowledge base file to load on startup, if present. `${VAR}`
    /// references are expanded from the environment.
    #[serde(default)]
    pub knowledge_base: Option<String>,
}

impl ProbqaConfig {
    /// Resolved path of the knowledge base file.
    pub fn knowledge_base_path(&self) -> Option<PathBuf> {
        self.knowledge_base
            .as_deref()
            .map(resolve_env_vars)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `probqa.toml` in the current directory
/// 2. `~/.config/probqa/config.toml`
///
/// Environment variable overrides: `PROBQA_INITIAL_AMOUNT`, `PROBQA_MAX_QUIZZES`.
pub fn load_config() -> Result<Option<ProbqaConfig>> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
///
/// Returns `Ok(None)` when no path was given and no default file exists.
pub fn load_config_from(path: Option<&Path>) -> Result<Option<ProbqaConfig>> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("probqa.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let Some(path) = config_path else {
        return Ok(None);
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let mut config = parse_config_str(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
    apply_env_overrides(&mut config.engine)?;
    config
        .engine
        .validate()
        .with_context(|| format!("invalid engine definition in {}", path.display()))?;

    tracing::debug!("loaded probqa config from {}", path.display());
    Ok(Some(config))
}

/// Parse a TOML string into a `ProbqaConfig` (useful for testing).
pub fn parse_config_str(content: &str) -> Result<ProbqaConfig> {
    toml::from_str(content).context("failed to parse TOML")
}

fn apply_env_overrides(def: &mut EngineDefinition) -> Result<()> {
    if let Ok(v) = std::env::var("PROBQA_INITIAL_AMOUNT") {
        def.initial_amount = v
            .parse()
            .with_context(|| format!("PROBQA_INITIAL_AMOUNT is not a number: {v}"))?;
    }
    if let Ok(v) = std::env::var("PROBQA_MAX_QUIZZES") {
        def.max_quizzes = v
            .parse()
            .with_context(|| format!("PROBQA_MAX_QUIZZES is not an integer: {v}"))?;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("probqa"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
knowledge_base = "${_PROBQA_TEST_DIR}/animals.kb.json"

[engine]
n_answers = 4
n_questions = 20
n_targets = 50
precision = "double"
"#;

    #[test]
    fn parse_with_defaults() {
        let config = parse_config_str(SAMPLE).unwrap();
        assert_eq!(config.engine.n_answers, 4);
        assert_eq!(config.engine.n_targets, 50);
        assert_eq!(config.engine.backend, EngineBackend::Cpu);
        assert!((config.engine.initial_amount - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.engine.max_quizzes, 1024);
    }

    #[test]
    fn knowledge_base_path_expands_env() {
        std::env::set_var("_PROBQA_TEST_DIR", "/var/lib/probqa");
        let config = parse_config_str(SAMPLE).unwrap();
        assert_eq!(
            config.knowledge_base_path(),
            Some(PathBuf::from("/var/lib/probqa/animals.kb.json"))
        );
        std::env::remove_var("_PROBQA_TEST_DIR");
    }

    #[test]
    fn resolve_env_vars_expansion() {
        std::env::set_var("_PROBQA_TEST_KB", "kb");
        assert_eq!(resolve_env_vars("${_PROBQA_TEST_KB}.json"), "kb.json");
        assert_eq!(
            resolve_env_vars("/${_PROBQA_TEST_KB}/${_PROBQA_TEST_KB}"),
            "/kb/kb"
        );
        assert_eq!(resolve_env_vars("${_PROBQA_TEST_UNSET}/x"), "/x");
        assert_eq!(resolve_env_vars("${_PROBQA_TEST_KB"), "${_PROBQA_TEST_KB");
        std::env::remove_var("_PROBQA_TEST_KB");
    }

    #[test]
    fn validate_rejects_degenerate_dimensions() {
        assert!(EngineDefinition::new(1, 5, 5).validate().is_err());
        assert!(EngineDefinition::new(3, 0, 5).validate().is_err());
        assert!(EngineDefinition::new(3, 5, 1).validate().is_err());
        let mut def = EngineDefinition::new(3, 5, 5);
        def.initial_amount = f64::NAN;
        assert!(def.validate().is_err());
        assert!(EngineDefinition::new(3, 5, 5).validate().is_ok());
    }

    #[test]
    fn validate_rejects_unaddressable_dimensions() {
        let def = EngineDefinition::new(2, 1 << 32, 1 << 32);
        assert!(matches!(
            def.validate(),
            Err(PqaError::InvalidDefinition(_))
        ));
        let def = EngineDefinition::new(2, TPqaId::MAX, 2);
        assert!(matches!(
            def.validate(),
            Err(PqaError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let result = load_config_from(Some(Path::new("/nonexistent/probqa.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probqa.toml");
        std::fs::write(
            &path,
            "[engine]\nn_questions = 3\nn_targets = 4\ninitial_amount = 0.5\n",
        )
        .unwrap();
        let config = load_config_from(Some(&path)).unwrap().unwrap();
        assert_eq!(config.engine.n_questions, 3);
        assert!(config.knowledge_base_path().is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not [valid toml }{").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }
}

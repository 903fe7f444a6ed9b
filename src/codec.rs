//! Codec pipelines
//!
//! A [`Codec`] starts with its definition's `create` and runs further
//! user-supplied steps after it. [`Codec::pipe`] returns a new pipeline and
//! leaves the receiver untouched, so a base codec can be shared and extended
//! in several directions.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::definition::Definition;
use crate::error::{Result, SchemaError};
use crate::registry::Registry;
use crate::value::Value;

/// A pipeline step
pub type Step<'r> = Arc<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'r>;

/// Outcome of [`Codec::execute`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CodecResult {
    Success { value: Value },
    /// `step` is zero-based; step 0 is the definition's `create`
    Failure { step: usize, message: String },
}

impl CodecResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CodecResult::Success { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            CodecResult::Success { value } => Some(value),
            CodecResult::Failure { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<Value> {
        match self {
            CodecResult::Success { value } => Ok(value),
            CodecResult::Failure { step, message } => Err(SchemaError::CodecStepFailed { step, message }),
        }
    }
}

/// Immutable, short-circuiting chain of steps
#[derive(Clone)]
pub struct Codec<'r> {
    definition_id: String,
    steps: Vec<Step<'r>>,
}

impl<'r> Codec<'r> {
    /// Pipeline whose only step is `definition`'s `create`
    pub fn new(registry: &'r Registry, definition: Arc<dyn Definition>) -> Self {
        let definition_id = definition.id().to_string();
        let seed: Step<'r> = Arc::new(move |value: Value| -> anyhow::Result<Value> {
            Ok(definition.create_value(registry, value)?)
        });
        Self {
            definition_id,
            steps: vec![seed],
        }
    }

    /// Look the definition up by id
    pub fn for_id(registry: &'r Registry, id: &str) -> Result<Self> {
        let entry = registry
            .get_by_id(id)
            .ok_or_else(|| SchemaError::DefinitionNotFound { id: id.to_string() })?;
        Ok(Self::new(registry, entry.definition().to_shared()))
    }

    /// New pipeline with `step` appended
    pub fn pipe(&self, step: impl Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'r) -> Self {
        let mut steps = self.steps.clone();
        steps.push(Arc::new(step));
        Self {
            definition_id: self.definition_id.clone(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn execute(&self, input: impl Into<Value>) -> CodecResult {
        let mut value = input.into();
        for (step, run) in self.steps.iter().enumerate() {
            value = match run(value) {
                Ok(next) => next,
                Err(err) => {
                    debug!(definition = %self.definition_id, step, error = %err, "codec step failed");
                    return CodecResult::Failure {
                        step,
                        message: format!("{:#}", err),
                    };
                }
            };
        }
        CodecResult::Success { value }
    }
}

impl fmt::Debug for Codec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("definition_id", &self.definition_id)
            .field("steps", &self.steps.len())
            .finish()
    }
}

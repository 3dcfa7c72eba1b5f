//! Engine configuration (limits and policy switches).

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Configuration shared by the definer, the rule indexer and the inserter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of supertypes walked above any type.
    pub max_hierarchy_depth: usize,
    /// Maximum number of declarations accepted in one batch.
    pub max_batch_size: usize,
    /// Reject instance creation on types that are not yet committed.
    pub require_committed_types: bool,
    /// Index negations nested inside negations as negative conditions.
    pub index_nested_negations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: 1024,
            max_batch_size: 65_536,
            require_committed_types: true,
            index_nested_negations: true,
        }
    }
}

impl EngineConfig {
    /// Validate limits.
    ///
    /// This must be called before constructing a `GraphEngine`.
    pub fn validate(&self) -> GraphResult<()> {
        if self.max_hierarchy_depth == 0 {
            return Err(GraphError::config("max_hierarchy_depth must be > 0"));
        }
        if self.max_batch_size == 0 {
            return Err(GraphError::config("max_batch_size must be > 0"));
        }
        Ok(())
    }

    /// Parse a configuration from JSON and validate it. Missing fields take their defaults.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GraphError::config(format!("invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Fails if a batch of `size` declarations exceeds `max_batch_size`.
    pub fn check_batch_size(&self, size: usize) -> GraphResult<()> {
        if size > self.max_batch_size {
            return Err(GraphError::config(format!(
                "batch of {size} declarations exceeds max_batch_size {}",
                self.max_batch_size
            )));
        }
        Ok(())
    }
}

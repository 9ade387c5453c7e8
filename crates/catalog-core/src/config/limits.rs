//! Platform limits on tree shape and listing sizes.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Platform-wide structural limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of levels in the entity tree, root included.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: u32,
    /// Maximum number of descendant levels a single delete may cascade
    /// through. Deeper cascades are rejected, never truncated.
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: u32,
    /// Benefactor resolution gives up after `max_tree_depth * factor` hops.
    #[serde(default = "default_benefactor_hop_factor")]
    pub benefactor_hop_factor: u32,
    /// Largest page a single change-log listing may return.
    #[serde(default = "default_change_list_max_limit")]
    pub change_list_max_limit: u32,
}

impl LimitsConfig {
    /// Upper bound on parent hops during benefactor resolution.
    pub fn max_benefactor_hops(&self) -> usize {
        self.max_tree_depth as usize * self.benefactor_hop_factor as usize
    }

    /// Reject nonsensical limit combinations.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_tree_depth == 0 {
            return Err(AppError::configuration("limits.max_tree_depth must be positive"));
        }
        if self.max_cascade_depth == 0 {
            return Err(AppError::configuration(
                "limits.max_cascade_depth must be positive",
            ));
        }
        if self.benefactor_hop_factor == 0 {
            return Err(AppError::configuration(
                "limits.benefactor_hop_factor must be positive",
            ));
        }
        if self.change_list_max_limit == 0 {
            return Err(AppError::configuration(
                "limits.change_list_max_limit must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: default_max_tree_depth(),
            max_cascade_depth: default_max_cascade_depth(),
            benefactor_hop_factor: default_benefactor_hop_factor(),
            change_list_max_limit: default_change_list_max_limit(),
        }
    }
}

fn default_max_tree_depth() -> u32 {
    50
}

fn default_max_cascade_depth() -> u32 {
    15
}

fn default_benefactor_hop_factor() -> u32 {
    2
}

fn default_change_list_max_limit() -> u32 {
    1_000
}

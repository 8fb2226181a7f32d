//! Literal text replacements for in-place configuration edits.
//!
//! Each pair is applied at most once across re-runs: a pair whose
//! replacement is already present counts as applied.

use anyhow::Result;

use crate::domain::error::EditError;

/// One literal `old` → `new` substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub old: String,
    pub new: String,
}

impl Replacement {
    #[must_use]
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

/// Result of applying a replacement list to a file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub content: String,
    pub replaced: usize,
    pub already_applied: usize,
}

impl EditPlan {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.replaced > 0
    }
}

/// Apply `replacements` to `content` in order.
///
/// Per pair: when `new` occurs inside `old` (uncommenting
/// `;env[TMP] = /tmp`), presence of `old` decides. Otherwise presence of
/// `new` means the pair was applied on an earlier run; this keeps
/// `start_servers = 2` → `start_servers = 20` from matching its own result.
/// `old` is replaced everywhere it occurs.
///
/// # Errors
///
/// Returns [`EditError::PatternNotFound`] when neither side is present.
pub fn apply(path: &str, content: &str, replacements: &[Replacement]) -> Result<EditPlan> {
    let mut plan = EditPlan {
        content: content.to_string(),
        replaced: 0,
        already_applied: 0,
    };
    for r in replacements {
        let has_old = plan.content.contains(&r.old);
        let has_new = !r.new.is_empty() && plan.content.contains(&r.new);
        let new_inside_old = r.old.contains(&r.new);

        let replace = if new_inside_old {
            has_old
        } else {
            has_old && !has_new
        };

        if replace {
            plan.content = plan.content.replace(&r.old, &r.new);
            plan.replaced += 1;
        } else if has_new {
            plan.already_applied += 1;
        } else {
            return Err(EditError::PatternNotFound {
                path: path.to_string(),
                pattern: r.old.clone(),
            }
            .into());
        }
    }
    Ok(plan)
}

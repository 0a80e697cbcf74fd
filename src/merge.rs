//! Tool-call merging
//!
//! Folds partial tool calls from one chunk into the list accumulated so far,
//! keyed by call identifier.

use crate::types::ToolCall;

/// Merge `incoming` partial calls into `existing`.
///
/// A partial with a non-empty id that matches an accumulated entry appends
/// its argument fragment to that entry; name and type are only replaced by
/// non-empty values. Anything else (including an empty id) is appended as a
/// new entry. Order of first appearance is preserved.
pub fn merge_tool_calls(mut existing: Vec<ToolCall>, incoming: &[ToolCall]) -> Vec<ToolCall> {
    for partial in incoming {
        let slot = if partial.id.is_empty() {
            None
        } else {
            existing.iter_mut().find(|call| call.id == partial.id)
        };

        match slot {
            Some(call) => {
                call.arguments.push_str(&partial.arguments);
                if !partial.name.is_empty() {
                    call.name = partial.name.clone();
                }
                if !partial.r#type.is_empty() {
                    call.r#type = partial.r#type.clone();
                }
            }
            None => existing.push(partial.clone()),
        }
    }
    existing
}

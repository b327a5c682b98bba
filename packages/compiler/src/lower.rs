//! Lowering.
//!
//! A thin finishing pass between analysis and emission. Today the analyzer
//! already produces the basic forms the emitter accepts, so lowering only
//! marks nodes and rejects the high-level types (optionals, slices, error
//! unions) that have no emission yet. Transformations of those forms, and of
//! defer and async, belong here when they arrive.

use crate::diagnostics::Diagnostics;
use crate::error::CompileError;
use crate::tree::{NodeArena, NodeFlags, NodeKind};

/// Returns false when an un-lowerable construct was found; diagnostics carry
/// the details.
pub fn lower(ast: &mut NodeArena, diags: &mut Diagnostics) -> bool {
    let mut ok = true;
    for id in ast.ids().collect::<Vec<_>>() {
        let kind_name = match ast.kind(id) {
            NodeKind::OptionalType { .. } => Some("optional"),
            NodeKind::SliceType { .. } => Some("slice"),
            NodeKind::ErrorUnionType { .. } => Some("error-union"),
            NodeKind::Unwrap { .. } => Some("optional unwrap"),
            _ => None,
        };
        if let Some(what) = kind_name {
            let loc = ast.loc(id);
            diags.error(
                loc,
                CompileError::Internal(format!("{} is not supported by code emission yet", what))
                    .to_string(),
            );
            ok = false;
        }
        ast[id].flags |= NodeFlags::LOWERED;
    }
    ok
}

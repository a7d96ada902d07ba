use mal2ms_core::error::{Error, Result};
use mal2ms_core::result::TranslationResult;

/// Every slot of every node must carry a concrete format.
///
/// Nodes are numbered in data-flow order (base morphs, program, result morphs).
pub fn validate_formats(tr: &TranslationResult) -> Result<()> {
    for (node, op) in tr.ops().enumerate() {
        for (role, slot) in op.slots() {
            match slot.format {
                None => {
                    return Err(Error::IncompleteFormatAssignment {
                        node,
                        op: op.name(),
                        role: role.name(),
                    })
                }
                Some(fmt) if fmt.has_symbolic_bw() => {
                    return Err(Error::Invariant(format!(
                        "field '{}' of operator number {node} ('{}') still has a symbolic bit width",
                        role.name(),
                        op.name()
                    )))
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

//! Debug-time checks on translated programs.
//!
//! Used by the translator and by tests. Cheap, single pass.

use std::collections::BTreeSet;

use mal2ms_core::result::TranslationResult;

/// Output columns written by more than one node, in first-repeat order.
pub fn duplicate_outputs(tr: &TranslationResult) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut dups = Vec::new();
    for op in tr.ops() {
        for (_, slot) in op.outputs() {
            if !seen.insert(slot.col.as_str()) && !dups.contains(&slot.col) {
                dups.push(slot.col.clone());
            }
        }
    }
    dups
}

/// Panics if any column is assigned twice or if a base column is overwritten.
pub fn assert_single_assignment(tr: &TranslationResult) {
    let dups = duplicate_outputs(tr);
    assert!(dups.is_empty(), "columns assigned more than once: {dups:?}");
    for op in tr.ops() {
        for (_, slot) in op.outputs() {
            assert!(
                !tr.is_base_column(&slot.col),
                "{} overwrites base column {}",
                op.name(),
                slot.col
            );
        }
    }
}

//! Tree splicer and temporary artifact cleanup
//!
//! Merges reconciled registry-entry subtrees into the caller's File and
//! Component elements, then disposes of heat's temporary fragment. Most
//! binaries expose no registration data at all; splicing an empty result is
//! the common no-op case, not an error.

use crate::element::WxsElement;
use crate::reconcile::ExtractionResult;
use std::path::Path;

/// Append the harvested children to the caller's File and Component
/// elements. Each set is spliced only if non-empty; the targets are
/// otherwise left untouched.
pub fn splice(result: ExtractionResult, file: &mut WxsElement, component: &mut WxsElement) {
    if !result.file_children.is_empty() {
        file.children.extend(result.file_children);
    }
    if !result.component_children.is_empty() {
        component.children.extend(result.component_children);
    }
}

/// Delete the temporary fragment unless `keep` is set.
///
/// Registration has already succeeded by the time this runs, so a deletion
/// failure is only worth a warning; the artifact is purely diagnostic.
pub fn cleanup_output(path: &Path, keep: bool) {
    if keep {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!(
            "Failed to remove temporary fragment {}: {}",
            path.display(),
            e
        );
    }
}

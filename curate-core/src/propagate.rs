//! Inferred status for the children of an explicitly decided parent.
//!
//! Only `Unset` and proxy children are ever written; explicit decisions on a
//! child win over anything its parent says.

use crate::item::{CatalogItem, InclusionStatus};

/// Give `item` the proxy status matching its parent's decision.  Returns
/// whether the status changed.
pub fn propagate(item: &mut CatalogItem, include: bool) -> bool {
    if item.status.is_explicit() {
        return false;
    }
    let status = InclusionStatus::proxy(include);
    let changed = item.status != status;
    item.status = status;
    changed
}

/// Drop an inherited status after the parent's decision was undone.
pub fn reset(item: &mut CatalogItem) -> bool {
    if item.status.is_proxy() {
        item.status = InclusionStatus::Unset;
        true
    } else {
        false
    }
}

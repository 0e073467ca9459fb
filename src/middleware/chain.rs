//! Effective middleware chain for one route.

use std::collections::HashSet;
use std::sync::Arc;

use super::{MiddlewareId, SharedMiddleware};

/// Builds the ordered chain a route runs.
///
/// Global middleware first, then the route's own, each in registration
/// order. An entry is skipped when its identity is in `forbidden` or has
/// already been added; the first occurrence wins and nothing is reordered.
/// The result depends only on the inputs, so composing twice yields the
/// same chain.
pub fn compose(
    global: &[SharedMiddleware],
    local: &[SharedMiddleware],
    forbidden: &[MiddlewareId],
) -> Vec<SharedMiddleware> {
    let mut seen = HashSet::with_capacity(global.len() + local.len());
    let mut chain = Vec::with_capacity(global.len() + local.len());

    for mw in global.iter().chain(local) {
        let id = mw.identity();
        if forbidden.contains(&id) || !seen.insert(id) {
            continue;
        }
        chain.push(Arc::clone(mw));
    }
    chain
}

/// Entries of `forbidden` that match no identity in `global` or `local`.
pub(crate) fn unmatched_forbidden<'a>(
    global: &[SharedMiddleware],
    local: &[SharedMiddleware],
    forbidden: &'a [MiddlewareId],
) -> Vec<&'a MiddlewareId> {
    let present: HashSet<MiddlewareId> = global.iter().chain(local).map(|mw| mw.identity()).collect();
    forbidden.iter().filter(|id| !present.contains(*id)).collect()
}

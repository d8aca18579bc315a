//! Boolean combinators over sorted, duplicate-free document lists.
//!
//! Every function allocates a fresh list; inputs are never modified, so the
//! universe passed to [`not`] can be reused across calls.

use crate::index::DocumentList;
use crate::DocId;
use std::cmp::Ordering;

/// Merge intersection.
pub fn and(a: &DocumentList, b: &DocumentList) -> DocumentList {
    let (a, b) = (a.as_slice(), b.as_slice());
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    DocumentList::from_sorted(out)
}

/// Merge union. Ids present in both inputs are emitted once.
pub fn or(a: &DocumentList, b: &DocumentList) -> DocumentList {
    if a.is_empty() {
        return b.clone();
    }
    if b.is_empty() {
        return a.clone();
    }
    let (a, b) = (a.as_slice(), b.as_slice());
    let mut out: Vec<DocId> = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    DocumentList::from_sorted(out)
}

/// Complement of `docs` within `universe`. Ids of `docs` outside the
/// universe are ignored.
pub fn not(docs: &DocumentList, universe: &DocumentList) -> DocumentList {
    let (d, u) = (docs.as_slice(), universe.as_slice());
    let mut out = Vec::with_capacity(u.len().saturating_sub(d.len()));
    let (mut i, mut j) = (0, 0);
    while j < u.len() {
        if i >= d.len() {
            out.extend_from_slice(&u[j..]);
            break;
        }
        match u[j].cmp(&d[i]) {
            Ordering::Less => {
                out.push(u[j]);
                j += 1;
            }
            Ordering::Greater => i += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    DocumentList::from_sorted(out)
}

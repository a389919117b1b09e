//! Transparent chunking of oversized set-membership conditions.
//!
//! A very large `In` list is split into sub-requests so no single request
//! exceeds a practical size; the engine merges the partial results from
//! commutative per-group sufficient statistics, so the merged output is
//! identical to a hypothetical unchunked execution regardless of the order
//! sub-requests complete in.

use crate::model::Predicate;

use super::plan::ExecutionRequest;

/// Default upper bound on a single request's in-list size.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Split the request into sub-requests if its residual predicate carries an
/// AND-reachable `In` condition larger than `chunk_size`.
///
/// Only the first oversized list found is chunked; oversized lists nested
/// under `Or`/`Not` cannot be split without changing meaning and run as-is.
pub fn split(request: &ExecutionRequest, chunk_size: usize) -> Vec<ExecutionRequest> {
    match split_predicate(&request.predicate, chunk_size) {
        None => vec![request.clone()],
        Some(parts) => {
            log::debug!(
                "chunking in-list on root '{}' into {} sub-request(s)",
                request.root,
                parts.len()
            );
            parts
                .into_iter()
                .map(|predicate| {
                    let mut sub = request.clone();
                    sub.predicate = predicate;
                    sub
                })
                .collect()
        }
    }
}

fn split_predicate(predicate: &Predicate, chunk_size: usize) -> Option<Vec<Predicate>> {
    match predicate {
        Predicate::In { expr, values } if values.len() > chunk_size => Some(
            values
                .chunks(chunk_size)
                .map(|chunk| Predicate::is_in(expr.clone(), chunk.to_vec()))
                .collect(),
        ),
        Predicate::And(left, right) => {
            if let Some(parts) = split_predicate(left, chunk_size) {
                return Some(
                    parts
                        .into_iter()
                        .map(|p| p.and((**right).clone()))
                        .collect(),
                );
            }
            split_predicate(right, chunk_size).map(|parts| {
                parts
                    .into_iter()
                    .map(|p| (**left).clone().and(p))
                    .collect()
            })
        }
        _ => None,
    }
}

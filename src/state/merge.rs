//! Reset merge for global checkpoints

use super::types::{GlobalState, ResetScope, StreamState};
use tracing::info;

/// Compute the global checkpoint that results from resetting `scope`.
///
/// Streams in scope lose their state, others keep it. Requested streams the
/// current state does not list yet are appended so the result still
/// enumerates every known stream. The shared cursor is dropped only when
/// every pre-existing stream ends up without state.
pub fn merge_global_reset(current: &GlobalState, scope: &ResetScope) -> GlobalState {
    let mut stream_states: Vec<StreamState> = current
        .stream_states
        .iter()
        .map(|existing| {
            if scope.contains(&existing.descriptor) {
                StreamState::reset(existing.descriptor.clone())
            } else {
                existing.clone()
            }
        })
        .collect();

    // Counted before appending new streams, which are always null
    let nulled = stream_states.iter().filter(|s| s.is_reset()).count();
    let shared_state = if nulled == current.stream_states.len() {
        info!("All the streams of a global state have been reset, the shared state will be erased as well");
        None
    } else {
        info!("This is a partial reset, the shared state will be preserved");
        current.shared_state.clone()
    };

    for descriptor in scope.iter() {
        if current.get_stream(descriptor).is_none() {
            stream_states.push(StreamState::reset(descriptor.clone()));
        }
    }

    GlobalState {
        shared_state,
        stream_states,
    }
}

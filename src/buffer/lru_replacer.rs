use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::FrameId;

#[derive(Debug)]
struct FrameAccess {
    last_access: u64,
    is_evictable: bool,
}

#[derive(Debug, Default)]
struct ReplacerState {
    clock: u64,
    frames: HashMap<FrameId, FrameAccess>,
    num_evictable: usize,
}

/// Least-recently-used replacement over unpinned frames.
///
/// Every access stamps the frame with a logical clock; `evict` picks the
/// evictable frame with the oldest stamp.
pub struct LruReplacer {
    state: Mutex<ReplacerState>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReplacerState::default()),
        }
    }

    /// Records an access to the frame. New frames start out non-evictable.
    pub fn record_access(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        state.clock += 1;
        let now = state.clock;
        state
            .frames
            .entry(frame_id)
            .and_modify(|access| access.last_access = now)
            .or_insert(FrameAccess {
                last_access: now,
                is_evictable: false,
            });
    }

    /// Marks a tracked frame evictable or pinned. Untracked frames are ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut state = self.state.lock();
        let Some(access) = state.frames.get_mut(&frame_id) else {
            return;
        };
        if access.is_evictable == evictable {
            return;
        }
        access.is_evictable = evictable;
        if evictable {
            state.num_evictable += 1;
        } else {
            state.num_evictable -= 1;
        }
    }

    /// Evicts the least recently used evictable frame.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        let victim = state
            .frames
            .iter()
            .filter(|(_, access)| access.is_evictable)
            .min_by_key(|(_, access)| access.last_access)
            .map(|(&frame_id, _)| frame_id)?;

        state.frames.remove(&victim);
        state.num_evictable -= 1;
        Some(victim)
    }

    /// Stops tracking a frame.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if let Some(access) = state.frames.remove(&frame_id) {
            if access.is_evictable {
                state.num_evictable -= 1;
            }
        }
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().num_evictable
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// Artifact ids known to one build session, per group.
///
/// Every parsed or faked project reserves its id here, so allocation of a
/// fresh id for a faked dependency can never collide with an existing one.
/// Lookup and insertion happen under a single lock.
#[derive(Debug, Default)]
pub struct ArtifactIdRegistry {
    allocated: Mutex<HashMap<String, HashSet<String>>>,
}

impl ArtifactIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, group_id: &str, artifact_id: &str) -> bool {
        self.allocated
            .lock()
            .get(group_id)
            .is_some_and(|ids| ids.contains(artifact_id))
    }

    /// Record `artifact_id` as taken. Returns `false` when it already was.
    pub fn reserve(&self, group_id: &str, artifact_id: &str) -> bool {
        self.allocated
            .lock()
            .entry(group_id.to_owned())
            .or_default()
            .insert(artifact_id.to_owned())
    }

    /// Allocate `prefix`, or the first free `prefix-N` (N = 1, 2, ...).
    pub fn allocate(&self, group_id: &str, prefix: &str) -> String {
        let mut allocated = self.allocated.lock();
        let ids = allocated.entry(group_id.to_owned()).or_default();
        if ids.insert(prefix.to_owned()) {
            return prefix.to_owned();
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{prefix}-{n}");
            if ids.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn len(&self, group_id: &str) -> usize {
        self.allocated
            .lock()
            .get(group_id)
            .map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.lock().values().all(HashSet::is_empty)
    }
}

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Exact-match set of URLs already enqueued during this run
///
/// Membership lives only as long as the process. Callers filter each
/// *discovered* link through [`VisitedSet::add`], which checks and inserts in
/// one step so two workers finding the same link cannot both enqueue it.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a URL; returns `true` if it was not already present
    pub fn add(&self, url: &str) -> bool {
        let mut urls = self.lock();
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Removes a URL; returns `true` if it was present
    pub fn remove(&self, url: &str) -> bool {
        self.lock().remove(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

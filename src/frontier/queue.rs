use rand::Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Randomized pending-work queue of URLs
///
/// `get` removes a uniformly random element rather than the oldest or newest
/// one, so consecutive dispatches are spread across domains.
///
/// Every operation takes the lock once and releases it before returning; the
/// lock is never held across a caller's subsequent work.
#[derive(Debug, Default)]
pub struct Frontier {
    urls: Mutex<Vec<String>>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier pre-filled with the given URLs
    pub fn with_urls<I>(urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            urls: Mutex::new(urls.into_iter().collect()),
        }
    }

    /// Appends a URL; never blocks beyond the lock acquisition
    pub fn put(&self, url: impl Into<String>) {
        self.lock().push(url.into());
    }

    /// Removes and returns a uniformly random URL, or `None` when empty
    ///
    /// The chosen slot is filled with the last element (swap-remove), so
    /// removal is O(1) without shifting.
    pub fn get(&self) -> Option<String> {
        let mut urls = self.lock();
        if urls.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..urls.len());
        Some(urls.swap_remove(index))
    }

    /// Returns the number of pending URLs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no URLs are pending
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the Vec half-modified, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    fn counts<I: IntoIterator<Item = String>>(items: I) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for item in items {
            *map.entry(item).or_insert(0) += 1;
        }
        map
    }

    #[test]
    fn test_new_frontier_is_empty() {
        let frontier = Frontier::new();
        assert_eq!(frontier.len(), 0);
        assert!(frontier.is_empty());
        assert_eq!(frontier.get(), None);
    }

    #[test]
    fn test_put_then_get_single() {
        let frontier = Frontier::new();
        frontier.put("https://example.com/");

        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.get(), Some("https://example.com/".to_string()));
        assert_eq!(frontier.get(), None);
    }

    #[test]
    fn test_gets_return_inserted_multiset() {
        let frontier = Frontier::new();
        let inserted: Vec<String> = (0..200)
            .map(|i| format!("https://example.com/{}", i % 50))
            .collect();

        for url in &inserted {
            frontier.put(url.clone());
        }
        assert_eq!(frontier.len(), inserted.len());

        let mut removed = Vec::new();
        for _ in 0..inserted.len() {
            removed.push(frontier.get().unwrap());
        }

        assert!(frontier.is_empty());
        assert_eq!(frontier.get(), None);
        assert_eq!(counts(removed), counts(inserted));
    }

    #[test]
    fn test_removal_order_is_not_fifo() {
        // 1000 elements in exact insertion order would happen with
        // probability 1/1000!
        let frontier = Frontier::with_urls((0..1000).map(|i| i.to_string()));
        let removed: Vec<String> = std::iter::from_fn(|| frontier.get()).collect();
        let in_order: Vec<String> = (0..1000).map(|i| i.to_string()).collect();

        assert_eq!(removed.len(), 1000);
        assert_ne!(removed, in_order);
    }

    #[test]
    fn test_concurrent_put_and_get() {
        let frontier = Arc::new(Frontier::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let frontier = Arc::clone(&frontier);
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    frontier.put(format!("https://t{}.example.com/{}", t, i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(frontier.len(), 2000);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let frontier = Arc::clone(&frontier);
            handles.push(thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(url) = frontier.get() {
                    taken.push(url);
                }
                taken
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        assert_eq!(all.len(), 2000);
        assert_eq!(counts(all.clone()).len(), 2000);
        assert!(frontier.is_empty());
    }
}

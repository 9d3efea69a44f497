use std::collections::HashMap;

/// Identity of a driver-owned view (camera).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ViewId(pub u64);

/// Per-view side table.
///
/// Entries are created on first use and live until [`ViewCache::remove`];
/// eviction is the driver's call.
#[derive(Debug)]
pub struct ViewCache<T> {
    entries: HashMap<ViewId, T>,
}

impl<T> Default for ViewCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ViewCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `view`, creating it only when `wanted` is true.
    ///
    /// `create` is not called when the entry exists or `wanted` is false.
    pub fn get_or_create_if<F>(&mut self, view: ViewId, wanted: bool, create: F) -> Option<&mut T>
    where
        F: FnOnce() -> T,
    {
        if !wanted && !self.entries.contains_key(&view) {
            return None;
        }
        Some(self.entries.entry(view).or_insert_with(create))
    }

    #[inline]
    pub fn get(&self, view: ViewId) -> Option<&T> {
        self.entries.get(&view)
    }

    #[inline]
    pub fn get_mut(&mut self, view: ViewId) -> Option<&mut T> {
        self.entries.get_mut(&view)
    }

    #[inline]
    pub fn contains(&self, view: ViewId) -> bool {
        self.entries.contains_key(&view)
    }

    pub fn remove(&mut self, view: ViewId) -> Option<T> {
        self.entries.remove(&view)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwanted_entry_is_never_created() {
        let mut cache: ViewCache<u32> = ViewCache::new();
        let got = cache.get_or_create_if(ViewId(1), false, || panic!("must not allocate"));
        assert!(got.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn entry_is_created_once() {
        let mut cache = ViewCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_create_if(ViewId(7), true, || {
                calls += 1;
                42
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.get(ViewId(7)), Some(&42));
    }

    #[test]
    fn existing_entry_survives_empty_frames() {
        let mut cache = ViewCache::new();
        cache.get_or_create_if(ViewId(2), true, || 5);
        let got = cache.get_or_create_if(ViewId(2), false, || unreachable!());
        assert_eq!(got.copied(), Some(5));
    }

    #[test]
    fn views_are_independent() {
        let mut cache = ViewCache::new();
        cache.get_or_create_if(ViewId(1), true, || "a");
        cache.get_or_create_if(ViewId(2), true, || "b");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.remove(ViewId(1)), Some("a"));
        assert!(!cache.contains(ViewId(1)));
        assert!(cache.contains(ViewId(2)));
    }
}

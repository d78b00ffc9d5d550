use super::Store;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Bound;

/// Write overlay over a base store.
///
/// Reads fall through to the base; writes and removals stay buffered until
/// [`CacheStore::commit`]. Dropping the cache without committing discards
/// everything, which is how a failed message leaves no state change.
pub struct CacheStore<'a, S: Store + ?Sized> {
    base: &'a mut S,
    /// `None` buffers a removal.
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: Store + ?Sized> CacheStore<'a, S> {
    pub fn new(base: &'a mut S) -> Self {
        Self {
            base,
            overlay: BTreeMap::new(),
        }
    }

    /// Applies every buffered write to the base store.
    pub fn commit(self) {
        for (key, entry) in self.overlay {
            match entry {
                Some(value) => self.base.set(&key, value),
                None => self.base.remove(&key),
            }
        }
    }
}

impl<S: Store + ?Sized> Store for CacheStore<'_, S> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.overlay.get(key) {
            Some(entry) => entry.clone(),
            None => self.base.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.overlay.insert(key.to_vec(), Some(value));
    }

    fn remove(&mut self, key: &[u8]) {
        self.overlay.insert(key.to_vec(), None);
    }

    fn iter_prefix<'b>(
        &'b self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'b> {
        let owned = prefix.to_vec();
        let start = Bound::Included(owned.clone());
        let overlay = self
            .overlay
            .range((start, Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(&owned))
            .map(|(key, entry)| (key.clone(), entry.clone()));
        Box::new(MergeIter {
            base: self.base.iter_prefix(prefix).peekable(),
            overlay: overlay.peekable(),
        })
    }
}

/// Merges the base iterator with the overlay: both ascend by key, the
/// overlay wins on equal keys, tombstones suppress base entries.
struct MergeIter<B, O>
where
    B: Iterator<Item = (Vec<u8>, Vec<u8>)>,
    O: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
{
    base: Peekable<B>,
    overlay: Peekable<O>,
}

impl<B, O> Iterator for MergeIter<B, O>
where
    B: Iterator<Item = (Vec<u8>, Vec<u8>)>,
    O: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
{
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let take_base = match (self.base.peek(), self.overlay.peek()) {
                (None, None) => return None,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some((base_key, _)), Some((overlay_key, _))) => {
                    match base_key.cmp(overlay_key) {
                        Ordering::Less => true,
                        Ordering::Greater => false,
                        Ordering::Equal => {
                            // overlay shadows the base entry
                            self.base.next();
                            false
                        }
                    }
                }
            };
            if take_base {
                return self.base.next();
            }
            if let Some((key, entry)) = self.overlay.next() {
                if let Some(value) = entry {
                    return Some((key, value));
                }
            }
        }
    }
}

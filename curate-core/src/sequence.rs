use std::{collections::HashMap, hash::Hash, mem};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Sequence(u64);

impl Sequence {
    pub fn advance(&mut self) -> u64 {
        let next = self.0.wrapping_add(1);
        mem::replace(&mut self.0, next)
    }
}

/// Numbered requests per key.  Only the latest number issued for a key is
/// accepted back, so an older response can never overwrite a newer intent.
#[derive(Debug)]
pub struct Tickets<K> {
    sequence: Sequence,
    latest: HashMap<K, u64>,
}

impl<K: Eq + Hash> Default for Tickets<K> {
    fn default() -> Self {
        Self {
            sequence: Sequence::default(),
            latest: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> Tickets<K> {
    pub fn issue(&mut self, key: K) -> u64 {
        let number = self.sequence.advance();
        self.latest.insert(key, number);
        number
    }

    pub fn is_latest(&self, key: &K, number: u64) -> bool {
        self.latest.get(key) == Some(&number)
    }

    /// Forget all issued numbers; anything still in flight becomes stale.
    /// The counter keeps running so numbers are never reused.
    pub fn revoke_all(&mut self) {
        self.latest.clear();
    }
}

use std::collections::HashMap;
use std::hash::Hash;

/// Insertion-ordered lookup over a borrowed slice.
///
/// A key seen more than once keeps the position of its first occurrence but
/// resolves to the last item carrying it, so earlier duplicates are shadowed.
pub(crate) struct KeyedIndex<'a, K, V> {
    entries: Vec<(K, &'a V)>,
    positions: HashMap<K, usize>,
}

impl<'a, K, V> KeyedIndex<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn build(items: &'a [V], key_of: impl Fn(&V) -> K) -> Self {
        let mut entries: Vec<(K, &'a V)> = Vec::with_capacity(items.len());
        let mut positions: HashMap<K, usize> = HashMap::with_capacity(items.len());
        for item in items {
            let key = key_of(item);
            match positions.get(&key) {
                Some(&pos) => entries[pos].1 = item,
                None => {
                    positions.insert(key.clone(), entries.len());
                    entries.push((key, item));
                }
            }
        }
        Self { entries, positions }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&'a V> {
        self.positions.get(key).map(|&pos| self.entries[pos].1)
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &'a V)> + '_ {
        self.entries.iter().map(|(key, item)| (key, *item))
    }
}

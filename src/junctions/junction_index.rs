use super::junction_data::{JunctionData, JunctionKey};

/// Junction count above which position lookups use binary search instead of a linear scan
pub const BINARY_SEARCH_THRESHOLD: usize = 20;

/// Position-sorted junction list with a lookup cursor
///
/// The cursor caches the most recent lookup result, which usually matches the next lookup
/// when queries arrive in position order. Results are identical with the cursor disabled.
///
pub struct JunctionIndex {
    junctions: Vec<JunctionData>,
    cursor: usize,
    use_cursor: bool,
}

impl Default for JunctionIndex {
    fn default() -> Self {
        Self {
            junctions: Vec::new(),
            cursor: 0,
            use_cursor: true,
        }
    }
}

impl JunctionIndex {
    pub fn set_cursor_enabled(&mut self, enabled: bool) {
        self.use_cursor = enabled;
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }

    pub fn junctions(&self) -> &[JunctionData] {
        &self.junctions
    }

    pub fn get(&self, index: usize) -> &JunctionData {
        &self.junctions[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut JunctionData {
        &mut self.junctions[index]
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, JunctionData> {
        self.junctions.iter_mut()
    }

    pub fn into_junctions(self) -> Vec<JunctionData> {
        self.junctions
    }

    /// Index of the first junction with position at or after `position`
    pub fn lower_bound(&mut self, position: i64) -> usize {
        let len = self.junctions.len();
        if self.use_cursor {
            let c = self.cursor;
            if c <= len
                && (c == 0 || self.junctions[c - 1].position() < position)
                && (c == len || self.junctions[c].position() >= position)
            {
                return c;
            }
        }

        let index = if len > BINARY_SEARCH_THRESHOLD {
            self.junctions.partition_point(|x| x.position() < position)
        } else {
            self.junctions
                .iter()
                .position(|x| x.position() >= position)
                .unwrap_or(len)
        };
        self.cursor = index;
        index
    }

    /// Find the index of the junction with the given key, or the index where it would be inserted
    pub fn find(&mut self, key: &JunctionKey) -> Result<usize, usize> {
        let mut index = self.lower_bound(key.position);
        while index < self.junctions.len() && self.junctions[index].key <= *key {
            if self.junctions[index].key == *key {
                return Ok(index);
            }
            index += 1;
        }
        Err(index)
    }

    /// Insert a junction at `index`
    ///
    /// Panics if the insertion would break the ascending key order.
    ///
    pub fn insert_at(&mut self, index: usize, junction: JunctionData) {
        if (index > 0 && self.junctions[index - 1].key >= junction.key)
            || (index < self.junctions.len() && self.junctions[index].key <= junction.key)
        {
            panic!(
                "Out of order junction insertion at index {index}: {:?}",
                junction.key
            );
        }
        self.junctions.insert(index, junction);
        self.cursor = index;
    }

    /// Get the index of the junction with the given key, inserting a new junction if needed
    ///
    /// Returns the index and true if the junction was newly created.
    ///
    pub fn get_or_insert(&mut self, key: JunctionKey) -> (usize, bool) {
        match self.find(&key) {
            Ok(index) => (index, false),
            Err(index) => {
                self.insert_at(index, JunctionData::new(key));
                (index, true)
            }
        }
    }

    /// Indices of all junctions with position in the closed range `[start, end]`
    pub fn range_indices(&mut self, start: i64, end: i64) -> std::ops::Range<usize> {
        let first = self.lower_bound(start);
        let last = first
            + self.junctions[first..]
                .iter()
                .take_while(|x| x.position() <= end)
                .count();
        first..last
    }

    /// Keep only junctions for which `f` returns true
    pub fn retain(&mut self, f: impl FnMut(&JunctionData) -> bool) {
        self.junctions.retain(f);
        self.cursor = 0;
    }

    pub fn is_sorted(&self) -> bool {
        self.junctions.windows(2).all(|w| w[0].key < w[1].key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligned_read::Orientation;

    fn key(position: i64, orientation: Orientation) -> JunctionKey {
        JunctionKey::new(position, orientation)
    }

    /// Fill an index with junctions inserted in an arbitrary order
    fn get_test_index(use_cursor: bool, count: i64) -> JunctionIndex {
        let mut index = JunctionIndex::default();
        index.set_cursor_enabled(use_cursor);
        for i in 0..count {
            let position = 1000 + ((i * 37) % count) * 10;
            index.get_or_insert(key(position, Orientation::Negative));
            index.get_or_insert(key(position, Orientation::Positive));
        }
        index
    }

    #[test]
    fn test_get_or_insert_order() {
        for use_cursor in [true, false] {
            for count in [5, 50] {
                let mut index = get_test_index(use_cursor, count);
                assert!(index.is_sorted());
                assert_eq!(index.len(), (count * 2) as usize);

                let (_, is_new) = index.get_or_insert(key(1010, Orientation::Positive));
                assert!(!is_new);
                assert_eq!(index.len(), (count * 2) as usize);
            }
        }
    }

    #[test]
    fn test_cursor_equivalence() {
        let mut with_cursor = get_test_index(true, 50);
        let mut without_cursor = get_test_index(false, 50);
        for position in [995, 1000, 1003, 1250, 1250, 1240, 1490, 1491, 2000, 1000] {
            assert_eq!(
                with_cursor.lower_bound(position),
                without_cursor.lower_bound(position)
            );
            assert_eq!(
                with_cursor.range_indices(position - 20, position + 20),
                without_cursor.range_indices(position - 20, position + 20)
            );
            let k = key(position, Orientation::Positive);
            assert_eq!(with_cursor.find(&k), without_cursor.find(&k));
        }
    }

    #[test]
    fn test_range_indices() {
        let mut index = get_test_index(true, 5);
        // Junction positions are 1000,1010,1020,1030,1040 in both orientations
        assert_eq!(index.range_indices(1005, 1025), 2..6);
        assert_eq!(index.range_indices(2000, 3000), 10..10);
        assert_eq!(index.range_indices(0, 999), 0..0);
    }

    #[test]
    fn test_retain() {
        let mut index = get_test_index(true, 5);
        index.retain(|x| x.orientation() == Orientation::Positive);
        assert_eq!(index.len(), 5);
        assert!(index.is_sorted());
        assert_eq!(index.find(&key(1020, Orientation::Positive)), Ok(2));
    }

    #[test]
    #[should_panic]
    fn test_out_of_order_insert() {
        let mut index = get_test_index(true, 5);
        index.insert_at(0, JunctionData::new(key(2000, Orientation::Positive)));
    }
}

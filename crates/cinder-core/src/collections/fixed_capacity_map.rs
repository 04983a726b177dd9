// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use num_traits::Zero;

const DEFAULT_BUCKET_COUNT: usize = 16;

/// Bucket count is the smallest power of two holding `LOAD_MARGIN` times
/// the number of entries. The deliberately tiny load factor keeps the
/// expected probe length at one.
const LOAD_MARGIN: usize = 100;

/// Read-only open-addressing hash map built once from a final set of
/// `u32` key / value pairs.
///
/// Lookup is `(key >> shift) & mask` followed by a linear probe, with no
/// modulo operation anywhere. Keys are expected to be dense handles
/// (arena indices); `shift` discards low bits that are identical across
/// adjacent keys when the caller's handles carry a stride.
///
/// An absent key yields `V::zero()`, which is the correct coefficient for
/// a variable that does not participate in the expression.
#[derive(Debug, Clone)]
pub struct FixedCapacityMap<V> {
    shift: u32,
    mask: u32,
    keys: Vec<u32>,
    values: Vec<V>,
    occupied: Vec<bool>,
}

impl<V: Copy + Zero> Default for FixedCapacityMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy + Zero> FixedCapacityMap<V> {
    /// An empty map; every lookup yields zero.
    pub fn new() -> Self {
        Self {
            shift: 0,
            mask: (DEFAULT_BUCKET_COUNT - 1) as u32,
            keys: vec![0; DEFAULT_BUCKET_COUNT],
            values: vec![V::zero(); DEFAULT_BUCKET_COUNT],
            occupied: vec![false; DEFAULT_BUCKET_COUNT],
        }
    }

    /// Builds the table from its final contents. `key_stride` is the
    /// distance between adjacent handles; its floor-log2 becomes the
    /// hash shift so that the low bits distinguish neighbors.
    pub fn with_entries(entries: &[(u32, V)], key_stride: u32) -> Self {
        let shift = key_stride.max(1).ilog2();

        let minimum_bucket_count = entries.len().max(1) * LOAD_MARGIN;
        let mut bucket_count = DEFAULT_BUCKET_COUNT;
        while bucket_count < minimum_bucket_count {
            bucket_count <<= 1;
        }

        let mut map = Self {
            shift,
            mask: (bucket_count - 1) as u32,
            keys: vec![0; bucket_count],
            values: vec![V::zero(); bucket_count],
            occupied: vec![false; bucket_count],
        };
        for &(key, value) in entries {
            map.insert(key, value);
        }
        map
    }

    fn insert(&mut self, key: u32, value: V) {
        let mut index = ((key >> self.shift) & self.mask) as usize;
        while self.occupied[index] {
            index = (index + 1) & self.mask as usize;
        }
        self.occupied[index] = true;
        self.keys[index] = key;
        self.values[index] = value;
    }

    /// The value stored for `key`, or zero when absent.
    #[inline]
    pub fn at(&self, key: u32) -> V {
        let mut index = ((key >> self.shift) & self.mask) as usize;
        if !self.occupied[index] {
            return V::zero();
        }
        while self.keys[index] != key {
            if !self.occupied[index] {
                return V::zero();
            }
            index = (index + 1) & self.mask as usize;
        }
        self.values[index]
    }

    #[inline]
    pub fn shift(&self) -> u32 {
        self.shift
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_map_yields_zero() {
        let map: FixedCapacityMap<f64> = FixedCapacityMap::new();
        assert_eq!(map.at(0), 0.0);
        assert_eq!(map.at(42), 0.0);
        assert_eq!(map.bucket_count(), 16);
    }

    #[test]
    fn test_lookup_present_and_absent_keys() {
        let entries = vec![(0u32, 1.5), (3, -2.0), (7, 0.25)];
        let map = FixedCapacityMap::with_entries(&entries, 1);

        assert_eq!(map.at(0), 1.5);
        assert_eq!(map.at(3), -2.0);
        assert_eq!(map.at(7), 0.25);
        assert_eq!(map.at(1), 0.0, "absent key must yield zero");
        assert_eq!(map.at(1000), 0.0, "absent key must yield zero");
    }

    #[test]
    fn test_bucket_count_is_power_of_two_with_load_margin() {
        let entries: Vec<(u32, f64)> = (0..10).map(|i| (i, i as f64)).collect();
        let map = FixedCapacityMap::with_entries(&entries, 1);

        assert!(map.bucket_count().is_power_of_two());
        assert!(
            map.bucket_count() >= 100 * entries.len(),
            "bucket count {} must hold the load margin",
            map.bucket_count()
        );
        for (key, value) in entries {
            assert_eq!(map.at(key), value);
        }
    }

    #[test]
    fn test_colliding_keys_are_resolved_by_linear_probing() {
        // With stride 4 the shift is 2, so keys 0..4 all hash to bucket 0.
        let entries = vec![(0u32, 10.0), (1, 11.0), (2, 12.0), (3, 13.0)];
        let map = FixedCapacityMap::with_entries(&entries, 4);

        assert_eq!(map.shift(), 2);
        for (key, value) in entries {
            assert_eq!(map.at(key), value);
        }
        assert_eq!(map.at(4), 0.0);
    }

    #[test]
    fn test_integer_values() {
        let entries = vec![(5u32, 7i64), (9, -3)];
        let map = FixedCapacityMap::with_entries(&entries, 1);
        assert_eq!(map.at(5), 7);
        assert_eq!(map.at(9), -3);
        assert_eq!(map.at(6), 0);
    }
}

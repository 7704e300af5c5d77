use crate::sync::Mutex;

const GOLDEN_RATIO_32: u32 = 0x61C8_8647;

/// Multiplicative hash of `key` into `bits` bits.
#[inline]
fn hash_32(key: i32, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    ((key as u32).wrapping_mul(GOLDEN_RATIO_32) >> (32 - bits)) as usize
}

/// A fixed-size chained hash table behind one exclusive lock.
///
/// Every operation, including iteration, takes the same lock. It is the plain
/// mutual-exclusion counterpart to [`Library`](crate::Library): simple, but readers
/// and writers all wait on each other.
#[derive(Debug)]
pub struct LockedHashTable {
    bits: u32,
    buckets: Mutex<Vec<Vec<i32>>>,
}

impl LockedHashTable {
    /// A table with `2^bits` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is larger than 31.
    pub fn new(bits: u32) -> Self {
        assert!(bits < 32, "hash table bits must be below 32, got {bits}");
        Self {
            bits,
            buckets: Mutex::new(vec![Vec::new(); 1 << bits]),
        }
    }

    pub fn bucket_count(&self) -> usize {
        1 << self.bits
    }

    /// Insert `key` at the head of its bucket. Duplicates are kept.
    pub fn add_item(&self, key: i32) {
        let bucket = hash_32(key, self.bits);
        self.buckets.lock()[bucket].insert(0, key);
    }

    /// Remove the first occurrence of `key`. Returns whether one was found.
    pub fn del_item(&self, key: i32) -> bool {
        let bucket = hash_32(key, self.bits);
        let mut buckets = self.buckets.lock();
        match buckets[bucket].iter().position(|item| *item == key) {
            Some(index) => {
                buckets[bucket].remove(index);
                true
            }
            None => false,
        }
    }

    /// Log every key in bucket order and return them.
    pub fn print_all_items(&self) -> Vec<i32> {
        let buckets = self.buckets.lock();
        let mut items = Vec::with_capacity(buckets.iter().map(Vec::len).sum());
        for key in buckets.iter().flatten() {
            log::info!("Key: {key}");
            items.push(*key);
        }
        items
    }

    pub fn contains(&self, key: i32) -> bool {
        let bucket = hash_32(key, self.bits);
        self.buckets.lock()[bucket].contains(&key)
    }

    pub fn len(&self) -> usize {
        self.buckets.lock().iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.lock().iter().all(Vec::is_empty)
    }
}

#[cfg(all(test, not(feature = "loom")))]
pub(crate) fn bucket_of(key: i32, bits: u32) -> usize {
    hash_32(key, bits)
}

//! Key hashing and table sizing.
//!
//! Keys hash with CRC-32 (`crc32fast`), whose lookup tables are compile-time
//! constants of that crate.

/// CRC-32 of a key.
#[inline]
pub fn key_hash(key: &[u8]) -> u32 {
    crc32fast::hash(key)
}

/// Smallest bucket count ever used.
pub const MIN_BUCKETS: usize = 2039;

/// Quantizes a requested bucket count.
///
/// Rounds up to the next multiple of 1024, then adds 3 so the count is odd
/// and not a multiple of any small power of two. Repeated shrink/grow
/// cycles around the same size land on the same count.
pub fn quantize(requested: usize) -> usize {
    let size = (requested + 1024) & !1023;
    (size + 3).max(MIN_BUCKETS)
}

/// Next entry capacity after `allocated` is exhausted.
///
/// Doubles while small, then grows linearly to bound over-allocation.
pub fn grow_capacity(allocated: usize) -> usize {
    const DOUBLING_LIMIT: usize = 1024 * (512 - 64);
    const LINEAR_STEP: usize = 65536;
    if allocated == 0 {
        MIN_BUCKETS
    } else if allocated <= DOUBLING_LIMIT {
        allocated * 2
    } else {
        allocated + LINEAR_STEP
    }
}

/// Bucket count after the live count exceeds the current bucket count.
///
/// Depends on both the allocated capacity and the live count rather than a
/// plain doubling, so a table hovering around one size does not oscillate.
pub fn rehash_size(allocated: usize, live: usize) -> usize {
    quantize((2 * allocated + 1).min(3 * live))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_hash_is_standard_crc32() {
        assert_eq!(key_hash(b"123456789"), 0xcbf4_3926);
        assert_eq!(key_hash(b""), 0);
        assert_ne!(key_hash(b"ab"), key_hash(b"ba"));
    }

    #[test]
    fn quantized_sizes_are_stable() {
        assert_eq!(quantize(0), MIN_BUCKETS);
        assert_eq!(quantize(3000), 3075);
        assert_eq!(quantize(3000), quantize(3071));
        assert_eq!(quantize(4099) % 1024, 3);
    }

    #[test]
    fn growth_switches_to_linear() {
        assert_eq!(grow_capacity(2039), 4078);
        let big = 1024 * 500;
        assert_eq!(grow_capacity(big), big + 65536);
    }

    #[test]
    fn rehash_is_bounded_by_live_count() {
        assert_eq!(rehash_size(100_000, 3000), quantize(9000));
        assert_eq!(rehash_size(2039, 3000), quantize(4079));
    }
}

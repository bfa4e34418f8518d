//! 64-bit FNV-1a.

pub(crate) const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash `bytes` starting from `seed` (use [`OFFSET_BASIS`] for a fresh hash).
pub(crate) fn fnv1a64(bytes: &[u8], seed: u64) -> u64 {
    bytes.iter().fold(seed, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Reference vectors from the FNV specification.
    #[rstest]
    #[case(b"", 0xcbf29ce484222325)]
    #[case(b"a", 0xaf63dc4c8601ec8c)]
    #[case(b"foobar", 0x85944171f73967e8)]
    fn test_reference_vectors(#[case] input: &[u8], #[case] expected: u64) {
        assert_eq!(fnv1a64(input, OFFSET_BASIS), expected);
    }

    #[test]
    fn test_seed_chains() {
        let whole = fnv1a64(b"foobar", OFFSET_BASIS);
        let chained = fnv1a64(b"bar", fnv1a64(b"foo", OFFSET_BASIS));
        assert_eq!(whole, chained);
    }
}

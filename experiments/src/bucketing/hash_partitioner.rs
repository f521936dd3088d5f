//! Deterministic traffic partitioning.
//!
//! Every SDK that buckets users for the same account must land each user in the
//! same bucket, so the hash (MurmurHash3 x86_32), its seed and the scaling
//! arithmetic below are a shared contract. Changing any of them reassigns every
//! user of every running experiment.

/// Seed for the user hash. Never change this without a major version bump.
pub const SEED_VALUE: u32 = 1;

/// Size of the 32-bit hash space, `2^32`.
pub const MAX_HASH_VALUE: f64 = 4_294_967_296.0;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// MurmurHash3, x86 32-bit variant. Blocks are read little-endian regardless of
/// the host byte order.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        hash ^= scramble(k);
        hash = hash.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let k = tail
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, byte)| acc | (u32::from(*byte) << (8 * i)));
        hash ^= scramble(k);
    }

    // The reference implementation mixes in the length modulo 2^32.
    hash ^= data.len() as u32;
    fmix32(hash)
}

fn scramble(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

fn fmix32(mut hash: u32) -> u32 {
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2_ae35);
    hash ^= hash >> 16;
    hash
}

/// Hash of a user identifier with the fixed seed.
pub fn hash_value(identifier: &str) -> u32 {
    murmur3_32(identifier.as_bytes(), SEED_VALUE)
}

/// Scales a hash into `[1, max_value]` (times `multiplier`).
///
/// The order of operations is part of the contract: ratio first, then
/// `max_value * ratio + 1`, then the multiplier, then truncation toward zero.
pub fn bucket_value_from_hash(hash: u32, max_value: u32, multiplier: u32) -> u32 {
    let ratio = f64::from(hash) / MAX_HASH_VALUE;
    let multiplied = (f64::from(max_value) * ratio + 1.0) * f64::from(multiplier);
    multiplied as u32
}

/// Returns a bucket in `[1, scale]` for the identifier. `scale` must be positive.
pub fn bucket_for(identifier: &str, scale: u32) -> u32 {
    bucket_for_with_multiplier(identifier, scale, 1)
}

/// Like [`bucket_for`], but stretches the result by `multiplier` so that a
/// low-traffic campaign still spreads its admitted users over the full range.
pub fn bucket_for_with_multiplier(identifier: &str, scale: u32, multiplier: u32) -> u32 {
    bucket_value_from_hash(hash_value(identifier), scale, multiplier)
}

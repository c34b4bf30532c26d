use hmac::{Hmac, Mac};
use sha2::Sha256;

pub use rand::RngCore;

// Uniform draws over an arbitrary byte source.
// Production sessions read from the OS entropy pool; simulations and tests can swap in
// `SeededRng`, an HMAC-SHA256 block chain keyed by a seed, to make a run reproducible.

pub type HmacSha256 = Hmac<Sha256>;

pub use rand::rngs::OsRng as EntropyRng;

/// Number of bytes needed to cover `range` distinct values.
fn bytes_for_range(range: u64) -> usize {
    let mut bytes = 0usize;
    let mut span: u128 = 1;
    while span < range as u128 {
        span <<= 8;
        bytes += 1;
    }
    bytes
}

/// Uniform integer in `[min, max]` (inclusive).
///
/// Draws the minimum number of bytes covering the range and rejects values that would bias
/// the final modulo reduction.
pub fn random_int<R: RngCore + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    let range = (max - min) as u64 + 1;
    let bytes = bytes_for_range(range);
    let space: u64 = 1u64 << (8 * bytes as u32);
    let limit = space - (space % range);
    let mut buf = [0u8; 8];
    loop {
        rng.fill_bytes(&mut buf[..bytes]);
        let value = buf[..bytes]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
        if value < limit {
            return min + (value % range) as u32;
        }
    }
}

/// Uniform index in `[0, len)`.
pub fn random_index<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    random_int(rng, 0, (len - 1) as u32) as usize
}

/// Uniform real in `[0, 1)` built from the top 53 bits of a 64-bit draw.
pub fn random_unit<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    let mut buf = [0u8; 8];
    rng.fill_bytes(&mut buf);
    let bits = u64::from_be_bytes(buf) >> 11;
    bits as f64 / (1u64 << 53) as f64
}

/// Uniform real in `[low, high)`.
pub fn random_range<R: RngCore + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    let value = low + random_unit(rng) * (high - low);
    if value < high {
        value
    } else {
        // rounding can land exactly on `high`; step back one ulp to keep the interval half-open
        f64::from_bits(high.to_bits() - 1)
    }
}

/// Deterministic byte stream: block `n` is `HMAC-SHA256(seed, nonce || n)`.
#[derive(Clone)]
pub struct SeededRng {
    mac: HmacSha256,
    nonce: u64,
    counter: u64,
    block: [u8; 32],
    index: usize,
}

impl SeededRng {
    pub fn new(seed: impl AsRef<[u8]>, nonce: u64) -> Self {
        let mac =
            HmacSha256::new_from_slice(seed.as_ref()).expect("HMAC accepts keys of any length");
        Self {
            mac,
            nonce,
            counter: 0,
            block: [0u8; 32],
            index: 32,
        }
    }

    fn refill(&mut self) {
        let mut mac = self.mac.clone();
        mac.update(&self.nonce.to_be_bytes());
        mac.update(&self.counter.to_be_bytes());
        self.block.copy_from_slice(&mac.finalize().into_bytes());
        self.counter = self.counter.wrapping_add(1);
        self.index = 0;
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_be_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_be_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest.iter_mut() {
            if self.index >= self.block.len() {
                self.refill();
            }
            *byte = self.block[self.index];
            self.index += 1;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = SeededRng::new("server", 1);
        let mut rng2 = SeededRng::new("server", 1);
        let a: Vec<u32> = (0..50).map(|_| rng1.next_u32()).collect();
        let b: Vec<u32> = (0..50).map(|_| rng2.next_u32()).collect();
        assert_eq!(a, b);

        let mut rng3 = SeededRng::new("server", 2);
        let c: Vec<u32> = (0..50).map(|_| rng3.next_u32()).collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_bytes_for_range() {
        assert_eq!(bytes_for_range(1), 0);
        assert_eq!(bytes_for_range(6), 1);
        assert_eq!(bytes_for_range(256), 1);
        assert_eq!(bytes_for_range(257), 2);
    }

    #[test]
    fn test_random_int_bounds() {
        let mut rng = SeededRng::new("bounds", 0);
        for _ in 0..5_000 {
            let v = random_int(&mut rng, 0, 5);
            assert!(v <= 5);
        }
        assert_eq!(random_int(&mut rng, 7, 7), 7);
    }

    #[test]
    fn test_random_int_is_roughly_uniform() {
        let mut rng = SeededRng::new("uniform", 0);
        let mut counts = [0u32; 6];
        let n = 60_000;
        for _ in 0..n {
            counts[random_index(&mut rng, 6)] += 1;
        }
        for count in counts {
            // expected 10_000 per bucket, sigma ~91
            assert!((9_500..=10_500).contains(&count), "bucket count {count}");
        }
    }

    #[test]
    fn test_random_range() {
        let mut rng = SeededRng::new("range", 3);
        for _ in 0..5_000 {
            let v = random_range(&mut rng, 1.1, 2.5);
            assert!((1.1..2.5).contains(&v));
        }
    }
}

use rand::prelude::{Distribution, SliceRandom, SmallRng};
use rand::{Rng, SeedableRng};
use rand_distr::Zipf;

#[allow(dead_code)]
pub const SYMBOL_LIST_LENGTH: usize = 20_000;

/// Lets `RUST_LOG=debug` expose the normalizer's frame choices in tests.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a sequence of `len` symbols sampled from a Zipfian distribution
/// that can output values up to `max_symbol`.
#[allow(dead_code)]
pub fn zipfian_sequence(seed: u64, exponent: f32, max_symbol: u32, len: usize) -> Vec<u32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let distribution = Zipf::new(max_symbol as u64, exponent).unwrap();
    let mut symbols = Vec::with_capacity(len);

    for _ in 0..len {
        // the distribution samples in [1, max_symbol]
        symbols.push(distribution.sample(&mut rng) as u32 - 1);
    }
    symbols
}

/// Creates a sequence of `len` symbols drawn uniformly from
/// `[0, max_symbol]`.
#[allow(dead_code)]
pub fn uniform_sequence(seed: u64, max_symbol: u32, len: usize) -> Vec<u32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..=max_symbol)).collect()
}

/// Repeats each of `symbols` `copies` times and shuffles the result
/// deterministically.
#[allow(dead_code)]
pub fn shuffled_copies(seed: u64, symbols: &[u32], copies: usize) -> Vec<u32> {
    let mut sequence = Vec::with_capacity(symbols.len() * copies);
    for &sym in symbols {
        sequence.extend(std::iter::repeat(sym).take(copies));
    }
    let mut rng = SmallRng::seed_from_u64(seed);
    sequence.shuffle(&mut rng);
    sequence
}

pub mod decoder;
pub mod encoder;

use rand::prelude::{Distribution, SmallRng};
use rand::SeedableRng;
use rand_distr::Zipf;

/// Size of the list of symbols used to bench.
const SYMBOL_LIST_LENGTH: usize = 500_000;

/// Maximum value that the zipfian distribution can output.
const MAXIMUM_SYMBOL: u64 = 1 << 22;

/// Creates a sequence of [`SYMBOL_LIST_LENGTH`] symbols sampled from a
/// Zipfian distribution that can output values up to [`MAXIMUM_SYMBOL`].
pub fn get_symbols() -> Vec<u32> {
    let mut rng = SmallRng::seed_from_u64(0);
    let distribution = Zipf::new(MAXIMUM_SYMBOL, 1.1f32).unwrap();
    let mut symbols = Vec::with_capacity(SYMBOL_LIST_LENGTH);

    for _ in 0..SYMBOL_LIST_LENGTH {
        symbols.push(distribution.sample(&mut rng) as u32 - 1);
    }
    symbols
}

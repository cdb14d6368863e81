//! Entropy statistics shared by the normalizer and the tests.

use std::collections::HashMap;
use std::ops::Neg;

use crate::RawSymbol;

/// Calculates the Shannon entropy (bits per symbol) of the given frequency
/// table. Symbols with frequency zero are skipped.
pub fn entropy(freqs: &[u64], total_freq: f64) -> f64 {
    let mut entropy = 0.0;

    for &freq in freqs {
        if freq == 0 {
            continue;
        }
        let pr = freq as f64 / total_freq;
        entropy += pr * f64::log2(pr);
    }
    entropy.neg()
}

/// Given the frequency tables of the real distribution P and of the
/// approximated distribution Q, calculates the cross entropy as follows:
/// ```text
/// cross-entropy(P‖Q) = - ∑ p(x) * log2(q(x))
/// ```
/// Each table is normalized by its own mass.
pub fn cross_entropy(p_freqs: &[u64], q_freqs: &[u32]) -> f64 {
    let n = p_freqs.iter().sum::<u64>() as f64;
    let m = q_freqs.iter().sum::<u32>() as f64;
    let mut cross_entropy = 0.0;

    for (&p_freq, &q_freq) in p_freqs.iter().zip(q_freqs) {
        if p_freq == 0 || q_freq == 0 {
            continue;
        }
        let p_x = p_freq as f64 / n;
        let q_x = q_freq as f64 / m;
        cross_entropy += p_x * f64::log2(q_x);
    }
    cross_entropy.neg()
}

/// Calculates the empirical entropy of a raw sequence, returning it
/// together with the number of distinct symbols.
pub fn compute_entropy(input: &[RawSymbol]) -> (f64, usize) {
    let mut freqs: HashMap<RawSymbol, u64> = HashMap::new();
    for &num in input {
        *freqs.entry(num).or_insert(0) += 1;
    }

    let n = input.len() as f64;
    let mut h0 = 0.0;
    for &freq in freqs.values() {
        let p = freq as f64 / n;
        h0 += p * f64::log2(p);
    }
    (-h0, freqs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy() {
        let freqs = [3_u64, 3, 4];
        assert_eq!("1.57", format!("{:.2}", entropy(&freqs, 10_f64)));
    }

    #[test]
    fn test_cross_entropy() {
        let p = [3_u64, 3, 4];
        let q = [4_u32, 2, 4];
        assert_eq!("1.62", format!("{:.2}", cross_entropy(&p, &q)));
    }

    #[test]
    fn empirical_entropy_of_uniform_pairs() {
        let input = [7, 9, 7, 9];
        let (h, sigma) = compute_entropy(&input);
        assert_eq!(sigma, 2);
        assert!((h - 1.0).abs() < 1e-9);
    }
}

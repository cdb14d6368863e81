//! Scaling of raw symbol frequencies to a power-of-two frame.
//!
//! The encoder models need every symbol probability expressed as
//! `S[s] / M` with `M` a power of two. Scaling starts from the smallest
//! frame that can hold the alphabet and doubles it until the cross entropy
//! of the scaled table against the raw counts is within the caller's
//! slack, so callers trade table size for coding precision.

use anyhow::{bail, ensure, Result};

use itertools::Itertools;

use log::debug;

use crate::utils::{cross_entropy, entropy};

/// The largest frame size the scaling loop is allowed to reach.
const MAXIMUM_FRAME_SIZE: u64 = 1 << 28;

/// Tries to scale `freqs` to sum up exactly to `frame_size`, assigning in
/// ascending frequency order so low-frequency symbols are floored at one
/// before the bulk of the mass is spent.
///
/// # Returns
/// The scaled frequencies, or an error when the frame mass is not consumed
/// exactly - either too many symbols were floored at one, or the rounding
/// left mass over. The caller retries with a bigger frame.
fn try_scale_freqs(
    freqs: &[u64],
    mapping: &[usize],
    frame_size: u64,
    freq_sum: u64,
) -> Result<Vec<u32>> {
    let sigma = mapping.len();
    let mut scaled = vec![0u32; freqs.len()];
    let mut frame_left = frame_size as i64;
    let mut freq_left = freq_sum;
    let fratio = frame_size as f64 / freq_sum as f64;

    for (index, &sym) in mapping.iter().enumerate() {
        // Two ratios: the fixed one from the loop entry and the adaptive
        // one over the mass still to distribute. The adaptive ratio drives
        // the assignment, which is what makes the last symbol absorb the
        // remaining frame mass exactly.
        let aratio = frame_left as f64 / freq_left as f64;
        let _ratio = (sigma - index) as f64 * fratio / sigma as f64
            + index as f64 * aratio / sigma as f64;

        let approx = (0.5 + aratio * freqs[sym] as f64) as u32;
        scaled[sym] = approx.max(1);

        frame_left -= scaled[sym] as i64;
        freq_left -= freqs[sym];
        if frame_left < 0 {
            break;
        }
    }

    if frame_left != 0 {
        bail!("cannot scale frequencies to a frame of size {}", frame_size);
    }
    Ok(scaled)
}

/// Scales `freqs` (indexed by symbol, zero for absent symbols) to a
/// power-of-two frame.
///
/// The frame starts at the smallest power of two holding the alphabet and
/// doubles until the cross entropy of the scaled table is within
/// `h_approx` permille of the entropy of the raw counts. With
/// `require_u16`, a table whose largest entry no longer fits 16 bits makes
/// the loop fall back to the previously scaled table instead; it is an
/// error if there is none.
pub fn normalize_freqs(freqs: &[u64], require_u16: bool, h_approx: u32) -> Result<Vec<u32>> {
    let freq_sum: u64 = freqs.iter().sum();
    let sigma = freqs.iter().filter(|&&freq| freq != 0).count();
    ensure!(sigma > 0, "cannot normalize an empty frequency table");

    // symbol indexes in ascending frequency order, ties by symbol
    let mapping = freqs
        .iter()
        .enumerate()
        .filter(|(_, &freq)| freq != 0)
        .map(|(sym, &freq)| (freq, sym))
        .sorted_unstable()
        .map(|(_, sym)| sym)
        .collect::<Vec<usize>>();

    let h = entropy(freqs, freq_sum as f64);
    let threshold = h * (1.0 + h_approx as f64 / 1000.0);
    let mut target_frame_size = (sigma as u64).next_power_of_two();
    let mut prev: Option<Vec<u32>> = None;

    loop {
        ensure!(
            target_frame_size <= MAXIMUM_FRAME_SIZE,
            "frame size would exceed 2^28"
        );

        let scaled = match try_scale_freqs(freqs, &mapping, target_frame_size, freq_sum) {
            Ok(scaled) => scaled,
            Err(_) => {
                target_frame_size *= 2;
                continue;
            }
        };

        let max_norm_freq = *scaled.iter().max().unwrap();
        let xh = cross_entropy(freqs, &scaled);

        if require_u16 && max_norm_freq >= u16::MAX as u32 {
            debug!("frame {} overflows 16-bit frequencies, falling back", target_frame_size);
            return match prev {
                Some(prev) => Ok(prev),
                None => bail!("cannot normalize within 16-bit frequencies"),
            };
        }

        if xh <= threshold {
            debug!(
                "sigma={} n={} M={} H={:.4} XH={:.4} max_freq={}",
                sigma, freq_sum, target_frame_size, h, xh, max_norm_freq
            );
            return Ok(scaled);
        }

        target_frame_size *= 2;
        prev = Some(scaled);
    }
}

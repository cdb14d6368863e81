//! Serialization of normalized frequency tables.
//!
//! The table is shipped as `[vbyte max_symbol][u8 log2 M][interpolative
//! words]`, where the interpolative sequence is the gapped prefix sum
//! `inc[0] = S[0]`, `inc[i] = inc[i-1] + S[i] + 1`. The gaps make the
//! sequence strictly increasing even across runs of zero frequencies, so
//! it fits the universe `M + (max_symbol + 1) + 1` exactly.

use anyhow::{ensure, Context, Result};

use crate::vbyte::{vbyte_decode_u32, vbyte_encode_u32};
use crate::interp;

/// The largest loadable frame size, `2^28`, matching the normalizer cap.
const MAX_LOG2_FRAME_SIZE: u8 = 28;

/// Appends the prelude encoding of `nfreqs` (which must sum to
/// `frame_size`, a power of two) to `out` and returns the bytes written.
pub fn serialize_norm_freqs(nfreqs: &[u32], frame_size: u64, out: &mut Vec<u8>) -> usize {
    debug_assert!(frame_size.is_power_of_two());
    debug_assert_eq!(nfreqs.iter().map(|&f| f as u64).sum::<u64>(), frame_size);

    let max_sym = nfreqs.len() - 1;
    let mut bytes = vbyte_encode_u32(out, max_sym as u32);
    out.push(frame_size.ilog2() as u8);
    bytes += 1;

    let mut increasing = Vec::with_capacity(nfreqs.len());
    increasing.push(nfreqs[0]);
    for sym in 1..=max_sym {
        increasing.push(increasing[sym - 1] + nfreqs[sym] + 1);
    }

    bytes + interp::encode(&increasing, frame_size as usize + nfreqs.len() + 1, out)
}

/// Reads a normalized frequency table back from the head of `input`,
/// returning it together with its frame size.
pub fn load_norm_freqs(input: &[u8]) -> Result<(Vec<u32>, u64)> {
    let mut pos = 0;
    let max_sym = vbyte_decode_u32(input, &mut pos).context("malformed prelude header")? as usize;
    ensure!(max_sym < 1 << 30, "prelude claims an absurd alphabet");

    let log2_frame_size = *input.get(pos).context("malformed prelude header")?;
    pos += 1;
    ensure!(
        log2_frame_size <= MAX_LOG2_FRAME_SIZE,
        "prelude frame size 2^{} is out of range",
        log2_frame_size
    );
    let frame_size = 1u64 << log2_frame_size;

    let n = max_sym + 1;
    let increasing = interp::decode(&input[pos..], n, frame_size as usize + n + 1)
        .context("malformed prelude table")?;

    let mut nfreqs = vec![0u32; n];
    nfreqs[0] = increasing[0];
    let mut prev = increasing[0];
    for sym in 1..n {
        let cur = increasing[sym];
        nfreqs[sym] = cur
            .checked_sub(prev + 1)
            .context("prelude table is not a gapped prefix sum")?;
        prev = cur;
    }

    let total = nfreqs.iter().map(|&f| f as u64).sum::<u64>();
    ensure!(
        total == frame_size,
        "prelude table mass {} does not fill the frame of size {}",
        total,
        frame_size
    );
    Ok((nfreqs, frame_size))
}

//! Binary interpolative coding of strictly increasing integer sequences.
//!
//! A sequence `0 <= a_1 < ... < a_n <= U` over a known universe `U` is
//! coded by recursive midpoint splitting: the middle element is written
//! with a centered minimal binary code over the range left open by the
//! bounds, then the two halves are coded with tightened bounds. The
//! centered code assigns the short codewords around the midpoint of the
//! range, which is where the midpoint of a gapped prefix-sum sequence
//! tends to fall.

use anyhow::Result;

use crate::bits::{BitReader, BitWriter};

fn write_center_mid(os: &mut BitWriter, mut val: u64, u: u64) {
    if u == 1 {
        return;
    }
    let b = (u - 1).ilog2() as u64 + 1;
    let d = 2 * u - (1u64 << b);
    val += u - (d >> 1);
    if val > u {
        val -= u;
    }
    let m = (1u64 << b) - u;
    if val <= m {
        os.put_int((val - 1) as u32, (b - 1) as u32);
    } else {
        val += m;
        os.put_int(((val - 1) >> 1) as u32, (b - 1) as u32);
        os.put_int(((val - 1) & 1) as u32, 1);
    }
}

fn read_center_mid(is: &mut BitReader, u: u64) -> Result<u64> {
    let b = match u == 1 {
        true => 0,
        false => (u - 1).ilog2() as u64 + 1,
    };
    let d = 2 * u - (1u64 << b);
    let mut val = 1u64;
    if u != 1 {
        let m = (1u64 << b) - u;
        val = is.get_int((b - 1) as u32)? as u64 + 1;
        if val > m {
            val = (2 * val + is.get_int(1)? as u64) - m - 1;
        }
    }
    val += d >> 1;
    if val > u {
        val -= u;
    }
    Ok(val)
}

fn encode_tree(os: &mut BitWriter, buf: &[u32], low: u64, high: u64) {
    if buf.is_empty() {
        return;
    }
    let n = buf.len() as u64;
    let h = (n + 1) >> 1;
    let n1 = h - 1;
    let n2 = n - h;
    // values are shifted by one so a stored zero stays representable
    let v = buf[n1 as usize] as u64 + 1;

    write_center_mid(os, v - low - n1 + 1, high - n2 - low - n1 + 1);

    encode_tree(os, &buf[..n1 as usize], low, v - 1);
    encode_tree(os, &buf[h as usize..], v + 1, high);
}

fn decode_tree(is: &mut BitReader, out: &mut [u32], low: u64, high: u64) -> Result<()> {
    if out.is_empty() {
        return Ok(());
    }
    let n = out.len() as u64;
    let h = (n + 1) >> 1;
    let n1 = h - 1;
    let n2 = n - h;
    let v = low + n1 - 1 + read_center_mid(is, high - n2 - low - n1 + 1)?;

    out[n1 as usize] = (v - 1) as u32;
    if n1 > 0 {
        decode_tree(is, &mut out[..n1 as usize], low, v - 1)?;
    }
    if n2 > 0 {
        let h = h as usize;
        decode_tree(is, &mut out[h..], v + 1, high)?;
    }
    Ok(())
}

/// Codes `values` (strictly increasing, each at most `universe`) and
/// appends whole little-endian 32-bit words to `out`, returning the number
/// of bytes appended.
///
/// A sequence that is not strictly increasing or exceeds the universe is a
/// programmer error.
pub fn encode(values: &[u32], universe: usize, out: &mut Vec<u8>) -> usize {
    debug_assert!(values.windows(2).all(|w| w[0] < w[1]));
    debug_assert!(values.last().map_or(true, |&last| (last as usize) <= universe));

    let mut os = BitWriter::new();
    encode_tree(&mut os, values, 1, universe as u64 + 1);
    os.write_to(out)
}

/// Decodes `n` values over `universe` from `input`. Truncated input is an
/// error; `input` may extend past the coded words.
pub fn decode(input: &[u8], n: usize, universe: usize) -> Result<Vec<u32>> {
    let mut is = BitReader::new(input);
    let mut out = vec![0u32; n];
    decode_tree(&mut is, &mut out, 1, universe as u64 + 1)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(values: &[u32], universe: usize) {
        let mut buf = Vec::new();
        let bytes = encode(values, universe, &mut buf);
        assert_eq!(bytes, buf.len());
        assert_eq!(bytes % 4, 0);
        assert_eq!(decode(&buf, values.len(), universe).unwrap(), values);
    }

    #[test]
    fn empty_sequence_codes_to_nothing() {
        round_trip(&[], 100);
    }

    #[test]
    fn single_value_at_each_extreme() {
        round_trip(&[1], 1);
        round_trip(&[1], 1000);
        round_trip(&[1000], 1000);
    }

    #[test]
    fn dense_sequence_over_its_own_universe() {
        let values: Vec<u32> = (1..=512).collect();
        round_trip(&values, 512);
    }

    #[test]
    fn sparse_sequence_over_a_large_universe() {
        let values = [3u32, 4, 7, 13, 14, 99, 10_001, 65_000_000];
        round_trip(&values, 1 << 27);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let values: Vec<u32> = (1..=64).map(|v| v * 3).collect();
        let mut buf = Vec::new();
        encode(&values, 512, &mut buf);
        buf.truncate(buf.len() / 2);
        assert!(decode(&buf, values.len(), 512).is_err());
    }
}

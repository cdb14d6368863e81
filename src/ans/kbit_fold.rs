//! The k-bit fold codec: symbols below a fidelity-controlled threshold are
//! coded exactly, larger ones are repeatedly folded by one radix-8 digit.
//!
//! Each fold pushes the low byte into the exception channel and biases the
//! model symbol into the next bucket, so fidelity `f` trades the size of
//! the exactly-coded range `[0, 2^(f+7))` against the model alphabet size
//! `2^(f+9)` at most.

use anyhow::{ensure, Result};

use crate::ans::msb_fold::FoldedDecoderEntry;
use crate::ans::{
    build_encoder_table, build_frame, decode_interleaved, decode_step, encode_interleaved,
    encode_symbol, flush_state, init_states, pack_payload, unmap_with_exceptions, Codec,
    EncoderModelEntry, TailCursor, INTERLEAVING, MAX_RAW_SYMBOL,
};
use crate::normalizer::normalize_freqs;
use crate::prelude::{load_norm_freqs, serialize_norm_freqs};
use crate::{RawSymbol, State, Symbol, K};

/// The folding radix, one byte per fold.
pub(crate) const RADIX: u32 = 8;

/// The threshold below which symbols are coded exactly.
#[inline(always)]
pub(crate) fn folding_threshold(fidelity: u32) -> u32 {
    1 << (fidelity + RADIX - 1)
}

/// The bias added to the model symbol per fold.
#[inline(always)]
pub(crate) fn folding_offset(fidelity: u32) -> u32 {
    (1 << (fidelity - 1)) * ((1 << RADIX) - 1)
}

/// Folds `x` without streaming the cut bytes out, used while counting.
pub(crate) fn fold_mapping(mut x: u32, fidelity: u32) -> Symbol {
    let thres = folding_threshold(fidelity);
    let mut offset = 0;
    while x >= thres {
        x >>= RADIX;
        offset += folding_offset(fidelity);
    }
    x + offset
}

/// Folds `x`, pushing each cut byte into the exception channel.
pub(crate) fn fold_mapping_and_exceptions(mut x: u32, fidelity: u32, out: &mut Vec<u8>) -> Symbol {
    let thres = folding_threshold(fidelity);
    let mut offset = 0;
    while x >= thres {
        out.push(x as u8);
        x >>= RADIX;
        offset += folding_offset(fidelity);
    }
    x + offset
}

/// The value a model symbol unfolds to before its exception bytes are
/// added back: the bucket index turns back into a shift.
pub(crate) fn fold_undo_mapping(sym: Symbol, fidelity: u32) -> RawSymbol {
    let thres = folding_threshold(fidelity);
    if sym < thres {
        return sym;
    }
    let folds = (sym - thres) / folding_offset(fidelity) + 1;
    (sym - folding_offset(fidelity) * folds) << (RADIX * folds)
}

pub(crate) fn fold_exception_bytes(sym: Symbol, fidelity: u32) -> u32 {
    let thres = folding_threshold(fidelity);
    if sym < thres {
        return 0;
    }
    (sym - thres) / folding_offset(fidelity) + 1
}

/// Rejects loaded tables whose slots would unfold outside the
/// representable symbol range; the frame payloads assume this held.
/// `mapping_bias` is what the encoder added to every raw symbol before
/// folding (the relocation bucket, or zero).
pub(crate) fn validate_folded_alphabet(
    nfreqs: &[u32],
    fidelity: u32,
    mapping_bias: u32,
) -> Result<()> {
    let thres = folding_threshold(fidelity);
    let max_model = thres + 3 * folding_offset(fidelity);
    ensure!(
        nfreqs.len() <= max_model as usize,
        "folded alphabet out of range for fidelity {}",
        fidelity
    );
    for (sym, &freq) in nfreqs.iter().enumerate() {
        let sym = sym as Symbol;
        if freq == 0 || sym < thres {
            continue;
        }
        let folds = fold_exception_bytes(sym, fidelity);
        let base = ((sym - folding_offset(fidelity) * folds) as u64) << (RADIX * folds);
        ensure!(
            base <= MAX_RAW_SYMBOL as u64 + mapping_bias as u64,
            "folded slot unfolds out of the symbol range"
        );
    }
    Ok(())
}

/// The encoder-side model.
#[readonly::make]
pub struct FoldEncoderModel<const FIDELITY: u32> {
    nfreqs: Vec<u32>,
    table: Vec<EncoderModelEntry>,
    pub frame_size: u64,
    pub lower_bound: u64,
}

impl<const FIDELITY: u32> FoldEncoderModel<FIDELITY> {
    pub fn new(input: &[RawSymbol]) -> Result<Self> {
        ensure!(!input.is_empty(), "a non-empty sequence must be provided");
        ensure!(
            input.iter().all(|&sym| sym <= MAX_RAW_SYMBOL),
            "raw symbols must be below 2^30"
        );

        let mut max_sym = 0;
        let mut freqs = vec![0u64; 1 << (FIDELITY + RADIX + 1)];
        for &sym in input {
            let mapped = fold_mapping(sym, FIDELITY);
            freqs[mapped as usize] += 1;
            max_sym = max_sym.max(mapped);
        }
        freqs.truncate(max_sym as usize + 1);

        let nfreqs = normalize_freqs(&freqs, true, 1)?;
        let frame_size = nfreqs.iter().map(|&freq| freq as u64).sum::<u64>();

        Ok(Self {
            table: build_encoder_table(&nfreqs),
            nfreqs,
            frame_size,
            lower_bound: K * frame_size,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) -> usize {
        serialize_norm_freqs(&self.nfreqs, self.frame_size, out)
    }

    #[inline(always)]
    pub fn encode_symbol(&self, state: &mut State, sym: RawSymbol, out: &mut Vec<u8>) {
        let mapped = fold_mapping_and_exceptions(sym, FIDELITY, out);
        encode_symbol(&self.table[mapped as usize], self.frame_size, state, out);
    }
}

/// The decoder-side model.
#[readonly::make]
pub struct FoldDecoderModel<const FIDELITY: u32> {
    frame: Vec<FoldedDecoderEntry>,
    pub frame_size: u64,
    frame_mask: u64,
    frame_log2: u32,
    pub lower_bound: u64,
}

impl<const FIDELITY: u32> FoldDecoderModel<FIDELITY> {
    pub fn load(input: &[u8]) -> Result<Self> {
        let (nfreqs, frame_size) = load_norm_freqs(input)?;
        validate_folded_alphabet(&nfreqs, FIDELITY, 0)?;

        let frame = build_frame(&nfreqs, |sym| {
            pack_payload(
                fold_undo_mapping(sym, FIDELITY),
                fold_exception_bytes(sym, FIDELITY),
            )
        });

        Ok(Self {
            frame,
            frame_size,
            frame_mask: frame_size - 1,
            frame_log2: frame_size.ilog2(),
            lower_bound: K * frame_size,
        })
    }

    #[inline(always)]
    pub fn decode_sym(&self, state: &mut State, tail: &mut TailCursor) -> Result<RawSymbol> {
        let payload = decode_step(
            &self.frame,
            self.frame_mask,
            self.frame_log2,
            self.lower_bound,
            state,
            tail,
        )?;
        unmap_with_exceptions(payload, tail)
    }
}

/// Compresses `input`, appending the payload to `output`; returns the
/// bytes written.
pub fn compress<const FIDELITY: u32>(input: &[RawSymbol], output: &mut Vec<u8>) -> Result<usize> {
    let start = output.len();
    let model = FoldEncoderModel::<FIDELITY>::new(input)?;
    model.serialize(output);

    let mut states = [model.lower_bound; INTERLEAVING];
    encode_interleaved(input, &mut states, |state, sym| {
        model.encode_symbol(state, sym, output)
    });

    for &state in &states {
        flush_state(state, model.lower_bound, output);
    }
    Ok(output.len() - start)
}

/// Decompresses exactly `to_decode` symbols out of `input`.
pub fn decompress<const FIDELITY: u32>(input: &[u8], to_decode: usize) -> Result<Vec<RawSymbol>> {
    let model = FoldDecoderModel::<FIDELITY>::load(input)?;
    let mut tail = TailCursor::new(input);
    let mut states = init_states(&mut tail, model.lower_bound)?;

    let mut output = Vec::with_capacity(to_decode);
    decode_interleaved(
        to_decode,
        &mut states,
        |state| model.decode_sym(state, &mut tail),
        &mut output,
    )?;
    Ok(output)
}

/// The k-bit fold codec behind the uniform [`Codec`] interface.
pub struct AnsKbitFold<const FIDELITY: u32>;

impl<const FIDELITY: u32> Codec for AnsKbitFold<FIDELITY> {
    fn name() -> String {
        format!("ans-fold-{}", FIDELITY)
    }

    fn encode(input: &[RawSymbol], output: &mut Vec<u8>) -> Result<usize> {
        compress::<FIDELITY>(input, output)
    }

    fn decode(input: &[u8], to_decode: usize) -> Result<Vec<RawSymbol>> {
        decompress::<FIDELITY>(input, to_decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_unfold(raw: RawSymbol, fidelity: u32) -> (Symbol, usize, RawSymbol) {
        let mut side = Vec::new();
        let model = fold_mapping_and_exceptions(raw, fidelity, &mut side);
        assert_eq!(model, fold_mapping(raw, fidelity));

        let low_bits = side
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &byte)| acc | (byte as u32) << (8 * i));
        let unfolded = fold_undo_mapping(model, fidelity) + low_bits;
        (model, side.len(), unfolded)
    }

    #[test]
    fn exception_counts_track_the_threshold_at_fidelity_1() {
        // threshold 2^8: one fold per byte above it
        for (raw, excepts) in [
            (0, 0),
            (255, 0),
            (256, 1),
            (65535, 1),
            (65536, 2),
            (1 << 24, 3),
        ] {
            let (model, count, unfolded) = fold_unfold(raw, 1);
            assert_eq!(count, excepts, "raw symbol {}", raw);
            assert_eq!(unfolded, raw);
            assert_eq!(fold_exception_bytes(model, 1) as usize, excepts);
        }
    }

    #[test]
    fn exception_counts_track_the_threshold_at_fidelity_2() {
        // threshold 2^9 doubles the exactly-coded range
        for (raw, excepts) in [
            (0, 0),
            (255, 0),
            (511, 0),
            (512, 1),
            (65535, 1),
            (65536, 1),
            (1 << 17, 2),
            (1 << 24, 2),
            (1 << 25, 3),
        ] {
            let (_, count, unfolded) = fold_unfold(raw, 2);
            assert_eq!(count, excepts, "raw symbol {}", raw);
            assert_eq!(unfolded, raw);
        }
    }

    #[test]
    fn every_fidelity_unfolds_exactly() {
        for fidelity in 1..=8u32 {
            for raw in [0, 1, 100, 1000, 65535, 65536, 1 << 20, MAX_RAW_SYMBOL] {
                let (_, _, unfolded) = fold_unfold(raw, fidelity);
                assert_eq!(unfolded, raw);
            }
        }
    }
}

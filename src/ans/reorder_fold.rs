//! The reorder+fold codec: k-bit folding preceded by a frequency-aware
//! renaming of the alphabet.
//!
//! Folding assumes a decreasing frequency distribution, so the
//! `2^(fidelity+7)` most frequent symbols are relocated into the
//! exactly-coded low bucket and every other symbol is shifted up past it.
//! The relocation table ships in the prelude behind a flag word; inputs
//! with fewer distinct symbols than the bucket skip the reordering
//! entirely.

use anyhow::{ensure, Context, Result};

use itertools::Itertools;

use crate::ans::kbit_fold::{
    fold_exception_bytes, fold_mapping, fold_mapping_and_exceptions, fold_undo_mapping,
    folding_threshold, validate_folded_alphabet, RADIX,
};
use crate::ans::msb_fold::FoldedDecoderEntry;
use crate::ans::{
    build_encoder_table, build_frame, decode_interleaved, decode_step, encode_interleaved,
    encode_symbol, flush_state, init_states, pack_payload, unmap_with_exceptions, Codec,
    EncoderModelEntry, TailCursor, INTERLEAVING, MAX_RAW_SYMBOL,
};
use crate::normalizer::normalize_freqs;
use crate::prelude::{load_norm_freqs, serialize_norm_freqs};
use crate::{RawSymbol, State, K};

/// The encoder-side model.
#[readonly::make]
pub struct ReorderFoldEncoderModel<const FIDELITY: u32> {
    nfreqs: Vec<u32>,
    table: Vec<EncoderModelEntry>,

    /// Raw symbol -> renamed symbol, identity when no reordering applies.
    mapping: Vec<RawSymbol>,

    /// The original identities of the relocated symbols, in bucket order.
    /// Empty when no reordering applies.
    most_frequent: Vec<RawSymbol>,

    pub frame_size: u64,
    pub lower_bound: u64,
}

impl<const FIDELITY: u32> ReorderFoldEncoderModel<FIDELITY> {
    pub fn new(input: &[RawSymbol]) -> Result<Self> {
        ensure!(!input.is_empty(), "a non-empty sequence must be provided");
        ensure!(
            input.iter().all(|&sym| sym <= MAX_RAW_SYMBOL),
            "raw symbols must be below 2^30"
        );

        let unmapped_max_sym = *input.iter().max().unwrap();
        let mut unmapped_freqs = vec![0u64; unmapped_max_sym as usize + 1];
        for &sym in input {
            unmapped_freqs[sym as usize] += 1;
        }

        // distinct symbols in decreasing frequency order, ties by symbol
        let by_count = unmapped_freqs
            .iter()
            .enumerate()
            .filter(|(_, &freq)| freq != 0)
            .map(|(sym, &freq)| (std::cmp::Reverse(freq), sym as RawSymbol))
            .sorted_unstable()
            .map(|(_, sym)| sym)
            .collect::<Vec<RawSymbol>>();
        let sigma = by_count.len();

        let bucket = folding_threshold(FIDELITY) as usize;
        let mut mapping = Vec::with_capacity(unmapped_max_sym as usize + 1);
        let mut most_frequent = Vec::new();
        if sigma < bucket {
            mapping.extend(0..=unmapped_max_sym);
        } else {
            mapping.extend((0..=unmapped_max_sym).map(|sym| sym + bucket as RawSymbol));
            for (slot, &sym) in by_count[..bucket].iter().enumerate() {
                mapping[sym as usize] = slot as RawSymbol;
                most_frequent.push(sym);
            }
        }

        let mut max_sym = 0;
        let mut freqs = vec![0u64; 1 << (FIDELITY + RADIX + 1)];
        for &sym in input {
            let mapped = fold_mapping(mapping[sym as usize], FIDELITY);
            freqs[mapped as usize] += 1;
            max_sym = max_sym.max(mapped);
        }
        freqs.truncate(max_sym as usize + 1);

        let nfreqs = normalize_freqs(&freqs, true, 1)?;
        let frame_size = nfreqs.iter().map(|&freq| freq as u64).sum::<u64>();

        Ok(Self {
            table: build_encoder_table(&nfreqs),
            nfreqs,
            mapping,
            most_frequent,
            frame_size,
            lower_bound: K * frame_size,
        })
    }

    /// Writes the reorder flag, the relocation table when there is one,
    /// and the frequency table. Returns the bytes written.
    pub fn serialize(&self, out: &mut Vec<u8>) -> usize {
        let mut bytes = 4;
        match self.most_frequent.is_empty() {
            true => out.extend_from_slice(&0u32.to_le_bytes()),
            false => {
                out.extend_from_slice(&1u32.to_le_bytes());
                for &sym in &self.most_frequent {
                    out.extend_from_slice(&sym.to_le_bytes());
                }
                bytes += 4 * self.most_frequent.len();
            }
        }
        bytes + serialize_norm_freqs(&self.nfreqs, self.frame_size, out)
    }

    #[inline(always)]
    pub fn encode_symbol(&self, state: &mut State, sym: RawSymbol, out: &mut Vec<u8>) {
        let mapped = fold_mapping_and_exceptions(self.mapping[sym as usize], FIDELITY, out);
        encode_symbol(&self.table[mapped as usize], self.frame_size, state, out);
    }
}

/// The decoder-side model. The relocation is baked into the frame
/// payloads, so decoding is the plain unfold plus exception pull.
#[readonly::make]
pub struct ReorderFoldDecoderModel<const FIDELITY: u32> {
    frame: Vec<FoldedDecoderEntry>,
    pub frame_size: u64,
    frame_mask: u64,
    frame_log2: u32,
    pub lower_bound: u64,
}

impl<const FIDELITY: u32> ReorderFoldDecoderModel<FIDELITY> {
    pub fn load(input: &[u8]) -> Result<Self> {
        let bucket = folding_threshold(FIDELITY) as usize;

        let flag_bytes: [u8; 4] = input
            .get(..4)
            .context("reorder prelude is missing its flag")?
            .try_into()
            .unwrap();
        let do_reorder = u32::from_le_bytes(flag_bytes);
        ensure!(do_reorder <= 1, "invalid reorder flag {}", do_reorder);

        let mut pos = 4;
        let mut most_frequent = Vec::with_capacity(bucket);
        if do_reorder == 1 {
            for _ in 0..bucket {
                let bytes: [u8; 4] = input
                    .get(pos..pos + 4)
                    .context("reorder prelude is missing relocation entries")?
                    .try_into()
                    .unwrap();
                let sym = u32::from_le_bytes(bytes);
                ensure!(sym <= MAX_RAW_SYMBOL, "relocated identity out of range");
                most_frequent.push(sym);
                pos += 4;
            }
        }

        let (nfreqs, frame_size) = load_norm_freqs(&input[pos..])?;
        let mapping_bias = match do_reorder == 1 {
            true => bucket as u32,
            false => 0,
        };
        validate_folded_alphabet(&nfreqs, FIDELITY, mapping_bias)?;

        // With reordering, a low-bucket slot holds a relocated identity and
        // a folded one unfolds to `raw + bucket`; without it, slots map
        // straight through.
        let frame = build_frame(&nfreqs, |sym| {
            let base = match (do_reorder == 1, sym < bucket as u32) {
                (true, true) => most_frequent[sym as usize],
                (true, false) => fold_undo_mapping(sym, FIDELITY) - bucket as u32,
                (false, true) => sym,
                (false, false) => fold_undo_mapping(sym, FIDELITY),
            };
            pack_payload(base, fold_exception_bytes(sym, FIDELITY))
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
    let model = ReorderFoldEncoderModel::<FIDELITY>::new(input)?;
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
    let model = ReorderFoldDecoderModel::<FIDELITY>::load(input)?;
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

/// The reorder+fold codec behind the uniform [`Codec`] interface.
pub struct AnsReorderFold<const FIDELITY: u32>;

impl<const FIDELITY: u32> Codec for AnsReorderFold<FIDELITY> {
    fn name() -> String {
        format!("ans-rfold-{}", FIDELITY)
    }

    fn encode(input: &[RawSymbol], output: &mut Vec<u8>) -> Result<usize> {
        compress::<FIDELITY>(input, output)
    }

    fn decode(input: &[u8], to_decode: usize) -> Result<Vec<RawSymbol>> {
        decompress::<FIDELITY>(input, to_decode)
    }
}

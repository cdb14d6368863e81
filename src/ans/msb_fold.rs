//! The MSB-fold codec: large symbols keep only their most significant
//! byte in the model alphabet.
//!
//! Four buckets cover the 32-bit range; a symbol in bucket `k` is coded as
//! its top byte biased by `256 * k`, with its `k` low-order bytes emitted
//! verbatim into the exception channel. The model alphabet never exceeds
//! 1280 symbols regardless of the input range.

use anyhow::{ensure, Result};

use mem_dbg::{MemDbg, MemSize};

use crate::ans::{
    build_encoder_table, build_frame, decode_interleaved, decode_step, encode_interleaved,
    encode_symbol, flush_state, init_states, pack_payload, unmap_with_exceptions, Codec,
    DecoderModelEntry, EncoderModelEntry, TailCursor, INTERLEAVING, MAX_RAW_SYMBOL,
};
use crate::normalizer::normalize_freqs;
use crate::prelude::{load_norm_freqs, serialize_norm_freqs};
use crate::{RawSymbol, State, Symbol, K};

/// The largest model alphabet the four buckets can produce.
pub const MAX_SIGMA: usize = 1280;

/// Maps a symbol to its bucketed model symbol without streaming the
/// exception bytes out, used while counting frequencies.
fn msb_mapping(x: RawSymbol) -> Symbol {
    if x <= 256 {
        return x;
    }
    if x <= 1 << 16 {
        return (x >> 8) + 256;
    }
    if x <= 1 << 24 {
        return (x >> 16) + 512;
    }
    (x >> 24) + 768
}

/// Maps a symbol to its model symbol, pushing its low-order bytes into the
/// exception channel.
fn msb_mapping_and_exceptions(x: RawSymbol, out: &mut Vec<u8>) -> Symbol {
    if x <= 256 {
        return x;
    }
    if x <= 1 << 16 {
        out.push(x as u8);
        return (x >> 8) + 256;
    }
    if x <= 1 << 24 {
        out.push(x as u8);
        out.push((x >> 8) as u8);
        return (x >> 16) + 512;
    }
    out.push(x as u8);
    out.push((x >> 8) as u8);
    out.push((x >> 16) as u8);
    (x >> 24) + 768
}

/// The value a model symbol unfolds to before its exception bytes are
/// added back.
fn msb_undo_mapping(sym: Symbol) -> RawSymbol {
    if sym <= 256 {
        return sym;
    }
    if sym <= 512 {
        return (sym - 256) << 8;
    }
    if sym <= 768 {
        return (sym - 512) << 16;
    }
    (sym - 768) << 24
}

fn msb_exception_bytes(sym: Symbol) -> u32 {
    if sym <= 256 {
        return 0;
    }
    if sym <= 512 {
        return 1;
    }
    if sym <= 768 {
        return 2;
    }
    3
}

/// The encoder-side model.
#[readonly::make]
pub struct MsbEncoderModel {
    nfreqs: Vec<u32>,
    table: Vec<EncoderModelEntry>,
    pub frame_size: u64,
    pub lower_bound: u64,
}

impl MsbEncoderModel {
    pub fn new(input: &[RawSymbol], h_approx: u32) -> Result<Self> {
        ensure!(!input.is_empty(), "a non-empty sequence must be provided");
        ensure!(
            input.iter().all(|&sym| sym <= MAX_RAW_SYMBOL),
            "raw symbols must be below 2^30"
        );

        let mut max_sym = 0;
        let mut freqs = vec![0u64; MAX_SIGMA];
        for &sym in input {
            let mapped = msb_mapping(sym);
            freqs[mapped as usize] += 1;
            max_sym = max_sym.max(mapped);
        }
        freqs.truncate(max_sym as usize + 1);

        let nfreqs = normalize_freqs(&freqs, true, h_approx)?;
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

    /// Exception bytes go out before the renormalization word the symbol
    /// may trigger; the decoder walks the tail in the opposite order.
    #[inline(always)]
    pub fn encode_symbol(&self, state: &mut State, sym: RawSymbol, out: &mut Vec<u8>) {
        let mapped = msb_mapping_and_exceptions(sym, out);
        encode_symbol(&self.table[mapped as usize], self.frame_size, state, out);
    }
}

/// Decoder entry shared by the folding variants: 16-bit frequency and
/// offset (the normalizer keeps them there) plus the annotated base.
#[derive(Clone, Copy, Default, MemDbg, MemSize)]
pub struct FoldedDecoderEntry {
    freq: u16,
    offset: u16,
    mapped_num: u32,
}

impl DecoderModelEntry for FoldedDecoderEntry {
    #[inline(always)]
    fn new(freq: u32, offset: u32, payload: u32) -> Self {
        Self {
            freq: freq as u16,
            offset: offset as u16,
            mapped_num: payload,
        }
    }

    #[inline(always)]
    fn freq(&self) -> u64 {
        self.freq as u64
    }

    #[inline(always)]
    fn offset(&self) -> u64 {
        self.offset as u64
    }

    #[inline(always)]
    fn payload(&self) -> u32 {
        self.mapped_num
    }
}

/// The decoder-side model.
#[readonly::make]
pub struct MsbDecoderModel {
    frame: Vec<FoldedDecoderEntry>,
    pub frame_size: u64,
    frame_mask: u64,
    frame_log2: u32,
    pub lower_bound: u64,
}

impl MsbDecoderModel {
    pub fn load(input: &[u8]) -> Result<Self> {
        let (nfreqs, frame_size) = load_norm_freqs(input)?;
        // the top bucket holds at most the 30-bit symbols the encoder accepts
        ensure!(
            nfreqs.len() <= (MAX_RAW_SYMBOL >> 24) as usize + 769,
            "bucketed alphabet out of range"
        );

        let frame = build_frame(&nfreqs, |sym| {
            pack_payload(msb_undo_mapping(sym), msb_exception_bytes(sym))
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
pub fn compress(input: &[RawSymbol], h_approx: u32, output: &mut Vec<u8>) -> Result<usize> {
    let start = output.len();
    let model = MsbEncoderModel::new(input, h_approx)?;
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
pub fn decompress(input: &[u8], to_decode: usize) -> Result<Vec<RawSymbol>> {
    let model = MsbDecoderModel::load(input)?;
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

/// The MSB-fold codec behind the uniform [`Codec`] interface.
pub struct AnsMsbFold<const H_APPROX: u32>;

impl<const H_APPROX: u32> Codec for AnsMsbFold<H_APPROX> {
    fn name() -> String {
        format!("ans-msb-{}", H_APPROX)
    }

    fn encode(input: &[RawSymbol], output: &mut Vec<u8>) -> Result<usize> {
        compress(input, H_APPROX, output)
    }

    fn decode(input: &[u8], to_decode: usize) -> Result<Vec<RawSymbol>> {
        decompress(input, to_decode)
    }
}

//! The raw-integer codec: 32-bit symbols coded directly, one model entry
//! per value in `[0, max_symbol]`.
//!
//! No mapping, no exception bytes; the only knob is the permille of cross
//! entropy the normalizer may give away before doubling the frame. The
//! decoder picks a packed entry layout when every normalized frequency
//! fits 16 bits, for cache locality; both layouts decode the same streams.

use anyhow::{ensure, Result};

use mem_dbg::{MemDbg, MemSize};

use crate::ans::{
    build_encoder_table, build_frame, decode_interleaved, decode_step, encode_interleaved,
    encode_symbol, flush_state, init_states, Codec, DecoderModelEntry, EncoderModelEntry,
    TailCursor, INTERLEAVING,
};
use crate::normalizer::normalize_freqs;
use crate::prelude::{load_norm_freqs, serialize_norm_freqs};
use crate::{RawSymbol, State, K};

/// The encoder-side model.
#[readonly::make]
pub struct SintEncoderModel {
    nfreqs: Vec<u32>,
    table: Vec<EncoderModelEntry>,
    pub frame_size: u64,
    pub lower_bound: u64,
}

impl SintEncoderModel {
    /// Builds the model for `input` with `h_approx` permille of cross
    /// entropy slack.
    pub fn new(input: &[RawSymbol], h_approx: u32) -> Result<Self> {
        ensure!(!input.is_empty(), "a non-empty sequence must be provided");

        let max_sym = *input.iter().max().unwrap();
        let mut freqs = vec![0u64; max_sym as usize + 1];
        for &sym in input {
            freqs[sym as usize] += 1;
        }

        let nfreqs = normalize_freqs(&freqs, false, h_approx)?;
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
        encode_symbol(&self.table[sym as usize], self.frame_size, state, out);
    }
}

#[derive(Clone, Copy, Default, MemDbg, MemSize)]
pub struct SintSmallEntry {
    freq: u16,
    offset: u16,
    sym: u32,
}

impl DecoderModelEntry for SintSmallEntry {
    #[inline(always)]
    fn new(freq: u32, offset: u32, payload: u32) -> Self {
        Self {
            freq: freq as u16,
            offset: offset as u16,
            sym: payload,
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
        self.sym
    }
}

#[derive(Clone, Copy, Default, MemDbg, MemSize)]
pub struct SintLargeEntry {
    freq: u32,
    offset: u32,
    sym: u32,
}

impl DecoderModelEntry for SintLargeEntry {
    #[inline(always)]
    fn new(freq: u32, offset: u32, payload: u32) -> Self {
        Self {
            freq,
            offset,
            sym: payload,
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
        self.sym
    }
}

/// The decoder frame in whichever entry layout the frequencies allow.
pub enum SintFrame {
    Small(Vec<SintSmallEntry>),
    Large(Vec<SintLargeEntry>),
}

/// The decoder-side model.
#[readonly::make]
pub struct SintDecoderModel {
    frame: SintFrame,
    pub frame_size: u64,
    frame_mask: u64,
    frame_log2: u32,
    pub lower_bound: u64,
}

impl SintDecoderModel {
    pub fn load(input: &[u8]) -> Result<Self> {
        let (nfreqs, frame_size) = load_norm_freqs(input)?;
        let max_norm_freq = *nfreqs.iter().max().unwrap();

        let frame = match max_norm_freq <= u16::MAX as u32 {
            true => SintFrame::Small(build_frame(&nfreqs, |sym| sym)),
            false => SintFrame::Large(build_frame(&nfreqs, |sym| sym)),
        };

        Ok(Self {
            frame,
            frame_size,
            frame_mask: frame_size - 1,
            frame_log2: frame_size.ilog2(),
            lower_bound: K * frame_size,
        })
    }
}

fn decode_with_frame<E: DecoderModelEntry>(
    frame: &[E],
    model: &SintDecoderModel,
    to_decode: usize,
    states: &mut [State; INTERLEAVING],
    tail: &mut TailCursor,
    output: &mut Vec<RawSymbol>,
) -> Result<()> {
    decode_interleaved(
        to_decode,
        states,
        |state| {
            decode_step(
                frame,
                model.frame_mask,
                model.frame_log2,
                model.lower_bound,
                state,
                tail,
            )
        },
        output,
    )
}

/// Compresses `input`, appending the payload to `output`; returns the
/// bytes written.
pub fn compress(input: &[RawSymbol], h_approx: u32, output: &mut Vec<u8>) -> Result<usize> {
    let start = output.len();
    let model = SintEncoderModel::new(input, h_approx)?;
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
    let model = SintDecoderModel::load(input)?;
    let mut tail = TailCursor::new(input);
    let mut states = init_states(&mut tail, model.lower_bound)?;

    let mut output = Vec::with_capacity(to_decode);
    match &model.frame {
        SintFrame::Small(frame) => {
            decode_with_frame(frame, &model, to_decode, &mut states, &mut tail, &mut output)?
        }
        SintFrame::Large(frame) => {
            decode_with_frame(frame, &model, to_decode, &mut states, &mut tail, &mut output)?
        }
    }
    Ok(output)
}

/// The raw-integer codec behind the uniform [`Codec`] interface, with the
/// cross-entropy slack as a compile-time shape.
pub struct AnsSint<const H_APPROX: u32>;

impl<const H_APPROX: u32> Codec for AnsSint<H_APPROX> {
    fn name() -> String {
        format!("ans-sint-{}", H_APPROX)
    }

    fn encode(input: &[RawSymbol], output: &mut Vec<u8>) -> Result<usize> {
        compress(input, H_APPROX, output)
    }

    fn decode(input: &[u8], to_decode: usize) -> Result<Vec<RawSymbol>> {
        decompress(input, to_decode)
    }
}

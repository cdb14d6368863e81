//! The byte codec: a fixed 256-symbol alphabet coded with no mapping and
//! no exception bytes.
//!
//! The model is small enough that the prelude carries no header: a fixed
//! 256-entry interpolative sequence over a fixed universe, from which the
//! decoder recomputes the frame size.

use anyhow::{ensure, Context, Result};

use mem_dbg::{MemDbg, MemSize};

use crate::ans::{
    build_encoder_table, build_frame, decode_interleaved, decode_step, encode_interleaved,
    encode_symbol, flush_state, init_states, Codec, DecoderModelEntry, EncoderModelEntry,
    TailCursor, INTERLEAVING,
};
use crate::{interp, RawSymbol, State, K};

/// The size of the byte alphabet.
pub const MAX_SIGMA: usize = 256;

/// The largest frame the byte normalizer will produce.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Target frame slots per occurring symbol before the cap kicks in.
const FRAME_FACTOR: usize = 64;

/// Scales raw byte counts to a power-of-two frame of at most
/// [`MAX_FRAME_SIZE`] slots.
///
/// A multiplicative pass with a descending fudge factor shrinks the counts
/// until they fit under the target (occurring symbols floored at one), the
/// surplus is then paid back proportionally starting from the highest
/// symbol, and whatever remains goes to the most frequent symbol. The
/// result always sums to the target exactly, so an all-zero input
/// degenerates to a one-slot frame owned by symbol zero.
fn normalize_byte_freqs(freqs: &[u64; MAX_SIGMA]) -> [u16; MAX_SIGMA] {
    let mut adj_freqs = [0u16; MAX_SIGMA];
    let mut uniq_syms = 0usize;
    let mut initial_sum = 0u64;
    for &freq in freqs {
        initial_sum += freq;
        uniq_syms += (freq != 0) as usize;
    }

    let target_frame_size = (uniq_syms * FRAME_FACTOR)
        .min(MAX_FRAME_SIZE)
        .next_power_of_two() as u64;

    let c = target_frame_size as f64 / initial_sum as f64;
    let mut cur_frame_size = u64::MAX;
    let mut fudge = 1.0f64;
    while cur_frame_size > target_frame_size {
        fudge -= 0.01;
        cur_frame_size = 0;
        for (adj, &freq) in adj_freqs.iter_mut().zip(freqs) {
            *adj = (fudge * freq as f64 * c) as u16;
            if *adj == 0 && freq != 0 {
                *adj = 1;
            }
            cur_frame_size += *adj as u64;
        }
    }

    let mut excess = target_frame_size - cur_frame_size;
    for sym in (0..MAX_SIGMA).rev() {
        let ncnt = adj_freqs[sym] as u64;
        if ncnt == 0 {
            continue;
        }
        let ratio = excess as f64 / cur_frame_size as f64;
        let adder = ((ratio * ncnt as f64) as u64).min(excess);
        excess -= adder;
        cur_frame_size -= ncnt;
        adj_freqs[sym] += adder as u16;
    }

    if excess != 0 {
        let max_sym = (0..MAX_SIGMA).max_by_key(|&sym| (adj_freqs[sym], usize::MAX - sym));
        adj_freqs[max_sym.unwrap()] += excess as u16;
    }
    adj_freqs
}

/// The encoder-side model of the byte codec.
#[readonly::make]
pub struct ByteEncoderModel {
    nfreqs: [u16; MAX_SIGMA],
    table: Vec<EncoderModelEntry>,
    pub frame_size: u64,
    pub lower_bound: u64,
}

impl ByteEncoderModel {
    pub fn new(input: &[u8]) -> Self {
        let mut freqs = [0u64; MAX_SIGMA];
        for &byte in input {
            freqs[byte as usize] += 1;
        }
        let nfreqs = normalize_byte_freqs(&freqs);
        let widened = nfreqs.map(|freq| freq as u32);
        let frame_size = widened.iter().map(|&freq| freq as u64).sum::<u64>();

        Self {
            nfreqs,
            table: build_encoder_table(&widened),
            frame_size,
            lower_bound: K * frame_size,
        }
    }

    /// Writes the prelude: the 256-entry gapped prefix-sum sequence,
    /// interpolative-coded over a fixed universe. Returns the bytes
    /// written.
    pub fn serialize(&self, out: &mut Vec<u8>) -> usize {
        let mut increasing = [0u32; MAX_SIGMA];
        increasing[0] = self.nfreqs[0] as u32;
        for sym in 1..MAX_SIGMA {
            increasing[sym] = increasing[sym - 1] + self.nfreqs[sym] as u32 + 1;
        }
        interp::encode(&increasing, MAX_FRAME_SIZE + MAX_SIGMA, out)
    }

    #[inline(always)]
    pub fn encode_symbol(&self, state: &mut State, sym: u8, out: &mut Vec<u8>) {
        encode_symbol(&self.table[sym as usize], self.frame_size, state, out);
    }
}

#[derive(Clone, Copy, Default, MemDbg, MemSize)]
pub struct ByteDecoderEntry {
    freq: u16,
    offset: u16,
    sym: u8,
}

impl DecoderModelEntry for ByteDecoderEntry {
    #[inline(always)]
    fn new(freq: u32, offset: u32, payload: u32) -> Self {
        Self {
            freq: freq as u16,
            offset: offset as u16,
            sym: payload as u8,
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
        self.sym as u32
    }
}

/// The decoder-side model: the flat frame rebuilt from the prelude.
#[readonly::make]
pub struct ByteDecoderModel {
    frame: Vec<ByteDecoderEntry>,
    pub frame_size: u64,
    frame_mask: u64,
    frame_log2: u32,
    pub lower_bound: u64,
}

impl ByteDecoderModel {
    pub fn load(input: &[u8]) -> Result<Self> {
        let increasing = interp::decode(input, MAX_SIGMA, MAX_FRAME_SIZE + MAX_SIGMA)
            .context("malformed byte-codec prelude")?;

        let mut nfreqs = [0u32; MAX_SIGMA];
        nfreqs[0] = increasing[0];
        let mut prev = increasing[0];
        for sym in 1..MAX_SIGMA {
            let cur = increasing[sym];
            nfreqs[sym] = cur
                .checked_sub(prev + 1)
                .context("byte-codec prelude is not a gapped prefix sum")?;
            prev = cur;
        }

        let frame_size = nfreqs.iter().map(|&freq| freq as u64).sum::<u64>();
        ensure!(
            frame_size.is_power_of_two() && frame_size <= MAX_FRAME_SIZE as u64,
            "byte-codec prelude describes an invalid frame of size {}",
            frame_size
        );

        Ok(Self {
            frame: build_frame(&nfreqs, |sym| sym),
            frame_size,
            frame_mask: frame_size - 1,
            frame_log2: frame_size.ilog2(),
            lower_bound: K * frame_size,
        })
    }

    #[inline(always)]
    pub fn decode_sym(&self, state: &mut State, tail: &mut TailCursor) -> Result<u8> {
        let payload = decode_step(
            &self.frame,
            self.frame_mask,
            self.frame_log2,
            self.lower_bound,
            state,
            tail,
        )?;
        Ok(payload as u8)
    }
}

/// Compresses `input`, appending the payload to `output`; returns the
/// bytes written. The empty input is legal and encodes to a prelude plus
/// four zero states.
pub fn compress(input: &[u8], output: &mut Vec<u8>) -> usize {
    let start = output.len();
    let model = ByteEncoderModel::new(input);
    model.serialize(output);

    let mut states = [model.lower_bound; INTERLEAVING];
    encode_interleaved(input, &mut states, |state, sym| {
        model.encode_symbol(state, sym, output)
    });

    for &state in &states {
        flush_state(state, model.lower_bound, output);
    }
    output.len() - start
}

/// Decompresses exactly `to_decode` bytes out of `input`.
pub fn decompress(input: &[u8], to_decode: usize) -> Result<Vec<u8>> {
    let model = ByteDecoderModel::load(input)?;
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

/// The byte codec behind the uniform [`Codec`] interface; the integer
/// input is viewed as `4 * len` little-endian bytes.
pub struct AnsByte;

impl Codec for AnsByte {
    fn name() -> String {
        "ans-byte".to_string()
    }

    fn encode(input: &[RawSymbol], output: &mut Vec<u8>) -> Result<usize> {
        let bytes = input
            .iter()
            .flat_map(|num| num.to_le_bytes())
            .collect::<Vec<u8>>();
        Ok(compress(&bytes, output))
    }

    fn decode(input: &[u8], to_decode: usize) -> Result<Vec<RawSymbol>> {
        let bytes = decompress(input, to_decode * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
            .collect())
    }
}

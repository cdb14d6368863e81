mod common;

use ans_large_alphabet::ans::sint::{compress, decompress};
use ans_large_alphabet::normalizer::normalize_freqs;
use ans_large_alphabet::utils::{cross_entropy, entropy};

use rstest::rstest;

use crate::common::*;

#[test]
fn a_tight_slack_keeps_the_table_within_a_permille_of_the_entropy() {
    let input = shuffled_copies(0xC0FFEE, &[0, 1, 2, 3], 1000);

    let mut freqs = vec![0u64; 4];
    for &sym in &input {
        freqs[sym as usize] += 1;
    }
    let nfreqs = normalize_freqs(&freqs, false, 1).unwrap();

    let h = entropy(&freqs, input.len() as f64);
    let xh = cross_entropy(&freqs, &nfreqs);
    assert!(xh <= h * 1.001);

    let mut payload = Vec::new();
    compress(&input, 1, &mut payload).unwrap();
    assert_eq!(decompress(&payload, input.len()).unwrap(), input);
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(10)]
#[case(20)]
#[case(40)]
#[case(80)]
#[case(160)]
#[case(320)]
fn every_slack_setting_round_trips(#[case] h_approx: u32) {
    let input = zipfian_sequence(h_approx as u64, 1.1, 1 << 16, SYMBOL_LIST_LENGTH);

    let mut payload = Vec::new();
    let written = compress(&input, h_approx, &mut payload).unwrap();
    assert_eq!(written, payload.len());
    assert_eq!(decompress(&payload, input.len()).unwrap(), input);
}

#[test]
fn the_empty_input_is_an_encode_error() {
    let mut payload = Vec::new();
    assert!(compress(&[], 1, &mut payload).is_err());
}

#[test]
fn truncated_payloads_are_rejected() {
    let input = uniform_sequence(7, 100, 2000);
    let mut payload = Vec::new();
    compress(&input, 1, &mut payload).unwrap();

    assert!(decompress(&payload[..31], input.len()).is_err());
}

#[test]
fn decoding_past_the_stream_underflows_cleanly() {
    let input = uniform_sequence(8, 100, 2000);
    let mut payload = Vec::new();
    compress(&input, 1, &mut payload).unwrap();

    assert!(decompress(&payload, input.len() + 5000).is_err());
}

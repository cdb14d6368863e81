mod common;

use ans_large_alphabet::ans::byte::AnsByte;
use ans_large_alphabet::ans::kbit_fold::AnsKbitFold;
use ans_large_alphabet::ans::msb_fold::AnsMsbFold;
use ans_large_alphabet::ans::reorder_fold::AnsReorderFold;
use ans_large_alphabet::ans::sint::AnsSint;
use ans_large_alphabet::ans::Codec;

use crate::common::*;

/// Compresses twice and decompresses once: the payload must be
/// deterministic and the round trip exact.
fn assert_round_trip<C: Codec>(input: &[u32]) {
    let mut payload = Vec::new();
    let written = C::encode(input, &mut payload).unwrap();
    assert_eq!(written, payload.len(), "{}", C::name());

    let mut second = Vec::new();
    C::encode(input, &mut second).unwrap();
    assert_eq!(payload, second, "{} is not deterministic", C::name());

    let decoded = C::decode(&payload, input.len()).unwrap();
    assert_eq!(decoded, input, "{} does not round-trip", C::name());
}

fn assert_round_trips_all_residues<C: Codec>(input: &[u32]) {
    // every input length modulo the four-register interleaving
    for drop in 0..4 {
        assert_round_trip::<C>(&input[..input.len() - drop]);
    }
}

macro_rules! codec_round_trip_tests {
    ($($name:ident: $codec:ty,)*) => {
        $(
            #[test]
            fn $name() {
                init_logger();

                let zipfian = zipfian_sequence(0, 1.2, 1 << 20, SYMBOL_LIST_LENGTH);
                assert_round_trips_all_residues::<$codec>(&zipfian);

                let uniform = uniform_sequence(1, 1 << 14, SYMBOL_LIST_LENGTH);
                assert_round_trips_all_residues::<$codec>(&uniform);

                let skewed = shuffled_copies(2, &[0, 1, 2, 3, 500_000], 500);
                assert_round_trips_all_residues::<$codec>(&skewed);
            }
        )*
    };
}

codec_round_trip_tests! {
    byte_codec_round_trips: AnsByte,
    sint_codec_round_trips_tight: AnsSint<1>,
    sint_codec_round_trips_loose: AnsSint<320>,
    msb_fold_round_trips_tight: AnsMsbFold<1>,
    msb_fold_round_trips_loose: AnsMsbFold<160>,
    kbit_fold_round_trips_fidelity_1: AnsKbitFold<1>,
    kbit_fold_round_trips_fidelity_2: AnsKbitFold<2>,
    kbit_fold_round_trips_fidelity_4: AnsKbitFold<4>,
    kbit_fold_round_trips_fidelity_8: AnsKbitFold<8>,
    reorder_fold_round_trips_fidelity_1: AnsReorderFold<1>,
    reorder_fold_round_trips_fidelity_2: AnsReorderFold<2>,
    reorder_fold_round_trips_fidelity_3: AnsReorderFold<3>,
}

#[test]
fn short_sequences_round_trip_on_every_codec() {
    let input = [7u32, 7, 7, 9, 1000, 7];
    for len in 1..=input.len() {
        assert_round_trip::<AnsByte>(&input[..len]);
        assert_round_trip::<AnsSint<1>>(&input[..len]);
        assert_round_trip::<AnsMsbFold<1>>(&input[..len]);
        assert_round_trip::<AnsKbitFold<2>>(&input[..len]);
        assert_round_trip::<AnsReorderFold<2>>(&input[..len]);
    }
}

#[test]
fn a_constant_sequence_round_trips_on_every_codec() {
    let input = vec![42u32; 1001];
    assert_round_trip::<AnsByte>(&input);
    assert_round_trip::<AnsSint<1>>(&input);
    assert_round_trip::<AnsMsbFold<1>>(&input);
    assert_round_trip::<AnsKbitFold<1>>(&input);
    assert_round_trip::<AnsReorderFold<1>>(&input);
}

use criterion::{criterion_group, Criterion};

use ans_large_alphabet::ans::byte::AnsByte;
use ans_large_alphabet::ans::kbit_fold::AnsKbitFold;
use ans_large_alphabet::ans::msb_fold::AnsMsbFold;
use ans_large_alphabet::ans::reorder_fold::AnsReorderFold;
use ans_large_alphabet::ans::sint::AnsSint;
use ans_large_alphabet::ans::Codec;

use crate::benchmarks::get_symbols;

fn decoding_bench<C: Codec>(c: &mut Criterion, symbols: &[u32]) {
    let mut payload = Vec::new();
    C::encode(symbols, &mut payload).unwrap();

    let mut group = c.benchmark_group("decoder");
    group.throughput(criterion::Throughput::Elements(symbols.len() as u64));
    group.sample_size(20);

    group.bench_function(C::name(), |b| {
        b.iter(|| C::decode(&payload, symbols.len()).unwrap())
    });
    group.finish()
}

fn decoding_benches(c: &mut Criterion) {
    let symbols = get_symbols();
    decoding_bench::<AnsByte>(c, &symbols);
    decoding_bench::<AnsSint<40>>(c, &symbols);
    decoding_bench::<AnsMsbFold<40>>(c, &symbols);
    decoding_bench::<AnsKbitFold<3>>(c, &symbols);
    decoding_bench::<AnsReorderFold<3>>(c, &symbols);
}

criterion_group! {
    name = decoder_benches;
    config = Criterion::default();
    targets = decoding_benches
}

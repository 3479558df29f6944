use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fhe_math::zq::{ntt::NttOperator, Modulus};
use rand::thread_rng;

pub fn ntt_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("ntt");
	group.sample_size(50);

	let p = 4611686018326724609;
	let q = Modulus::new(p).unwrap();
	let mut rng = thread_rng();

	for degree in [1024usize, 4096, 8192].iter() {
		let ntt = NttOperator::new(&q, *degree).unwrap();
		let mut a = q.random_vec(*degree, &mut rng);

		group.bench_function(BenchmarkId::new("forward", degree), |bh| {
			bh.iter(|| ntt.forward(&mut a));
		});
		group.bench_function(BenchmarkId::new("backward", degree), |bh| {
			bh.iter(|| ntt.backward(&mut a));
		});
	}

	group.finish();
}

criterion_group!(ntt, ntt_benchmark);
criterion_main!(ntt);

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fhe_math::rq::{Context, Representation};
use rand::thread_rng;
use std::rc::Rc;

pub fn rq_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("rq");
	group.sample_size(50);

	let moduli = [4611686018326724609u64, 4611686018309947393];
	let mut rng = thread_rng();

	for degree in [1024usize, 4096].iter() {
		let ctx = Rc::new(Context::new(&moduli, *degree).unwrap());
		let a = fhe_math::rq::Poly::random(&ctx, Representation::PowerBasis, &mut rng);
		let b = fhe_math::rq::Poly::random(&ctx, Representation::PowerBasis, &mut rng);

		group.bench_function(BenchmarkId::new("add", degree), |bh| {
			bh.iter(|| &a + &b);
		});

		let mut a_ntt = a.clone();
		let mut b_ntt = b.clone();
		a_ntt.change_representation(Representation::Ntt);
		b_ntt.change_representation(Representation::Ntt);
		group.bench_function(BenchmarkId::new("mul_ntt", degree), |bh| {
			bh.iter(|| &a_ntt * &b_ntt);
		});

		group.bench_function(BenchmarkId::new("change_representation", degree), |bh| {
			bh.iter(|| {
				let mut c = a.clone();
				c.change_representation(Representation::Ntt);
			});
		});
	}

	group.finish();
}

criterion_group!(rq, rq_benchmark);
criterion_main!(rq);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array2, ArrayD, IxDyn};

use unary_arith::*;

// One simulated cycle of the bit-serial layer, for a few layer sizes

const SIZES: [(usize, usize); 3] = [(16, 16), (64, 32), (256, 64)];

fn input_bits(batch: usize, in_features: usize) -> ArrayD<u8> {
  ArrayD::from_shape_fn(IxDyn(&[batch, in_features]), |i| ((i[0] * 7 + i[1] * 3) % 5 < 3) as u8)
}

fn input_real(batch: usize, in_features: usize) -> Array2<f64> {
  Array2::from_shape_fn((batch, in_features), |(b, i)| ((b * 13 + i * 7) % 17) as f64 / 8. - 1.)
}

fn linear_cycle(c: &mut Criterion) {
  let mut g = c.benchmark_group("linear_cycle");
  for (in_features, out_features) in SIZES {
    for coding in [Coding::Rate, Coding::Temporal] {
      let mut config = LinearConfig::new(in_features, out_features);
      config.weight_coding = coding;
      let mut layer = Linear::new(config, None, None).unwrap();
      let input = input_bits(8, in_features);
      g.throughput(Throughput::Elements((8 * in_features * out_features) as u64));
      g.bench_with_input(
        BenchmarkId::new(coding.to_string(), format_args!("{in_features}x{out_features}")),
        &input,
        |b, input| b.iter(|| layer.step(black_box(input)).unwrap()),
      );
    }
  }
  g.finish();
}

fn gaines_cycle(c: &mut Criterion) {
  let mut g = c.benchmark_group("gaines_cycle");
  for (in_features, out_features) in SIZES {
    for adder in [LinearAdder::Gaines, LinearAdder::Unary] {
      let mut config = GainesLinearConfig::new(in_features, out_features);
      config.rng = SequenceKind::Lfsr;
      config.adder = adder;
      let mut layer = GainesLinear::new(config, None, None).unwrap();
      let input = input_bits(8, in_features);
      g.throughput(Throughput::Elements((8 * in_features * out_features) as u64));
      g.bench_with_input(
        BenchmarkId::new(adder.to_string(), format_args!("{in_features}x{out_features}")),
        &input,
        |b, input| b.iter(|| layer.step(black_box(input)).unwrap()),
      );
    }
  }
  g.finish();
}

// One-shot forward passes of the fast paths

fn hub_forward(c: &mut Criterion) {
  let mut g = c.benchmark_group("hub_forward");
  for (in_features, out_features) in SIZES {
    let mut layer = HubLinear::new(HubConfig::new(in_features, out_features), None, None).unwrap();
    let input = input_real(8, in_features);
    g.throughput(Throughput::Elements((8 * in_features * out_features) as u64));
    g.bench_with_input(BenchmarkId::from_parameter(format_args!("{in_features}x{out_features}")), &input, |b, input| {
      b.iter(|| layer.forward(black_box(input)).unwrap());
    });
  }
  g.finish();
}

fn fxp_forward(c: &mut Criterion) {
  let mut g = c.benchmark_group("fxp_forward");
  for (in_features, out_features) in SIZES {
    let mut layer = FxpLinear::new(FxpConfig::new(in_features, out_features), None, None).unwrap();
    let input = input_real(8, in_features);
    g.throughput(Throughput::Elements((8 * in_features * out_features) as u64));
    g.bench_with_input(BenchmarkId::from_parameter(format_args!("{in_features}x{out_features}")), &input, |b, input| {
      b.iter(|| layer.forward(black_box(input)).unwrap());
    });
  }
  g.finish();
}

// Building the HUB product table

fn hub_table(c: &mut Criterion) {
  let mut g = c.benchmark_group("hub_table");
  for cycle in [64, 256, 1024] {
    let mut config = HubConfig::new(1, 1);
    config.cycle = cycle;
    g.bench_with_input(BenchmarkId::from_parameter(cycle), &config, |b, config| {
      b.iter(|| HubLinear::new(black_box(config.clone()), None, None).unwrap());
    });
  }
  g.finish();
}

criterion_group!(cycle,
  linear_cycle,
  gaines_cycle,
);

criterion_group!(fast_path,
  hub_forward,
  fxp_forward,
  hub_table,
);

criterion_main!(cycle, fast_path);

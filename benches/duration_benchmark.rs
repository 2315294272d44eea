use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tubeflow::time_utils::format_iso8601_duration;

fn benchmark_duration_formatting(c: &mut Criterion) {
    // A full page of playlist items, mixing the shapes the API returns
    let durations: Vec<String> = (0..50)
        .map(|i| match i % 4 {
            0 => format!("PT{}H{}M{}S", i % 3, i % 60, (i * 7) % 60),
            1 => format!("PT{}M{}S", i % 60, (i * 7) % 60),
            2 => format!("PT{}S", (i * 7) % 60),
            _ => "P0D".to_string(),
        })
        .collect();

    let mut group = c.benchmark_group("iso8601_durations");

    group.bench_function("single_hms", |b| {
        b.iter(|| format_iso8601_duration(black_box(Some("PT1H2M3S"))))
    });

    group.bench_function("page_of_50", |b| {
        b.iter(|| {
            durations
                .iter()
                .map(|d| format_iso8601_duration(black_box(Some(d.as_str()))))
                .collect::<Vec<_>>()
        })
    });

    group.bench_function("malformed", |b| {
        b.iter(|| format_iso8601_duration(black_box(Some("1:02:03"))))
    });

    group.finish();
}

criterion_group!(benches, benchmark_duration_formatting);
criterion_main!(benches);

//! Benchmarks for the string module.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ergonomic_win32::guid::Guid;
use ergonomic_win32::string::{
    from_multi_wide, from_wide, to_multi_wide, to_wide, WideBuf, WideString, WideStringBuilder,
};

fn bench_to_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_wide");

    for size in [10, 100, 1000, 10000].iter() {
        let input: String = "a".repeat(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| to_wide(black_box(input)))
        });
    }

    group.finish();
}

fn bench_from_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_wide");

    for size in [10, 100, 1000, 10000].iter() {
        let input: String = "a".repeat(*size);
        let wide = to_wide(&input);
        group.throughput(Throughput::Bytes(*size as u64 * 2)); // UTF-16 is 2 bytes per char
        group.bench_with_input(BenchmarkId::from_parameter(size), &wide, |b, wide| {
            b.iter(|| from_wide(black_box(wide)))
        });
    }

    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_roundtrip");

    for size in [10, 100, 1000, 10000].iter() {
        let input: String = "a".repeat(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| {
                let wide = to_wide(black_box(input));
                from_wide(&wide)
            })
        });
    }

    group.finish();
}

fn bench_wide_string_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("WideString_creation");

    for size in [10, 100, 1000, 10000].iter() {
        let input: String = "a".repeat(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| WideString::new(black_box(input)))
        });
    }

    group.finish();
}

fn bench_wide_string_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("WideStringBuilder");

    // Benchmark building strings incrementally
    group.bench_function("build_10_segments", |b| {
        b.iter(|| {
            let mut builder = WideStringBuilder::new();
            for _ in 0..10 {
                builder.push("Hello, World!");
            }
            builder.build()
        })
    });

    group.bench_function("build_100_segments", |b| {
        b.iter(|| {
            let mut builder = WideStringBuilder::new();
            for _ in 0..100 {
                builder.push("Hello, World!");
            }
            builder.build()
        })
    });

    // Compare with pre-allocated capacity
    group.bench_function("build_100_segments_preallocated", |b| {
        b.iter(|| {
            let mut builder = WideStringBuilder::with_capacity(100 * 13);
            for _ in 0..100 {
                builder.push("Hello, World!");
            }
            builder.build()
        })
    });

    group.finish();
}

fn bench_unicode_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("unicode_strings");

    // ASCII only
    let ascii = "Hello, World! This is a test string.";
    group.bench_function("ascii_to_wide", |b| b.iter(|| to_wide(black_box(ascii))));

    // Mixed Unicode with emojis
    let unicode = "Hello, World! \u{1F600}\u{1F601}\u{1F602} \u{4E2D}\u{6587}";
    group.bench_function("unicode_to_wide", |b| {
        b.iter(|| to_wide(black_box(unicode)))
    });

    // CJK characters (2 UTF-16 code units each for some)
    let cjk = "\u{4E2D}\u{6587}\u{65E5}\u{672C}\u{8A9E}".repeat(100);
    group.bench_function("cjk_to_wide", |b| b.iter(|| to_wide(black_box(&cjk))));

    group.finish();
}

fn bench_output_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("WideBuf");

    // A control's text copied back, as WM_GETTEXT does
    let text = to_wide(&"x".repeat(255));
    group.bench_function("fill_and_read_256", |b| {
        b.iter(|| {
            let mut buf = WideBuf::new(256);
            buf.as_mut_slice()[..text.len()].copy_from_slice(&text);
            buf.to_string()
        })
    });

    group.finish();
}

fn bench_multi_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_strings");

    // File dialog filter specs are double-null-terminated lists
    let items = ["Text files", "*.txt", "Images", "*.png;*.jpg;*.bmp", "All files", "*.*"];
    group.bench_function("to_multi_wide", |b| {
        b.iter(|| to_multi_wide(black_box(items.iter().copied())))
    });

    let packed = to_multi_wide(items.iter().copied());
    group.bench_function("from_multi_wide", |b| {
        b.iter(|| from_multi_wide(black_box(&packed)))
    });

    group.finish();
}

fn bench_guid(c: &mut Criterion) {
    let mut group = c.benchmark_group("guid");

    let text = "{E436EBB3-524F-11CE-9F53-0020AF0BA770}";
    group.bench_function("parse", |b| b.iter(|| Guid::parse(black_box(text))));

    let guid = Guid::from_u128(0xe436ebb3_524f_11ce_9f53_0020af0ba770);
    group.bench_function("format", |b| b.iter(|| black_box(guid).to_string()));

    group.finish();
}

criterion_group!(
    benches,
    bench_to_wide,
    bench_from_wide,
    bench_roundtrip,
    bench_wide_string_creation,
    bench_wide_string_builder,
    bench_unicode_strings,
    bench_output_buffer,
    bench_multi_strings,
    bench_guid
);
criterion_main!(benches);

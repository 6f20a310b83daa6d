//! Benchmarks for message decoding and handler dispatch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ergonomic_win32::events::WindowEvents;
use ergonomic_win32::msg::{self, make_long, wm, WndMsg};

fn populated(n: u16) -> WindowEvents {
    let events = WindowEvents::new();
    events.wm_paint(|| Ok(()));
    events.wm_size(|_| Ok(()));
    for id in 0..n {
        events.wm_command(1000 + id, 0, move || Ok(()));
    }
    events
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for n in [1u16, 10, 100, 1000] {
        let events = populated(n);
        let click = WndMsg::new(msg::WM_COMMAND, make_long(1000 + n - 1, 0) as usize, 0);
        group.bench_with_input(BenchmarkId::new("command", n), &click, |b, p| {
            // SAFETY: WM_COMMAND with a null lparam carries no pointers.
            b.iter(|| unsafe { events.process(black_box(*p)) })
        });
    }

    let events = populated(100);
    let paint = WndMsg::new(msg::WM_PAINT, 0, 0);
    group.bench_function("plain_message", |b| {
        // SAFETY: WM_PAINT carries no pointers.
        b.iter(|| unsafe { events.process(black_box(paint)) })
    });

    // Falls through to the default procedure
    let unhandled = WndMsg::new(msg::WM_MOVE, 0, 0);
    group.bench_function("unhandled", |b| {
        // SAFETY: WM_MOVE carries no pointers.
        b.iter(|| unsafe { events.process(black_box(unhandled)) })
    });

    group.finish();
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("register_100_commands", |b| b.iter(|| populated(black_box(100))));

    // Replacing keeps the table size constant
    let events = WindowEvents::new();
    group.bench_function("replace_handler", |b| {
        b.iter(|| events.wm_close(|| Ok(())))
    });

    group.finish();
}

fn bench_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding");

    let size = WndMsg::new(msg::WM_SIZE, 0, make_long(800, 600) as isize);
    group.bench_function("wm_size", |b| b.iter(|| wm::Size::from_msg(black_box(&size))));

    let cmd = WndMsg::new(msg::WM_COMMAND, make_long(42, 0) as usize, 0);
    group.bench_function("wm_command", |b| {
        b.iter(|| wm::Command::from_msg(black_box(&cmd)))
    });

    // Negative coordinates from a second monitor
    let mouse = WndMsg::new(msg::WM_MOUSEMOVE, 0, make_long(-20i16 as u16, 300) as isize);
    group.bench_function("wm_mouse", |b| b.iter(|| wm::Mouse::from_msg(black_box(&mouse))));

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_registration, bench_decoding);
criterion_main!(benches);

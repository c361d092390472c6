//! Benchmarks for drawing status screens and menus into a frame buffer
//!
//! Drawing happens under the display lock, so it bounds how long a render
//! tick can hold off other users of the panel.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ezio::font::BuiltinFont;
use ezio::framebuffer::FrameBuffer;
use ezio::menu::{MenuItem, MenuTree};
use ezio::status::Screen;
use ezio::test_utils::sample_frame;
use std::hint::black_box;

fn bench_screens(c: &mut Criterion) {
    let data = sample_frame();
    let mut fb = FrameBuffer::new();

    let mut group = c.benchmark_group("screen_draw");
    for screen in Screen::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(screen.name()), &screen, |b, screen| {
            let mut frame = 0u64;
            b.iter(|| {
                frame += 1;
                screen.draw(&mut fb, &BuiltinFont, black_box(&data), frame);
                black_box(fb.lit_count())
            })
        });
    }
    group.finish();
}

fn bench_menu(c: &mut Criterion) {
    let mut tree = MenuTree::new("PFSENSE LCD");
    let root = tree.root();
    for index in 0..12 {
        let item = MenuItem::new(format!("Item {index}")).with_value(move || format!("{index}%"));
        tree.add_item(root, item);
    }
    let mut fb = FrameBuffer::new();

    c.bench_function("menu_draw_scrolling", |b| {
        b.iter(|| {
            tree.select_next(root);
            tree.draw(root, &mut fb, &BuiltinFont);
            black_box(fb.lit_count())
        })
    });
}

criterion_group!(benches, bench_screens, bench_menu);
criterion_main!(benches);

//! Block-bar renderer tests

use encore_spectrum::{
    draw_block_bars, BlockBars, BlockBarsOptions, Color, DrawOp, PaletteMode, RecordingSurface,
    Rgba,
};
use proptest::prelude::*;

// ============================================================================
// Layout and geometry
// ============================================================================

#[test]
fn classic_blocks_stack_from_the_bottom() {
    let options = BlockBarsOptions {
        smoothing: 0.0,
        bars: Some(8.0),
        gap: 2.0,
        color: Some("#ffffff".into()),
        ..BlockBarsOptions::default()
    }
    .resolve()
    .unwrap();

    let mut surface = RecordingSurface::new();
    let mut levels = vec![0.0; 8];
    // Only the first bar has energy
    let mut spectrum = vec![0u8; 64];
    spectrum[..8].fill(255);

    let layout = draw_block_bars(&mut surface, &spectrum, &mut levels, 100.0, 40.0, &options, 0);

    // (100 - 7 * 2) / 8 = 10.75
    assert_eq!(layout.bar_width, 10.0);
    // 40 px level / 4 px pitch
    let rects: Vec<_> = surface.rects().collect();
    assert_eq!(rects.len(), 10);
    assert!(rects.iter().all(|(rect, _)| rect.x == 0.0 && rect.width == 10.0));
    assert_eq!(rects[0].0.y, 40.0 - 4.0 - 3.0);
    assert_eq!(rects[1].0.y, 40.0 - 8.0 - 3.0);
    assert!(rects
        .iter()
        .all(|(_, color)| **color == Color::Rgba(Rgba::rgb(255.0, 255.0, 255.0))));
}

#[test]
fn square_cells_are_square() {
    let mut bars = BlockBars::new(&BlockBarsOptions::square_cells(10.0, 2.0)).unwrap();
    let mut surface = RecordingSurface::new();
    bars.draw(&mut surface, &[255; 128], 240.0, 240.0);

    assert!(surface.rects().count() > 0);
    for (rect, _) in surface.rects() {
        assert_eq!(rect.width, 10.0);
        assert_eq!(rect.height, 10.0);
        assert_eq!(rect.x % 12.0, 0.0);
    }
}

#[test]
fn oversized_bar_count_is_capped() {
    let mut bars = BlockBars::new(&BlockBarsOptions {
        bars: Some(1.0e18),
        ..BlockBarsOptions::default()
    })
    .unwrap();
    let mut surface = RecordingSurface::new();
    let layout = bars.draw(&mut surface, &[255; 64], 100.0, 40.0);

    assert_eq!(layout.bars, 2000);
    assert_eq!(bars.levels().len(), 2000);
}

#[test]
fn background_fill_comes_first() {
    let mut bars = BlockBars::new(&BlockBarsOptions {
        bg_clear: Some("white".into()),
        ..BlockBarsOptions::default()
    })
    .unwrap();
    let mut surface = RecordingSurface::new();
    bars.draw(&mut surface, &[128; 256], 200.0, 100.0);

    assert_eq!(
        surface.ops()[0],
        DrawOp::Fill {
            color: Color::Rgba(Rgba::rgb(255.0, 255.0, 255.0)),
            width: 200.0,
            height: 100.0,
        }
    );
}

// ============================================================================
// Colour
// ============================================================================

#[test]
fn per_block_palette_shifts_phase_up_the_bar() {
    let base = BlockBarsOptions {
        square: true,
        smoothing: 0.0,
        palette: vec!["#000000".into(), "#ffffff".into()],
        alpha_base: 1.0,
        alpha_step: 0.0,
        ..BlockBarsOptions::default()
    };

    let colors = |mode: PaletteMode| {
        let mut bars = BlockBars::new(&BlockBarsOptions {
            palette_mode: mode,
            ..base.clone()
        })
        .unwrap();
        let mut surface = RecordingSurface::new();
        bars.draw(&mut surface, &[255; 16], 26.0, 60.0);
        surface.rects().map(|(_, c)| *c).collect::<Vec<_>>()
    };

    let per_bar = colors(PaletteMode::PerBar);
    assert!(per_bar.windows(2).all(|w| w[0] == w[1]));

    let per_block = colors(PaletteMode::PerBlock);
    assert_eq!(per_block[0], per_bar[0]);
    assert_ne!(per_block[1], per_block[0]);
}

#[test]
fn invalid_palette_entries_paint_fallback() {
    let mut bars = BlockBars::new(&BlockBarsOptions {
        square: true,
        smoothing: 0.0,
        palette: vec!["oops".into(), "also-bad".into()],
        alpha_base: 1.0,
        alpha_step: 0.0,
        ..BlockBarsOptions::default()
    })
    .unwrap();
    let mut surface = RecordingSurface::new();
    bars.draw(&mut surface, &[255; 16], 26.0, 60.0);

    let (_, color) = surface.rects().next().unwrap();
    assert_eq!(color.to_rgba().to_u8(), [255, 0, 128, 255]);
}

#[test]
fn hue_rotates_with_frames() {
    let mut bars = BlockBars::new(&BlockBarsOptions {
        square: true,
        smoothing: 0.0,
        ..BlockBarsOptions::default()
    })
    .unwrap();

    let mut first = RecordingSurface::new();
    bars.draw(&mut first, &[255; 16], 26.0, 60.0);
    let mut later = RecordingSurface::new();
    for _ in 0..10 {
        later.take();
        bars.draw(&mut later, &[255; 16], 26.0, 60.0);
    }

    let hue = |surface: &RecordingSurface| match surface.rects().next().unwrap().1 {
        Color::Hsla(hsla) => hsla.h,
        Color::Rgba(_) => panic!("expected hue colour"),
    };
    assert_eq!(hue(&first), 210.0);
    // 210 + 10 * 0.6
    assert_eq!(hue(&later), 216.0);
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_options() -> impl Strategy<Value = BlockBarsOptions> {
    (
        any::<bool>(),
        4.0f64..24.0,
        0.0f64..6.0,
        0.0f64..0.99,
        prop::option::of(8.0f64..200.0),
        prop::bool::ANY,
    )
        .prop_map(|(square, cell_size, cell_gap, smoothing, bars, palette)| BlockBarsOptions {
            square,
            cell_size,
            cell_gap,
            smoothing,
            bars,
            palette: if palette {
                vec!["#ff4d4f".into(), "#22c55e".into(), "#3b82f6".into()]
            } else {
                Vec::new()
            },
            ..BlockBarsOptions::default()
        })
}

proptest! {
    /// Property: identical inputs produce identical fill instructions
    #[test]
    fn rendering_is_deterministic(
        options in arb_options(),
        spectrum in prop::collection::vec(any::<u8>(), 1..1024),
        width in 16.0f64..800.0,
        height in 16.0f64..400.0,
        frames in 1usize..4,
    ) {
        let mut a = BlockBars::new(&options).unwrap();
        let mut b = BlockBars::new(&options).unwrap();
        let mut sa = RecordingSurface::new();
        let mut sb = RecordingSurface::new();

        for _ in 0..frames {
            a.draw(&mut sa, &spectrum, width, height);
            b.draw(&mut sb, &spectrum, width, height);
        }
        prop_assert_eq!(sa.ops(), sb.ops());
    }

    /// Property: blocks never rise above the viewport top by more than one block
    #[test]
    fn blocks_stay_within_height(
        options in arb_options(),
        spectrum in prop::collection::vec(any::<u8>(), 1..512),
        width in 16.0f64..600.0,
        height in 16.0f64..300.0,
    ) {
        let mut bars = BlockBars::new(&options).unwrap();
        let mut surface = RecordingSurface::new();
        let layout = bars.draw(&mut surface, &spectrum, width, height);

        for (rect, _) in surface.rects() {
            prop_assert!(rect.y + rect.height <= height);
            prop_assert!(rect.y >= -layout.pitch - layout.block_height);
        }
        prop_assert!(bars.levels().iter().all(|&l| (0.0..=height + 1e-9).contains(&l)));
    }
}

use image::RgbaImage;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::foundation::color::{BackgroundColor, RgbColor};

fn gradient_canvas(w: u32, h: u32) -> Canvas {
    let mut img = RgbaImage::new(w, h);
    for (x, y, p) in img.enumerate_pixels_mut() {
        *p = Rgba([(x * 7 % 256) as u8, (y * 11 % 256) as u8, 90, 255]);
    }
    img.put_pixel(0, 0, Rgba([240, 240, 240, 255]));
    Canvas::from_background_image(img).unwrap()
}

#[test]
fn random_params_stay_in_documented_ranges() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    for _ in 0..500 {
        let p = WarpParams::random(&mut rng, 150, 40);
        assert!((0..=150).contains(&p.center.0));
        assert!((0..=40).contains(&p.center.1));
        assert!((0.0..=10.0).contains(&p.phase));
        assert_eq!(p.phase.fract(), 0.0);
        assert!(p.scale >= 1.1 && p.scale <= 1.1 + 1.0 / 3.0 + 1e-12);
    }
}

#[test]
fn center_maps_to_itself_plus_shear() {
    let params = WarpParams {
        center: (20, 10),
        phase: 3.0,
        scale: 1.2,
    };
    let p = params.source_point(20, 10);
    assert_eq!(p.x, 20.0);
    assert!((p.y - (10.0 + 1.2 * (3.0f64 + 4.0).sin())).abs() < 1e-12);
}

#[test]
fn radial_ripple_rescales_distance() {
    let params = WarpParams {
        center: (0, 0),
        phase: 0.0,
        scale: 0.0,
    };
    let p = params.source_point(30, 0);
    assert!((p.x - (30.0 + 4.0 * 1.0f64.sin())).abs() < 1e-9);
    assert!(p.y.abs() < 1e-9);
}

#[test]
fn bilinear_at_integer_coordinates_is_exact() {
    let px = [
        Rgba([13, 77, 201, 255]),
        Rgba([0, 0, 0, 255]),
        Rgba([255, 255, 255, 255]),
        Rgba([1, 2, 3, 4]),
    ];
    assert_eq!(bilinear(0.0, 0.0, px), px[0]);
    assert_eq!(bilinear(1.0, 0.0, px), px[1]);
    assert_eq!(bilinear(0.0, 1.0, px), px[2]);
    assert_eq!(bilinear(1.0, 1.0, px), px[3]);
}

#[test]
fn bilinear_blends_midpoints() {
    let a = Rgba([0, 0, 0, 255]);
    let b = Rgba([200, 100, 50, 255]);
    assert_eq!(bilinear(0.5, 0.0, [a, b, a, b]), Rgba([100, 50, 25, 255]));
    assert_eq!(bilinear(0.5, 0.5, [a, a, b, b]), Rgba([100, 50, 25, 255]));
    let c = Rgba([77, 77, 77, 255]);
    assert_eq!(bilinear(0.37, 0.81, [c; 4]), c);
}

#[test]
fn warp_is_size_preserving_and_deterministic() {
    let src = gradient_canvas(150, 40);
    let params = WarpParams {
        center: (60, 18),
        phase: 4.0,
        scale: 1.25,
    };
    for interpolate in [false, true] {
        let a = warp(&src, &params, interpolate);
        let b = warp(&src, &params, interpolate);
        assert_eq!(a.dimensions(), (150, 40));
        assert_eq!(a.image(), b.image());
        assert_ne!(a.image(), src.image());
    }
}

#[test]
fn flat_canvas_stays_flat() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut src = Canvas::new(40, 20).unwrap();
    src.fill(
        Some(BackgroundColor::Rgb(RgbColor::new(210, 220, 230))),
        &mut rng,
    );
    let params = WarpParams::random(&mut rng, 40, 20);
    let out = warp(&src, &params, true);
    assert!(out.image().pixels().all(|p| *p == src.background()));
}

#[test]
fn opaque_black_samples_become_background() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut src = Canvas::new(10, 10).unwrap();
    src.fill(
        Some(BackgroundColor::Rgb(RgbColor::new(250, 250, 250))),
        &mut rng,
    );
    for y in 0..10 {
        for x in 0..10 {
            if (x + y) % 2 == 0 {
                src.set_pixel(x, y, OPAQUE_BLACK);
            }
        }
    }
    let params = WarpParams {
        center: (5, 5),
        phase: 0.0,
        scale: 1.1,
    };
    let out = warp(&src, &params, false);
    assert!(out.image().pixels().all(|p| *p != OPAQUE_BLACK));
}

#[test]
fn transparent_canvas_keeps_alpha_without_interpolation() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut src = Canvas::new(30, 30).unwrap();
    src.fill(Some(BackgroundColor::Transparent), &mut rng);
    src.set_pixel(15, 15, Rgba([255, 0, 0, 255]));
    let params = WarpParams {
        center: (15, 15),
        phase: 0.0,
        scale: 1.1,
    };
    let out = warp(&src, &params, true);
    assert!(out.save_alpha());
    assert!(
        out.image()
            .pixels()
            .all(|p| p.0[3] == 0 || *p == Rgba([255, 0, 0, 255]))
    );
}

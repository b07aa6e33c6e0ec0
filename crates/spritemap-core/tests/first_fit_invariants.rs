use image::{Rgba, RgbaImage};
use spritemap_core::prelude::*;

fn opaque(key: &str, w: u32, h: u32) -> Asset {
    Asset::new(key, RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255])))
}

fn random_assets(seed: u64, count: usize) -> Vec<Asset> {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(1..=24);
            let h = rng.gen_range(1..=24);
            opaque(&format!("r{i:03}.png"), w, h)
        })
        .collect()
}

fn disjoint(frames: &[Rect]) -> bool {
    for i in 0..frames.len() {
        for j in (i + 1)..frames.len() {
            if frames[i].intersects(&frames[j]) {
                return false;
            }
        }
    }
    true
}

/// Reference first-fit: scan every origin row-major, test against every
/// previously placed rectangle.
fn naive_first_fit(sizes: &[(u32, u32)], larg: u32, bound: u32) -> Vec<Rect> {
    let mut placed: Vec<Rect> = Vec::new();
    for &(w, h) in sizes {
        let mut found = None;
        'scan: for y in 0..=(bound - h) {
            for x in 0..=(larg - w) {
                let r = Rect::new(x, y, w, h);
                if placed.iter().all(|p| !p.intersects(&r)) {
                    found = Some(r);
                    break 'scan;
                }
            }
        }
        placed.push(found.expect("naive scan finds a slot"));
    }
    placed
}

#[test]
fn random_sets_are_disjoint_and_contained() {
    for seed in [1u64, 7, 42] {
        let sheet = pack_assets(random_assets(seed, 60), &PackerConfig::default()).expect("pack");
        let frames: Vec<Rect> = sheet.assets.iter().map(|a| a.frame().expect("placed")).collect();
        assert!(disjoint(&frames), "overlap for seed {seed}");
        let bounds = Rect::new(0, 0, sheet.width(), sheet.height());
        for f in &frames {
            assert!(bounds.contains(f), "{f:?} outside {bounds:?}");
        }
        let used: u64 = sheet.assets.iter().map(|a| a.surface()).sum();
        assert!(sheet.width() as u64 * sheet.height() as u64 >= used);
    }
}

#[test]
fn accelerated_scan_matches_naive_first_fit() {
    let sheet = pack_assets(random_assets(9, 40), &PackerConfig::default()).expect("pack");
    let sizes: Vec<(u32, u32)> = sheet.assets.iter().map(|a| (a.width(), a.height())).collect();
    let bound: u32 = sizes.iter().map(|s| s.1).sum();
    let expected = naive_first_fit(&sizes, sheet.width(), bound);
    let actual: Vec<Rect> = sheet.assets.iter().map(|a| a.frame().expect("placed")).collect();
    assert_eq!(expected, actual);
}

#[test]
fn packing_is_deterministic() {
    let cfg = PackerConfig::default();
    let a = pack_assets(random_assets(3, 50), &cfg).expect("pack");
    let b = pack_assets(random_assets(3, 50), &cfg).expect("pack");
    assert_eq!(a.signature, b.signature);
    let pa: Vec<_> = a.assets.iter().map(|x| (x.source_name().to_string(), x.placement())).collect();
    let pb: Vec<_> = b.assets.iter().map(|x| (x.source_name().to_string(), x.placement())).collect();
    assert_eq!(pa, pb);
}

#[test]
fn sizing_follows_area_and_widest_asset() {
    // total area 225 -> ceil(sqrt) + 1 = 16; widest asset is 20
    let sheet = pack_assets(
        vec![opaque("big.png", 20, 10), opaque("small.png", 5, 5)],
        &PackerConfig::default(),
    )
    .expect("pack");
    assert_eq!(sheet.width(), 20);
    assert_eq!(sheet.height(), 15);
    assert_eq!(sheet.canvas.height_bound(), 15);

    let sheet = pack_assets(
        vec![opaque("a.png", 10, 10), opaque("b.png", 10, 10)],
        &PackerConfig::default(),
    )
    .expect("pack");
    // sqrt(200) -> 15, +1
    assert_eq!(sheet.width(), 16);
}

#[test]
fn largest_first_with_name_tiebreak() {
    let sheet = pack_assets(
        vec![opaque("z.png", 4, 4), opaque("b.png", 8, 8), opaque("a.png", 8, 8)],
        &PackerConfig::default(),
    )
    .expect("pack");
    let order: Vec<&str> = sheet.assets.iter().map(|a| a.source_name()).collect();
    assert_eq!(order, vec!["a.png", "b.png", "z.png"]);
    assert_eq!(sheet.assets[0].placement(), Some((0, 0)));
}

#[test]
fn two_red_squares_and_a_transparent_one() {
    let transparent = Asset::new("clear.png", RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 0])));
    let cfg = PackerConfig::builder().crop(true).build();
    let sheet = pack_assets(
        vec![opaque("a.png", 10, 10), opaque("b.png", 10, 10), transparent],
        &cfg,
    )
    .expect("pack");

    assert_eq!(sheet.assets.len(), 3);
    let clear = sheet
        .assets
        .iter()
        .find(|a| a.source_name() == "clear.png")
        .expect("kept");
    assert_eq!((clear.width(), clear.height()), (0, 0));
    assert_eq!(clear.placement(), Some((0, 0)));

    let squares: Vec<Rect> = sheet
        .assets
        .iter()
        .filter(|a| a.surface() > 0)
        .map(|a| a.frame().expect("placed"))
        .collect();
    assert_eq!(squares.len(), 2);
    assert!(!squares[0].intersects(&squares[1]));
    assert_eq!(squares[0], Rect::new(0, 0, 10, 10));
    assert_eq!(squares[1], Rect::new(0, 10, 10, 10));
    assert!(sheet.height() >= 10);
    assert!(sheet.width() >= 10);
}

#[test]
fn packer_fills_gap_to_the_right_first() {
    let mut packer = FirstFitPacker::new(16, 40);
    let mut a = opaque("a.png", 10, 10);
    let mut b = opaque("b.png", 6, 4);
    let mut c = opaque("c.png", 6, 6);
    assert_eq!(packer.pack(&mut a).expect("a"), Rect::new(0, 0, 10, 10));
    assert_eq!(packer.pack(&mut b).expect("b"), Rect::new(10, 0, 6, 4));
    assert_eq!(packer.pack(&mut c).expect("c"), Rect::new(10, 4, 6, 6));
    assert_eq!(packer.canvas().top(), 10);
    assert!(packer.canvas().is_occupied(15, 9));
    assert!(!packer.canvas().is_occupied(0, 10));
}

#[test]
fn packer_reports_out_of_space() {
    let mut packer = FirstFitPacker::new(8, 8);
    let mut a = opaque("wide.png", 9, 1);
    match packer.pack(&mut a) {
        Err(spritemap_core::SpriteMapError::OutOfSpace { key, width, height }) => {
            assert_eq!(key, "wide.png");
            assert_eq!((width, height), (9, 1));
        }
        other => panic!("expected OutOfSpace, got {other:?}"),
    }
    assert_eq!(a.placement(), None);
}

#[test]
fn empty_input_is_rejected() {
    let err = pack_assets(Vec::new(), &PackerConfig::default()).unwrap_err();
    assert!(matches!(err, spritemap_core::SpriteMapError::Empty));
}

//! # Tiler
//!
//! Cuts an image into tiles of at most `tile_size` x `tile_size`.
//!
//! ```text
//!   0        64       128  150
//!   ┌────────┬────────┬────┐ 0
//!   │        │        │    │
//!   ├────────┼────────┼────┤ 64
//!   │        │        │    │
//!   ├────────┼────────┼────┤ 100
//!   └────────┴────────┴────┘
//! ```
//!
//! The right column and bottom row absorb the remainder and may be
//! narrower. The tiles cover the image exactly once.

use tilecast_protocol::TileRect;

/// Row-major partition of a `width` x `height` image.
///
/// Returns an empty list if any argument is zero.
#[must_use]
pub fn partition(width: u32, height: u32, tile_size: u32) -> Vec<TileRect> {
    if width == 0 || height == 0 || tile_size == 0 {
        return Vec::new();
    }
    let columns = width.div_ceil(tile_size);
    let rows = height.div_ceil(tile_size);
    let mut tiles = Vec::with_capacity(columns as usize * rows as usize);

    for row in 0..rows {
        let y = row * tile_size;
        let h = tile_size.min(height - y);
        for column in 0..columns {
            let x = column * tile_size;
            let w = tile_size.min(width - x);
            tiles.push(TileRect::new(x, y, w, h));
        }
    }
    tiles
}

/// Sorts tiles so those nearest the image center come first.
///
/// Ties break top-to-bottom then left-to-right, so the order is fully
/// determined by the geometry.
pub fn order_centre_out(tiles: &mut [TileRect], width: u32, height: u32) {
    // Doubled coordinates keep the tile centers integral.
    let key = |t: &TileRect| {
        let dx = (2 * i64::from(t.x) + i64::from(t.width)) - i64::from(width);
        let dy = (2 * i64::from(t.y) + i64::from(t.height)) - i64::from(height);
        (dx * dx + dy * dy, t.y, t.x)
    };
    tiles.sort_unstable_by_key(key);
}

/// Work list for one image: the partition in centre-out order.
#[must_use]
pub fn plan(width: u32, height: u32, tile_size: u32) -> Vec<TileRect> {
    let mut tiles = partition(width, height, tile_size);
    order_centre_out(&mut tiles, width, height);
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple() {
        let tiles = partition(128, 128, 64);
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.width == 64 && t.height == 64));
    }

    #[test]
    fn test_remainder_edges() {
        let tiles = partition(150, 100, 64);
        assert_eq!(tiles.len(), 6);
        assert_eq!(tiles[2], TileRect::new(128, 0, 22, 64));
        assert_eq!(tiles[5], TileRect::new(128, 64, 22, 36));
        let area: u64 = tiles.iter().map(TileRect::area).sum();
        assert_eq!(area, 150 * 100);
    }

    #[test]
    fn test_single_pixel() {
        assert_eq!(plan(1, 1, 64), vec![TileRect::new(0, 0, 1, 1)]);
    }

    #[test]
    fn test_tile_larger_than_image() {
        assert_eq!(partition(10, 3, 64), vec![TileRect::new(0, 0, 10, 3)]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(partition(0, 10, 8).is_empty());
        assert!(partition(10, 0, 8).is_empty());
        assert!(partition(10, 10, 0).is_empty());
    }

    #[test]
    fn test_centre_first() {
        let tiles = plan(192, 192, 64);
        assert_eq!(tiles[0], TileRect::new(64, 64, 64, 64));
        // Corners come last.
        let last_four: Vec<_> = tiles[5..].iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(last_four, vec![(0, 0), (128, 0), (0, 128), (128, 128)]);
    }

    #[test]
    fn test_order_does_not_change_coverage() {
        let mut a = partition(300, 200, 32);
        let mut b = plan(300, 200, 32);
        a.sort_unstable_by_key(|t| (t.y, t.x));
        b.sort_unstable_by_key(|t| (t.y, t.x));
        assert_eq!(a, b);
    }
}

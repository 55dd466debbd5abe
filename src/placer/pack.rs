//! Shelf packing of rectangles.
//!
//! Boxes are sorted tallest first and laid left to right in rows ("shelves")
//! no wider than a row limit. Several limits are tried and the arrangement
//! that keeps the enclosing box smallest and closest to square is kept.
//! Rows never share horizontal space and each row is as tall as its tallest
//! box, so the result never overlaps.

use log::trace;

use super::component::{Point, Size};

/// Row-width limits tried, as multiples of the square root of the total area.
const ROW_FACTORS: [f64; 5] = [0.75, 1.0, 1.25, 1.5, 2.0];

/// Tolerance for float noise when testing whether a box still fits in a row.
const ROW_EPSILON: f64 = 1e-9;

/// Result of packing a set of boxes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    /// Size of the box enclosing every packed child.
    pub size: Size,
    /// Top-left offset of each child, in input order.
    pub offsets: Vec<Point>,
}

/// Pack `sizes`, returning the enclosing size and each box's offset.
pub fn pack(sizes: &[Size]) -> Packing {
    if sizes.is_empty() {
        return Packing::default();
    }

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        sizes[b]
            .height
            .total_cmp(&sizes[a].height)
            .then(sizes[b].width.total_cmp(&sizes[a].width))
            .then(a.cmp(&b))
    });

    let total_area: f64 = sizes.iter().map(Size::area).sum();
    let total_width: f64 = sizes.iter().map(|s| s.width).sum();
    let widest = sizes.iter().map(|s| s.width).fold(0.0, f64::max);

    let mut limits = Vec::with_capacity(ROW_FACTORS.len() + 2);
    limits.push(widest);
    limits.extend(ROW_FACTORS.iter().map(|k| (k * total_area.sqrt()).max(widest)));
    limits.push(total_width);

    let mut best: Option<(f64, Packing)> = None;
    for limit in limits {
        let packing = shelf(sizes, &order, limit);
        let score = squareness(packing.size);
        trace!(limit, score; "Shelf candidate");

        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, packing));
        }
    }

    best.map(|(_, p)| p).unwrap_or_default()
}

/// `w + h + |w - h|`: small for compact, square-ish arrangements.
fn squareness(size: Size) -> f64 {
    size.width + size.height + (size.width - size.height).abs()
}

fn shelf(sizes: &[Size], order: &[usize], limit: f64) -> Packing {
    let mut offsets = vec![Point::default(); sizes.len()];
    let (mut x, mut y, mut row_height, mut width) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);

    for &i in order {
        let size = sizes[i];
        if x > 0.0 && x + size.width > limit + ROW_EPSILON {
            y += row_height;
            x = 0.0;
            row_height = 0.0;
        }

        offsets[i] = Point::new(x, y);
        x += size.width;
        row_height = row_height.max(size.height);
        width = width.max(x);
    }

    Packing {
        size: Size::new(width, y + row_height),
        offsets,
    }
}

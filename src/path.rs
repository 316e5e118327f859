//! Line generators for the geometric traversals.
//!
//! Each generator returns a list of lines, every line a list of row-major
//! pixel indices inside a `width × height` grid. Lines may overlap or miss
//! pixels; [`CurveOrder`](crate::CurveOrder) resolves that by letting the
//! first line claim a pixel and parking unclaimed pixels in singleton lines.

use std::f64::consts::{FRAC_PI_2, PI};

use rayon::prelude::*;

/// Row-major index of `(x, y)` if it lies inside the grid.
#[inline]
fn cell(x: i64, y: i64, width: usize, height: usize) -> Option<usize> {
    (x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height)
        .then(|| y as usize * width + x as usize)
}

/// Pushes `index` unless it repeats the previous entry.
#[inline]
fn push_distinct(line: &mut Vec<usize>, index: usize) {
    if line.last() != Some(&index) {
        line.push(index);
    }
}

pub(crate) fn horizontal_lines(width: usize, height: usize) -> Vec<Vec<usize>> {
    (0..height)
        .map(|y| (y * width..(y + 1) * width).collect())
        .collect()
}

pub(crate) fn vertical_lines(width: usize, height: usize) -> Vec<Vec<usize>> {
    (0..width)
        .map(|x| (0..height).map(|y| y * width + x).collect())
        .collect()
}

/// Parallel lines at `degrees` from vertical. Angles in `(45, 225)` walk
/// each line backwards.
pub(crate) fn diagonal_lines(width: usize, height: usize, degrees: i32) -> Vec<Vec<usize>> {
    let turned = degrees.rem_euclid(360);
    let backwards = turned > 45 && turned < 225;
    let angle = f64::from(turned % 180);
    let (w, h) = (width as i64, height as i64);

    let mut lines: Vec<Vec<usize>> = if angle > 45.0 && angle < 135.0 {
        // Shallow lines: step along x, offset y.
        let slope = (90.0 - angle).to_radians().tan();
        let overhead = (slope * width as f64).round() as i64;
        let starts = if slope < 0.0 { overhead..h } else { 0..h + overhead };
        starts
            .map(|ys| {
                (0..w)
                    .filter_map(|x| cell(x, ys - (x as f64 * slope).round() as i64, width, height))
                    .collect()
            })
            .collect()
    } else {
        // Steep lines: step along y, offset x.
        let slope = angle.to_radians().tan();
        let overhead = (slope * height as f64).round() as i64;
        let starts = if slope < 0.0 { overhead..w } else { 0..w + overhead };
        starts
            .map(|xs| {
                (0..h)
                    .filter_map(|y| cell(xs - (y as f64 * slope).round() as i64, y, width, height))
                    .collect()
            })
            .collect()
    };
    if backwards {
        lines.iter_mut().for_each(|line| line.reverse());
    }
    lines
}

/// `start..=end` ordered midpoint first, then each half the same way.
fn spread_range(start: usize, end: usize) -> Vec<usize> {
    if start == end {
        return vec![start];
    }
    if end - start == 1 {
        return vec![start, end];
    }
    let mid = start + (end - start) / 2;
    let mut out = vec![mid];
    out.extend(spread_range(start, mid - 1));
    out.extend(spread_range(mid + 1, end));
    out
}

/// Rays from the image center to every border cell. Rays toward widely
/// spaced tips come first so they are not cut short by their neighbours.
pub(crate) fn rays(width: usize, height: usize) -> Vec<Vec<usize>> {
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let (w, h) = (width as f64, height as f64);

    let mut tips: Vec<(f64, f64)> = Vec::with_capacity(2 * (width + height));
    tips.extend(spread_range(0, width - 1).into_iter().map(|x| (x as f64, 0.0)));
    tips.extend(spread_range(0, width - 1).into_iter().map(|x| (x as f64, h)));
    tips.extend(spread_range(0, height - 1).into_iter().map(|y| (0.0, y as f64)));
    tips.extend(spread_range(0, height - 1).into_iter().map(|y| (w, y as f64)));

    tips.into_par_iter()
        .filter_map(|(tx, ty)| {
            let (dx, dy) = (tx - cx, ty - cy);
            let m = 2.0 * dx.abs().max(dy.abs());
            // Half-pixel steps along the major axis.
            (m > 0.0).then(|| (dx / m, dy / m))
        })
        .map(|(dx, dy)| {
            let (mut x, mut y) = (cx, cy);
            let mut line = Vec::new();
            while x >= 0.0 && y >= 0.0 && x <= w && y <= h {
                if let Some(i) = cell(x as i64, y as i64, width, height) {
                    push_distinct(&mut line, i);
                }
                x += dx;
                y += dy;
            }
            line
        })
        .collect()
}

/// Points of a circle of radius `r` around `(cx, cy)`, starting at the top.
fn arc(
    cx: f64,
    cy: f64,
    r: f64,
    steps: u64,
    sweep: f64,
    width: usize,
    height: usize,
) -> Vec<usize> {
    let step = sweep / steps as f64;
    let mut line = Vec::new();
    for k in 0..=steps {
        let angle = -FRAC_PI_2 + step * k as f64;
        let x = (cx + angle.cos() * r).floor() as i64;
        let y = (cy + angle.sin() * r).floor() as i64;
        if let Some(i) = cell(x, y, width, height) {
            push_distinct(&mut line, i);
        }
    }
    line
}

fn max_radius(width: usize, height: usize) -> u64 {
    let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt();
    (diagonal / 2.0).ceil() as u64 + 1
}

/// Concentric circles around the center. Each circle is two lines, both
/// starting at the top: one sweeping clockwise, one counter-clockwise.
pub(crate) fn circles(width: usize, height: usize) -> Vec<Vec<usize>> {
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    (1..max_radius(width, height))
        .into_par_iter()
        .flat_map_iter(|r| {
            let steps = 8 * r;
            [
                arc(cx, cy, r as f64, steps, PI, width, height),
                arc(cx, cy, r as f64, steps, -PI, width, height),
            ]
        })
        .collect()
}

/// Full circles of growing radius joined into one line.
pub(crate) fn round_spiral(width: usize, height: usize) -> Vec<Vec<usize>> {
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let rings: Vec<Vec<usize>> = (1..max_radius(width, height))
        .into_par_iter()
        .map(|r| arc(cx, cy, r as f64, 16 * r, 2.0 * PI, width, height))
        .collect();
    vec![rings.concat()]
}

/// Rectangular spiral out of the center. A `square` spiral grows both legs
/// in step; otherwise the core leg runs along the longer side and spans the
/// difference between width and height, so the spiral follows the aspect
/// ratio.
pub(crate) fn rect_spiral(width: usize, height: usize, square: bool) -> Vec<Vec<usize>> {
    let (w, h) = (width as i64, height as i64);
    let (mut x, mut y) = (w / 2, h / 2);
    let longest = w.max(h);
    let (mut reach_x, mut reach_y) = (1, 1);
    let tall = !square && h > w;
    if !square {
        if w > h {
            reach_x = w - h;
        } else {
            reach_y = (h - w).max(1);
        }
        x -= reach_x / 2;
        y -= reach_y / 2;
    }

    let mut line = Vec::with_capacity(width * height);
    line.extend(cell(x, y, width, height));
    let mut sign = 1;
    loop {
        let legs = if tall {
            [(false, reach_y), (true, reach_x)]
        } else {
            [(true, reach_x), (false, reach_y)]
        };
        for (horizontal, reach) in legs {
            for _ in 0..reach {
                if horizontal {
                    x += sign;
                } else {
                    y += sign;
                }
                line.extend(cell(x, y, width, height));
            }
        }
        reach_x += 1;
        reach_y += 1;
        if reach_x > longest + 1 || reach_y > longest + 1 {
            break;
        }
        sign = -sign;
    }
    vec![line]
}

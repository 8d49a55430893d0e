// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Lockstep band combination of two rectangle lists.
//!
//! Input and output lists obey the banded form:
//!    - rectangles are grouped into horizontal bands sharing one y-span
//!    - bands are sorted by `y`, vertically disjoint, maximally merged
//!    - within a band, x-spans are sorted and strictly separated
//!
//! [`combine`] walks both inputs one band at a time. Each iteration splits
//! the current y-extent into a strip covered by only one input (handled by
//! [`non_overlap_a`] / [`non_overlap_b`]) and a strip covered by both
//! (handled by [`overlap_band`]); which strips produce output depends on the
//! [`Operation`]. After every strip emission [`coalesce_bands`] folds the new
//! band into its predecessor when the two are contiguous with identical
//! x-spans, which keeps the output maximally merged.
//!
//! Complexity is `O(n + m)` rectangles for all three operations.

use banded_region_core::Coord;
use banded_region_core::geom::Bounds;
use banded_region_core::span::Span;

/// The set operation a [`combine`] walk computes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    Union,
    Intersect,
    Subtract,
}

/// Returns the index one past the band that starts at `start`.
#[inline]
pub(crate) fn band_end<T: Coord>(rects: &[Bounds<T>], start: usize) -> usize {
    let top = rects[start].y().start();
    let mut end = start + 1;
    while end < rects.len() && rects[end].y().start() == top {
        end += 1;
    }
    end
}

/// Computes `a op b` into `out`.
///
/// Both inputs must be in banded form; the output is in banded form. `out`
/// is cleared first, so the caller can reuse one scratch buffer across calls.
pub(crate) fn combine<T: Coord>(
    a: &[Bounds<T>],
    b: &[Bounds<T>],
    op: Operation,
    out: &mut Vec<Bounds<T>>,
) {
    out.clear();
    if a.is_empty() {
        if op == Operation::Union {
            out.extend_from_slice(b);
        }
        return;
    }
    if b.is_empty() {
        if matches!(op, Operation::Union | Operation::Subtract) {
            out.extend_from_slice(a);
        }
        return;
    }
    out.reserve(a.len() + b.len());

    let (mut ia, mut ib) = (0usize, 0usize);
    let mut prev_band = 0usize;
    // the bottom of the lowest strip handled so far
    let mut y_bot = a[0].y().start().min(b[0].y().start());

    while ia < a.len() && ib < b.len() {
        let a_band_end = band_end(a, ia);
        let b_band_end = band_end(b, ib);
        let a_top = a[ia].y().start();
        let b_top = b[ib].y().start();

        // Strip covered by only one input: from the higher band top down to
        // where the other input's band begins.
        let mut cur_band = out.len();
        let y_top;
        if a_top < b_top {
            let top = a_top.max(y_bot);
            let bot = a[ia].y().end().min(b_top);
            if top < bot {
                non_overlap_a(&a[ia..a_band_end], Span::new(top, bot), op, out);
            }
            y_top = b_top;
        } else if b_top < a_top {
            let top = b_top.max(y_bot);
            let bot = b[ib].y().end().min(a_top);
            if top < bot {
                non_overlap_b(&b[ib..b_band_end], Span::new(top, bot), op, out);
            }
            y_top = a_top;
        } else {
            y_top = a_top;
        }
        if out.len() > cur_band {
            prev_band = coalesce_bands(out, prev_band, cur_band);
        }

        // Strip covered by both inputs.
        cur_band = out.len();
        y_bot = a[ia].y().end().min(b[ib].y().end());
        if y_bot > y_top {
            overlap_band(
                &a[ia..a_band_end],
                &b[ib..b_band_end],
                Span::new(y_top, y_bot),
                op,
                out,
            );
        }
        if out.len() > cur_band {
            prev_band = coalesce_bands(out, prev_band, cur_band);
        }

        if a[ia].y().end() == y_bot {
            ia = a_band_end;
        }
        if b[ib].y().end() == y_bot {
            ib = b_band_end;
        }
    }

    // Tail: one input is exhausted. The surviving bands go out whole, with
    // only the first clipped against the last emitted strip.
    let cur_band = out.len();
    if ia < a.len() {
        if matches!(op, Operation::Union | Operation::Subtract) {
            while ia < a.len() {
                let a_band_end = band_end(a, ia);
                let strip = Span::new(a[ia].y().start().max(y_bot), a[ia].y().end());
                non_overlap_a(&a[ia..a_band_end], strip, op, out);
                ia = a_band_end;
            }
        }
    } else if ib < b.len() && op == Operation::Union {
        while ib < b.len() {
            let b_band_end = band_end(b, ib);
            let strip = Span::new(b[ib].y().start().max(y_bot), b[ib].y().end());
            non_overlap_b(&b[ib..b_band_end], strip, op, out);
            ib = b_band_end;
        }
    }
    if out.len() > cur_band {
        coalesce_bands(out, prev_band, cur_band);
    }
}

/// Emits the part of an `a` band not covered by `b`, clipped to `strip`.
///
/// Only Union and Subtract keep material that `b` does not touch.
fn non_overlap_a<T: Coord>(
    band: &[Bounds<T>],
    strip: Span<T>,
    op: Operation,
    out: &mut Vec<Bounds<T>>,
) {
    if op == Operation::Intersect {
        return;
    }
    for r in band {
        out.push(Bounds::new(r.x(), strip));
    }
}

/// Emits the part of a `b` band not covered by `a`, clipped to `strip`.
///
/// Only Union keeps material that exists solely in `b`.
fn non_overlap_b<T: Coord>(
    band: &[Bounds<T>],
    strip: Span<T>,
    op: Operation,
    out: &mut Vec<Bounds<T>>,
) {
    if op != Operation::Union {
        return;
    }
    for r in band {
        out.push(Bounds::new(r.x(), strip));
    }
}

/// Emits one output band for a strip covered by both inputs.
fn overlap_band<T: Coord>(
    a: &[Bounds<T>],
    b: &[Bounds<T>],
    strip: Span<T>,
    op: Operation,
    out: &mut Vec<Bounds<T>>,
) {
    match op {
        Operation::Union => union_overlap(a, b, strip, out),
        Operation::Intersect => intersect_overlap(a, b, strip, out),
        Operation::Subtract => subtract_overlap(a, b, strip, out),
    }
}

/// Appends `x` to the band being built, extending the previous rectangle
/// instead when the two touch or overlap. Rectangles arrive in ascending
/// `x.start` order, so this keeps the band sorted and strictly separated.
#[inline]
fn merge_push<T: Coord>(out: &mut Vec<Bounds<T>>, band_start: usize, x: Span<T>, y: Span<T>) {
    if out.len() > band_start
        && let Some(last) = out.last_mut()
        && last.x().end() >= x.start()
    {
        if x.end() > last.x().end() {
            *last = Bounds::new(Span::new(last.x().start(), x.end()), y);
        }
        return;
    }
    out.push(Bounds::new(x, y));
}

fn union_overlap<T: Coord>(
    a: &[Bounds<T>],
    b: &[Bounds<T>],
    strip: Span<T>,
    out: &mut Vec<Bounds<T>>,
) {
    let band_start = out.len();
    let (mut ia, mut ib) = (0usize, 0usize);
    while ia < a.len() && ib < b.len() {
        if a[ia].x().start() < b[ib].x().start() {
            merge_push(out, band_start, a[ia].x(), strip);
            ia += 1;
        } else {
            merge_push(out, band_start, b[ib].x(), strip);
            ib += 1;
        }
    }
    while ia < a.len() {
        merge_push(out, band_start, a[ia].x(), strip);
        ia += 1;
    }
    while ib < b.len() {
        merge_push(out, band_start, b[ib].x(), strip);
        ib += 1;
    }
}

fn intersect_overlap<T: Coord>(
    a: &[Bounds<T>],
    b: &[Bounds<T>],
    strip: Span<T>,
    out: &mut Vec<Bounds<T>>,
) {
    let (mut ia, mut ib) = (0usize, 0usize);
    while ia < a.len() && ib < b.len() {
        let ax = a[ia].x();
        let bx = b[ib].x();
        if let Some(x) = ax.intersection(&bx) {
            out.push(Bounds::new(x, strip));
        }
        // advance whichever rectangle ends first, both on a tie
        if ax.end() < bx.end() {
            ia += 1;
        } else if bx.end() < ax.end() {
            ib += 1;
        } else {
            ia += 1;
            ib += 1;
        }
    }
}

fn subtract_overlap<T: Coord>(
    a: &[Bounds<T>],
    b: &[Bounds<T>],
    strip: Span<T>,
    out: &mut Vec<Bounds<T>>,
) {
    let (mut ia, mut ib) = (0usize, 0usize);
    // the left edge of the part of a[ia] not yet eaten by b
    let mut left = a[0].x().start();
    while ia < a.len() && ib < b.len() {
        let ax = a[ia].x();
        let bx = b[ib].x();
        if bx.end() <= left {
            // this b rectangle lies entirely behind the edge
            ib += 1;
        } else if bx.start() <= left {
            // b covers the edge; swallow up to its end
            left = bx.end();
            if left >= ax.end() {
                ia += 1;
                if ia < a.len() {
                    left = a[ia].x().start();
                }
            } else {
                ib += 1;
            }
        } else if bx.start() < ax.end() {
            // gap between the edge and b stays in the result
            out.push(Bounds::new(Span::new(left, bx.start()), strip));
            left = bx.end();
            if left >= ax.end() {
                ia += 1;
                if ia < a.len() {
                    left = a[ia].x().start();
                }
            } else {
                ib += 1;
            }
        } else {
            // b starts beyond this a rectangle; keep the remainder
            if ax.end() > left {
                out.push(Bounds::new(Span::new(left, ax.end()), strip));
            }
            ia += 1;
            if ia < a.len() {
                left = a[ia].x().start();
            }
        }
    }
    while ia < a.len() {
        out.push(Bounds::new(Span::new(left, a[ia].x().end()), strip));
        ia += 1;
        if ia < a.len() {
            left = a[ia].x().start();
        }
    }
}

/// Merges the band starting at `cur_band` into the one starting at
/// `prev_band` when both have the same rectangle count, are vertically
/// contiguous, and agree on every x-span. Returns the start of the band the
/// next merge attempt should join onto.
///
/// Anything past the current band (the tail loop appends several bands
/// before its one coalesce call) is left alone and shifts down on a merge.
pub(crate) fn coalesce_bands<T: Coord>(
    rects: &mut Vec<Bounds<T>>,
    prev_band: usize,
    cur_band: usize,
) -> usize {
    let prev_len = cur_band - prev_band;
    if prev_len == 0 || cur_band >= rects.len() {
        return cur_band;
    }
    let cur_end = band_end(rects, cur_band);
    if cur_end - cur_band != prev_len {
        return cur_band;
    }
    if rects[prev_band].y().end() != rects[cur_band].y().start() {
        return cur_band;
    }
    for i in 0..prev_len {
        if rects[prev_band + i].x() != rects[cur_band + i].x() {
            return cur_band;
        }
    }
    let grown = Span::new(rects[prev_band].y().start(), rects[cur_band].y().end());
    for r in &mut rects[prev_band..cur_band] {
        *r = Bounds::new(r.x(), grown);
    }
    rects.drain(cur_band..cur_end);
    prev_band
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(x1: i32, y1: i32, x2: i32, y2: i32) -> Bounds<i32> {
        Bounds::from_corners(x1, y1, x2, y2)
    }

    fn run(a: &[Bounds<i32>], b: &[Bounds<i32>], op: Operation) -> Vec<Bounds<i32>> {
        let mut out = Vec::new();
        combine(a, b, op, &mut out);
        out
    }

    #[test]
    fn band_end_scans_shared_tops() {
        let rects = [bx(0, 0, 2, 5), bx(4, 0, 6, 5), bx(0, 5, 6, 9)];
        assert_eq!(band_end(&rects, 0), 2);
        assert_eq!(band_end(&rects, 2), 3);
    }

    #[test]
    fn union_of_empty_sides() {
        let a = [bx(0, 0, 4, 4)];
        assert_eq!(run(&a, &[], Operation::Union), a.to_vec());
        assert_eq!(run(&[], &a, Operation::Union), a.to_vec());
        assert!(run(&[], &[], Operation::Union).is_empty());
    }

    #[test]
    fn subtract_and_intersect_with_empty_sides() {
        let a = [bx(0, 0, 4, 4)];
        assert_eq!(run(&a, &[], Operation::Subtract), a.to_vec());
        assert!(run(&[], &a, Operation::Subtract).is_empty());
        assert!(run(&a, &[], Operation::Intersect).is_empty());
        assert!(run(&[], &a, Operation::Intersect).is_empty());
    }

    #[test]
    fn union_keeps_disjoint_bands_apart() {
        let out = run(&[bx(0, 0, 10, 10)], &[bx(20, 0, 30, 10)], Operation::Union);
        assert_eq!(out, vec![bx(0, 0, 10, 10), bx(20, 0, 30, 10)]);
    }

    #[test]
    fn union_merges_touching_in_band() {
        let out = run(&[bx(0, 0, 10, 10)], &[bx(10, 0, 20, 10)], Operation::Union);
        assert_eq!(out, vec![bx(0, 0, 20, 10)]);
    }

    #[test]
    fn union_coalesces_stacked_bands() {
        let out = run(&[bx(0, 0, 10, 10)], &[bx(0, 10, 10, 20)], Operation::Union);
        assert_eq!(out, vec![bx(0, 0, 10, 20)]);
    }

    #[test]
    fn union_offset_overlap_produces_three_bands() {
        let out = run(
            &[bx(0, 0, 20, 20)],
            &[bx(10, 10, 30, 30)],
            Operation::Union,
        );
        assert_eq!(
            out,
            vec![
                bx(0, 0, 20, 10),
                bx(0, 10, 30, 20),
                bx(10, 20, 30, 30),
            ]
        );
    }

    #[test]
    fn intersect_clips_to_common_area() {
        let out = run(
            &[bx(0, 0, 20, 20)],
            &[bx(10, 10, 30, 30)],
            Operation::Intersect,
        );
        assert_eq!(out, vec![bx(10, 10, 20, 20)]);
    }

    #[test]
    fn intersect_of_disjoint_is_empty() {
        let out = run(
            &[bx(0, 0, 10, 10)],
            &[bx(10, 0, 20, 10)],
            Operation::Intersect,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn subtract_carves_a_hole_into_three_bands() {
        let out = run(
            &[bx(0, 0, 30, 30)],
            &[bx(10, 10, 20, 20)],
            Operation::Subtract,
        );
        assert_eq!(
            out,
            vec![
                bx(0, 0, 30, 10),
                bx(0, 10, 10, 20),
                bx(20, 10, 30, 20),
                bx(0, 20, 30, 30),
            ]
        );
    }

    #[test]
    fn subtract_splits_within_one_band() {
        let out = run(
            &[bx(0, 0, 30, 10)],
            &[bx(10, 0, 20, 10)],
            Operation::Subtract,
        );
        assert_eq!(out, vec![bx(0, 0, 10, 10), bx(20, 0, 30, 10)]);
    }

    #[test]
    fn subtract_consumes_several_minuend_rects() {
        // one wide subtrahend eats across three separated rects
        let a = [bx(0, 0, 2, 5), bx(4, 0, 6, 5), bx(8, 0, 10, 5)];
        let b = [bx(1, 0, 9, 5)];
        let out = run(&a, &b, Operation::Subtract);
        assert_eq!(out, vec![bx(0, 0, 1, 5), bx(9, 0, 10, 5)]);
    }

    #[test]
    fn subtract_tail_keeps_left_edge() {
        // b ends inside the first a rect; the remainder and the second rect survive
        let a = [bx(0, 0, 6, 5), bx(8, 0, 10, 5)];
        let b = [bx(0, 0, 3, 5)];
        let out = run(&a, &b, Operation::Subtract);
        assert_eq!(out, vec![bx(3, 0, 6, 5), bx(8, 0, 10, 5)]);
    }

    #[test]
    fn coalesce_requires_identical_spans() {
        let mut rects = vec![bx(0, 0, 10, 10), bx(0, 10, 11, 20)];
        assert_eq!(coalesce_bands(&mut rects, 0, 1), 1);
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn coalesce_requires_contiguity() {
        let mut rects = vec![bx(0, 0, 10, 10), bx(0, 11, 10, 20)];
        assert_eq!(coalesce_bands(&mut rects, 0, 1), 1);
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn coalesce_requires_equal_counts() {
        let mut rects = vec![bx(0, 0, 10, 10), bx(0, 10, 4, 20), bx(6, 10, 10, 20)];
        assert_eq!(coalesce_bands(&mut rects, 0, 1), 1);
        assert_eq!(rects.len(), 3);
    }

    #[test]
    fn coalesce_merges_matching_bands() {
        let mut rects = vec![
            bx(0, 0, 4, 10),
            bx(6, 0, 10, 10),
            bx(0, 10, 4, 25),
            bx(6, 10, 10, 25),
        ];
        assert_eq!(coalesce_bands(&mut rects, 0, 2), 0);
        assert_eq!(rects, vec![bx(0, 0, 4, 25), bx(6, 0, 10, 25)]);
    }

    #[test]
    fn tail_band_coalesces_into_last_emitted_band() {
        // b fills the vertical gap in a's first column; the first tail band
        // must merge into the band emitted before the tail even though an
        // unrelated band follows it in the same tail run
        let a = [bx(0, 0, 2, 10), bx(0, 20, 2, 30), bx(5, 40, 9, 50)];
        let b = [bx(0, 10, 2, 20)];
        let out = run(&a, &b, Operation::Union);
        assert_eq!(out, vec![bx(0, 0, 2, 30), bx(5, 40, 9, 50)]);
    }

    #[test]
    fn union_interleaves_bands_of_different_heights() {
        // a has one tall rect, b two short ones to its right
        let a = [bx(0, 0, 2, 30)];
        let b = [bx(5, 0, 7, 10), bx(5, 20, 7, 30)];
        let out = run(&a, &b, Operation::Union);
        assert_eq!(
            out,
            vec![
                bx(0, 0, 2, 10),
                bx(5, 0, 7, 10),
                bx(0, 10, 2, 20),
                bx(0, 20, 2, 30),
                bx(5, 20, 7, 30),
            ]
        );
    }
}

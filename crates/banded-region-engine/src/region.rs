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

//! Region: an arbitrary orthogonal subset of the integer grid.
//!
//! A region is stored as a y-x banded rectangle list (always held):
//!    - every rectangle is non-degenerate
//!    - rectangles are grouped into bands sharing one y-span; bands are
//!      sorted by `y` and vertically disjoint
//!    - within a band, x-spans are sorted and strictly separated (touching
//!      rectangles would be one wider rectangle)
//!    - two vertically contiguous bands never agree on every x-span (they
//!      would be one taller band)
//!    - `extent` is the tight bounding box, `[0, 0) x [0, 0)` when empty
//!
//! The banded form is canonical: two regions covering the same set of grid
//! points store the same rectangle sequence, so `==` is set equality.
//!
//! Every set operation funnels through the band walker in [`crate::combine`],
//! which emits into the region's own scratch buffer; the scratch then becomes
//! the storage. Since no state is shared between regions, two different
//! regions can be mutated concurrently.

use crate::combine::{Operation, band_end, combine};
use banded_region_core::Coord;
use banded_region_core::geom::{Bounds, Rect};
use banded_region_core::mem::DoubleBuf;
use tracing::instrument;

/// An orthogonal planar subset of the integer grid, in y-x banded form.
///
/// Regions are mutated in place by the set operations; the pure `*_of`
/// associated functions build a new region instead. Rectangles handed in or
/// out are half-open: the upper-left grid point is covered, the lower-right
/// one is not. Empty rectangles are ignored everywhere.
///
/// # Examples
///
/// ```
/// use banded_region_core::geom::Rect;
/// use banded_region_engine::Region;
///
/// let mut r: Region<i32> = Region::from_rect(Rect::new(0, 0, 30, 30));
/// r.subtract_rect(Rect::new(10, 10, 10, 10));
/// assert!(r.contains(5, 5));
/// assert!(!r.contains(15, 15));
/// assert_eq!(r.rect_count(), 4);
/// ```
#[derive(Debug)]
pub struct Region<T: Coord = i32> {
    extent: Bounds<T>,
    rects: DoubleBuf<Bounds<T>>,
}

impl<T: Coord> Region<T> {
    /// Creates an empty region.
    #[inline]
    pub fn new() -> Self {
        Self {
            extent: Bounds::empty(),
            rects: DoubleBuf::new(),
        }
    }

    /// Creates a region covering `rect`; an empty rectangle gives an empty
    /// region.
    #[inline]
    pub fn from_rect(rect: Rect<T>) -> Self {
        Self::from_bounds(Bounds::from(rect))
    }

    /// Creates a region covering `bounds`; empty bounds give an empty region.
    #[inline]
    pub fn from_bounds(bounds: Bounds<T>) -> Self {
        let mut region = Self::new();
        region.set_bounds(bounds);
        region
    }

    /// Empties the region. Storage is retained.
    #[inline]
    pub fn clear(&mut self) {
        self.rects.clear();
        self.extent = Bounds::empty();
    }

    /// Returns `true` if the region covers no grid point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rects.current().is_empty()
    }

    /// Returns the number of stored rectangles.
    #[inline]
    pub fn rect_count(&self) -> usize {
        self.rects.current().len()
    }

    /// Returns the tight bounding box, `[0, 0) x [0, 0)` when empty.
    #[inline]
    pub fn extent(&self) -> Bounds<T> {
        self.extent
    }

    /// Returns the stored rectangles in band order.
    #[inline]
    pub fn as_slice(&self) -> &[Bounds<T>] {
        self.rects.current()
    }

    /// Iterates the member rectangles in band-major order: ascending band
    /// `y`, then ascending `x` within a band. The order is stable and
    /// observable.
    #[inline]
    pub fn rects(&self) -> impl Iterator<Item = Rect<T>> + '_ {
        self.rects.current().iter().copied().map(Rect::from)
    }

    /// Makes this region a copy of `other`.
    pub fn copy_from(&mut self, other: &Region<T>) {
        self.rects.seed_from_slice(other.rects.current());
        self.extent = other.extent;
    }

    /// Makes this region cover exactly `rect`; an empty rectangle empties
    /// the region.
    #[inline]
    pub fn set_rect(&mut self, rect: Rect<T>) {
        self.set_bounds(Bounds::from(rect));
    }

    fn set_bounds(&mut self, bounds: Bounds<T>) {
        if bounds.is_empty() {
            self.clear();
            return;
        }
        self.rects.seed_from_slice(core::slice::from_ref(&bounds));
        self.extent = bounds;
    }

    /// Shifts the whole region by `(dx, dy)`.
    ///
    /// Translation preserves order and equality of coordinates, so the
    /// banded form survives untouched.
    pub fn translate(&mut self, dx: T, dy: T) {
        if self.is_empty() {
            return;
        }
        for r in self.rects.current_mut() {
            *r = r.translate(dx, dy);
        }
        self.extent = self.extent.translate(dx, dy);
        debug_assert!(self.is_consistent());
    }

    /// Replaces the region with its extent: a coarser superset in a single
    /// rectangle. The escape hatch for pathological fragmentation.
    pub fn collapse(&mut self) {
        if self.rect_count() <= 1 {
            return;
        }
        let extent = self.extent;
        self.rects.seed_from_slice(core::slice::from_ref(&extent));
        debug_assert!(self.is_consistent());
    }

    /// Returns `true` if the grid point `(x, y)` lies in the region.
    pub fn contains(&self, x: T, y: T) -> bool {
        if self.is_empty() || !self.extent.contains(x, y) {
            return false;
        }
        for r in self.rects.current() {
            if r.y().end() <= y {
                // band above the point
                continue;
            }
            if r.y().start() > y {
                // bands are sorted; no later band reaches back up
                break;
            }
            if r.x().start() > x {
                // within the point's band, x-spans are sorted
                break;
            }
            if r.x().contains(x) {
                return true;
            }
        }
        false
    }

    /// Returns `true` if every grid point of `rect` lies in the region.
    #[inline]
    pub fn contains_rect(&self, rect: Rect<T>) -> bool {
        self.contains_bounds(Bounds::from(rect))
    }

    /// Returns `true` if every grid point of `query` lies in the region.
    ///
    /// An empty query is trivially covered. Otherwise each band overlapping
    /// the query's y-range must hold one rectangle spanning the query's full
    /// x-range (it is a single rectangle, x-spans being strictly separated),
    /// and those bands must tile the y-range without gaps.
    pub fn contains_bounds(&self, query: Bounds<T>) -> bool {
        if query.is_empty() {
            return true;
        }
        if self.is_empty() || !self.extent.contains_bounds(&query) {
            return false;
        }
        let rects = self.rects.current();
        let mut cursor = query.y().start();
        let mut i = 0;
        while i < rects.len() {
            let end = band_end(rects, i);
            let band_y = rects[i].y();
            if band_y.end() <= cursor {
                i = end;
                continue;
            }
            if band_y.start() > cursor {
                // vertical gap inside the query
                return false;
            }
            if !rects[i..end].iter().any(|r| r.x().contains_span(&query.x())) {
                return false;
            }
            cursor = band_y.end();
            if cursor >= query.y().end() {
                return true;
            }
            i = end;
        }
        false
    }

    /// Returns `true` if the region lies entirely inside `rect`.
    pub fn within(&self, rect: Rect<T>) -> bool {
        // subtracting the rectangle leaves nothing iff the extent fits in it
        self.is_empty() || Bounds::from(rect).contains_bounds(&self.extent)
    }

    /// Returns `true` if the two regions share at least one grid point.
    pub fn intersects(&self, other: &Region<T>) -> bool {
        if self.is_empty() || other.is_empty() || !self.extent.overlaps(&other.extent) {
            return false;
        }
        if self.rect_count() == 1 && other.rect_count() == 1 {
            // single rectangles are their own extents
            return true;
        }
        !Region::intersection_of(self, other).is_empty()
    }

    /// Returns `true` if the region shares at least one grid point with
    /// `rect`.
    #[inline]
    pub fn intersects_rect(&self, rect: Rect<T>) -> bool {
        self.intersects(&Region::from_rect(rect))
    }

    /// Adds every grid point of `other` to this region.
    #[instrument(level = "trace", skip_all)]
    pub fn union(&mut self, other: &Region<T>) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.copy_from(other);
            return;
        }
        if self.rect_count() == 1 && self.extent.contains_bounds(&other.extent) {
            return;
        }
        if other.rect_count() == 1 && other.extent.contains_bounds(&self.extent) {
            self.copy_from(other);
            return;
        }
        self.apply(other.rects.current(), Operation::Union);
    }

    /// Adds every grid point of `rect` to this region.
    pub fn union_rect(&mut self, rect: Rect<T>) {
        let bounds = Bounds::from(rect);
        if bounds.is_empty() {
            return;
        }
        if self.is_empty() || bounds.contains_bounds(&self.extent) {
            self.set_bounds(bounds);
            return;
        }
        if self.rect_count() == 1 && self.extent.contains_bounds(&bounds) {
            return;
        }
        self.apply(core::slice::from_ref(&bounds), Operation::Union);
    }

    /// Keeps only the grid points shared with `other`.
    #[instrument(level = "trace", skip_all)]
    pub fn intersect(&mut self, other: &Region<T>) {
        if self.is_empty() {
            return;
        }
        if other.is_empty() || !self.extent.overlaps(&other.extent) {
            self.clear();
            return;
        }
        self.apply(other.rects.current(), Operation::Intersect);
    }

    /// Keeps only the grid points shared with `rect`.
    pub fn intersect_rect(&mut self, rect: Rect<T>) {
        if self.is_empty() {
            return;
        }
        let bounds = Bounds::from(rect);
        if bounds.is_empty() || !self.extent.overlaps(&bounds) {
            self.clear();
            return;
        }
        self.apply(core::slice::from_ref(&bounds), Operation::Intersect);
    }

    /// Removes every grid point of `other` from this region.
    #[instrument(level = "trace", skip_all)]
    pub fn subtract(&mut self, other: &Region<T>) {
        if self.is_empty() || other.is_empty() || !self.extent.overlaps(&other.extent) {
            return;
        }
        self.apply(other.rects.current(), Operation::Subtract);
    }

    /// Removes every grid point of `rect` from this region.
    pub fn subtract_rect(&mut self, rect: Rect<T>) {
        let bounds = Bounds::from(rect);
        if self.is_empty() || bounds.is_empty() || !self.extent.overlaps(&bounds) {
            return;
        }
        self.apply(core::slice::from_ref(&bounds), Operation::Subtract);
    }

    /// Keeps the grid points covered by exactly one of this region and
    /// `other`.
    #[instrument(level = "trace", skip_all)]
    pub fn xor(&mut self, other: &Region<T>) {
        let mut only_other = other.clone();
        only_other.subtract(self);
        self.subtract(other);
        self.union(&only_other);
    }

    /// Keeps the grid points covered by exactly one of this region and
    /// `rect`.
    pub fn xor_rect(&mut self, rect: Rect<T>) {
        self.xor(&Region::from_rect(rect));
    }

    /// Returns `a ∪ b` as a new region.
    pub fn union_of(a: &Region<T>, b: &Region<T>) -> Region<T> {
        let mut result = a.clone();
        result.union(b);
        result
    }

    /// Returns `a ∩ b` as a new region.
    pub fn intersection_of(a: &Region<T>, b: &Region<T>) -> Region<T> {
        let mut result = a.clone();
        result.intersect(b);
        result
    }

    /// Returns `a − b` as a new region.
    pub fn difference_of(a: &Region<T>, b: &Region<T>) -> Region<T> {
        let mut result = a.clone();
        result.subtract(b);
        result
    }

    /// Returns `a ⊕ b` as a new region.
    pub fn xor_of(a: &Region<T>, b: &Region<T>) -> Region<T> {
        let mut result = a.clone();
        result.xor(b);
        result
    }

    /// Runs one band walk against `other` and swaps the result in.
    fn apply(&mut self, other: &[Bounds<T>], op: Operation) {
        self.rects
            .step(|current, scratch| combine(current, other, op, scratch));
        self.update_extent();
        debug_assert!(self.is_consistent());
    }

    fn update_extent(&mut self) {
        let mut iter = self.rects.current().iter();
        self.extent = match iter.next() {
            None => Bounds::empty(),
            Some(first) => iter.fold(*first, |hull, r| hull.hull(r)),
        };
    }

    /// Exhaustive structural check of the banded form. Debug builds only;
    /// the release stub always passes.
    #[cfg(debug_assertions)]
    fn is_consistent(&self) -> bool {
        let rects = self.rects.current();
        if rects.is_empty() {
            return self.extent == Bounds::empty();
        }
        let mut hull = rects[0];
        let mut i = 0;
        while i < rects.len() {
            let end = band_end(rects, i);
            let band_y = rects[i].y();
            if band_y.is_empty() {
                return false;
            }
            for r in &rects[i..end] {
                if r.y() != band_y || r.x().is_empty() {
                    return false;
                }
                hull = hull.hull(r);
            }
            for pair in rects[i..end].windows(2) {
                if pair[0].x().end() >= pair[1].x().start() {
                    return false;
                }
            }
            if end < rects.len() {
                let next_y = rects[end].y();
                if next_y.start() < band_y.end() {
                    return false;
                }
                let next_end = band_end(rects, end);
                if next_y.start() == band_y.end()
                    && next_end - end == end - i
                    && (0..end - i).all(|k| rects[i + k].x() == rects[end + k].x())
                {
                    // adjacent bands left unmerged
                    return false;
                }
            }
            i = end;
        }
        self.extent == hull
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    fn is_consistent(&self) -> bool {
        true
    }
}

impl<T: Coord> Default for Region<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Coord> Clone for Region<T> {
    /// Deep copy of the member rectangles; the scratch side is never shared.
    fn clone(&self) -> Self {
        let mut rects = DoubleBuf::with_capacity(self.rect_count());
        rects.seed_from_slice(self.rects.current());
        Self {
            extent: self.extent,
            rects,
        }
    }
}

impl<T: Coord> PartialEq for Region<T> {
    /// Structural equality: identical extents and rectangle sequences.
    /// The banded form is canonical, so this is also set equality.
    fn eq(&self, other: &Self) -> bool {
        self.extent == other.extent && self.rects.current() == other.rects.current()
    }
}

impl<T: Coord> Eq for Region<T> {}

impl<T: Coord> From<Rect<T>> for Region<T> {
    #[inline]
    fn from(rect: Rect<T>) -> Self {
        Self::from_rect(rect)
    }
}

impl<T: Coord> From<Bounds<T>> for Region<T> {
    #[inline]
    fn from(bounds: Bounds<T>) -> Self {
        Self::from_bounds(bounds)
    }
}

impl<T: Coord> Extend<Rect<T>> for Region<T> {
    fn extend<I: IntoIterator<Item = Rect<T>>>(&mut self, iter: I) {
        for rect in iter {
            self.union_rect(rect);
        }
    }
}

impl<T: Coord> FromIterator<Rect<T>> for Region<T> {
    fn from_iter<I: IntoIterator<Item = Rect<T>>>(iter: I) -> Self {
        let mut region = Self::new();
        region.extend(iter);
        region
    }
}

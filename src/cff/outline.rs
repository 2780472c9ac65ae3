//! An allocating outline sink.

use std::vec::Vec;

use crate::{Matrix, OutlineBuilder};

/// An outline point.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    /// `false` for a cubic control point.
    pub on_curve: bool,
}

impl Point {
    #[inline]
    fn on(x: f32, y: f32) -> Self {
        Point { x, y, on_curve: true }
    }

    #[inline]
    fn off(x: f32, y: f32) -> Self {
        Point { x, y, on_curve: false }
    }
}

/// A reusable [`OutlineBuilder`] that collects contours of
/// on/off-curve points.
///
/// The interpreter itself never allocates; this sink is for callers
/// that want a concrete outline instead of streaming segments.
#[derive(Clone, Default, Debug)]
pub struct Outline {
    points: Vec<Point>,
    // Exclusive end index of each closed contour.
    contours: Vec<usize>,
    contour_start: usize,
}

impl Outline {
    pub fn new() -> Self {
        Outline::default()
    }

    /// Clears the outline, keeping the allocated buffers.
    pub fn clear(&mut self) {
        self.points.clear();
        self.contours.clear();
        self.contour_start = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn number_of_contours(&self) -> usize {
        self.contours.len()
    }

    /// Returns all points of all closed contours.
    pub fn points(&self) -> &[Point] {
        let end = self.contours.last().copied().unwrap_or(0);
        &self.points[..end]
    }

    /// Returns the points of one contour.
    pub fn contour(&self, index: usize) -> Option<&[Point]> {
        let end = *self.contours.get(index)?;
        let start = if index == 0 { 0 } else { self.contours[index - 1] };
        self.points.get(start..end)
    }

    /// Returns an iterator over contours.
    pub fn contours(&self) -> impl Iterator<Item = &[Point]> {
        (0..self.contours.len()).filter_map(move |i| self.contour(i))
    }

    /// Applies a font matrix to every point.
    ///
    /// The matrix is defined in design space, so it must be applied
    /// before any device-space [`scale`](Self::scale).
    pub fn transform(&mut self, matrix: Matrix) {
        for p in &mut self.points {
            let x = p.x;
            let y = p.y;
            p.x = matrix.sx * x + matrix.ky * y + matrix.tx;
            p.y = matrix.kx * x + matrix.sy * y + matrix.ty;
        }
    }

    /// Scales every point.
    pub fn scale(&mut self, x_scale: f32, y_scale: f32) {
        for p in &mut self.points {
            p.x *= x_scale;
            p.y *= y_scale;
        }
    }

    fn close_contour(&mut self) {
        // A final on-curve point coincident with the contour start is
        // redundant. A coincident *off*-curve point still shapes the
        // closing segment and must stay.
        if self.points.len() - self.contour_start > 1 {
            let first = self.points[self.contour_start];
            let last = self.points[self.points.len() - 1];
            if last.on_curve && last.x == first.x && last.y == first.y {
                self.points.pop();
            }
        }

        self.contours.push(self.points.len());
        self.contour_start = self.points.len();
    }
}

impl OutlineBuilder for Outline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.contour_start = self.points.len();
        self.points.push(Point::on(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.points.push(Point::on(x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.points.push(Point::off(x1, y1));
        self.points.push(Point::off(x2, y2));
        self.points.push(Point::on(x, y));
    }

    fn close(&mut self) {
        self.close_contour();
    }
}

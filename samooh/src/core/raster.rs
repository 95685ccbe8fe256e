//! Bresenham line rasterization.
//!
//! Produces every integer cell touched by the segment between two integer
//! endpoints, both endpoints included:
//!
//! ```text
//! From (0,0) to (-5,3):
//!
//!  3 ●
//!  2   ● ●
//!  1       ● ●
//!  0           ●
//!   -5-4-3-2-1 0
//! ```
//!
//! The error term uses the symmetric `dx + dy` form (with `dy` negated), which
//! steps x and y in the same iteration on diagonals. Ties in the error term
//! would pick different cells depending on direction, so every line is walked
//! from its lexicographically smaller endpoint. A line given the other way
//! round is replayed backwards, so cells are still emitted from start to end
//! and both directions cover the same cells.

use std::iter::Rev;
use std::vec::IntoIter;

/// Bresenham's line algorithm iterator.
///
/// Integer-only. Allocates only for lines whose start is the larger endpoint.
#[derive(Debug, Clone)]
pub struct BresenhamLine {
    cells: Cells,
}

#[derive(Debug, Clone)]
enum Cells {
    Forward(Walk),
    Backward(Rev<IntoIter<(i32, i32)>>),
}

impl BresenhamLine {
    /// Create a line iterator from `(x0, y0)` to `(x1, y1)`.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let cells = if (x1, y1) < (x0, y0) {
            let walked: Vec<_> = Walk::new(x1, y1, x0, y0).collect();
            Cells::Backward(walked.into_iter().rev())
        } else {
            Cells::Forward(Walk::new(x0, y0, x1, y1))
        };
        Self { cells }
    }
}

impl Iterator for BresenhamLine {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.cells {
            Cells::Forward(walk) => walk.next(),
            Cells::Backward(cells) => cells.next(),
        }
    }
}

/// Plain Bresenham walk. Arithmetic is widened so any pair of `i32`
/// endpoints is safe.
#[derive(Debug, Clone)]
struct Walk {
    x: i64,
    y: i64,
    end_x: i64,
    end_y: i64,
    dx: i64,
    dy: i64,
    step_x: i64,
    step_y: i64,
    error: i64,
    done: bool,
}

impl Walk {
    fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();

        Self {
            x: x0,
            y: y0,
            end_x: x1,
            end_y: y1,
            dx,
            dy,
            step_x: if x0 > x1 { -1 } else { 1 },
            step_y: if y0 > y1 { -1 } else { 1 },
            error: dx + dy,
            done: false,
        }
    }
}

impl Iterator for Walk {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // The walk stays between its two i32 endpoints
        let current = (self.x as i32, self.y as i32);

        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(current);
        }

        let e2 = 2 * self.error;

        if e2 >= self.dy {
            if self.x == self.end_x {
                self.done = true;
                return Some(current);
            }
            self.error += self.dy;
            self.x += self.step_x;
        }

        if e2 <= self.dx {
            if self.y == self.end_y {
                self.done = true;
                return Some(current);
            }
            self.error += self.dx;
            self.y += self.step_y;
        }

        Some(current)
    }
}

/// Collect all cells on the line from `(x0, y0)` to `(x1, y1)`.
pub fn rasterize_line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    BresenhamLine::new(x0, y0, x1, y1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn as_set(points: &[(i32, i32)]) -> HashSet<(i32, i32)> {
        points.iter().copied().collect()
    }

    /// Compare against the expected cells, accepting either emission order.
    fn assert_line(expected: &[(i32, i32)], x0: i32, y0: i32, x1: i32, y1: i32) {
        let actual = rasterize_line(x0, y0, x1, y1);
        let reversed: Vec<_> = expected.iter().rev().copied().collect();
        assert!(
            actual == expected || actual == reversed,
            "expected {:?} (either order), got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_diagonal() {
        assert_line(&[(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)], 0, 0, 4, 4);
    }

    #[test]
    fn test_negative_diagonal() {
        assert_line(&[(0, 0), (-1, -1), (-2, -2), (-3, -3), (-4, -4)], 0, 0, -4, -4);
    }

    #[test]
    fn test_shallow_negative_x() {
        assert_line(
            &[(0, 0), (-1, 1), (-2, 1), (-3, 2), (-4, 2), (-5, 3)],
            0,
            0,
            -5,
            3,
        );
    }

    #[test]
    fn test_horizontal_and_vertical() {
        let cells = rasterize_line(0, 0, 5, 0);
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|&(_, y)| y == 0));

        let cells = rasterize_line(3, 7, 3, 2);
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|&(x, _)| x == 3));
    }

    #[test]
    fn test_single_point() {
        assert_eq!(rasterize_line(4, -2, 4, -2), vec![(4, -2)]);
    }

    #[test]
    fn test_endpoints_included() {
        let cells = rasterize_line(2, -1, 9, 2);
        assert_eq!(cells.first(), Some(&(2, -1)));
        assert_eq!(cells.last(), Some(&(9, 2)));
    }

    #[test]
    fn test_symmetry() {
        for x0 in -6..=6 {
            for y0 in -6..=6 {
                for x1 in -6..=6 {
                    for y1 in -6..=6 {
                        let forward = rasterize_line(x0, y0, x1, y1);
                        let backward = rasterize_line(x1, y1, x0, y0);
                        assert_eq!(
                            as_set(&forward),
                            as_set(&backward),
                            "line ({}, {}) -> ({}, {}) not symmetric",
                            x0,
                            y0,
                            x1,
                            y1
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_tie_steps_match_both_ways() {
        // The middle cell is a tie between (1, 0) and (1, 1)
        assert_eq!(rasterize_line(0, 0, 2, 1), vec![(0, 0), (1, 1), (2, 1)]);
        assert_eq!(rasterize_line(2, 1, 0, 0), vec![(2, 1), (1, 1), (0, 0)]);
    }

    #[test]
    fn test_reversed_line_runs_start_to_end() {
        for (x0, y0, x1, y1) in [(5, 3, -2, 0), (0, 4, 0, -4), (3, -6, -3, 6)] {
            let cells = rasterize_line(x0, y0, x1, y1);
            assert_eq!(cells.first(), Some(&(x0, y0)));
            assert_eq!(cells.last(), Some(&(x1, y1)));
        }
    }

    #[test]
    fn test_extreme_endpoints_do_not_overflow() {
        let mut line = BresenhamLine::new(i32::MIN, 0, i32::MAX, 1);
        assert_eq!(line.next(), Some((i32::MIN, 0)));
        assert_eq!(line.next(), Some((i32::MIN + 1, 0)));
    }

    #[test]
    fn test_known_shallow_line() {
        let expected = [
            (2, -1),
            (3, -1),
            (4, 0),
            (5, 0),
            (6, 1),
            (7, 1),
            (8, 2),
            (9, 2),
        ];
        assert_eq!(rasterize_line(2, -1, 9, 2), expected);
    }

    #[test]
    fn test_no_gaps() {
        // Consecutive cells are 8-connected
        let cells = rasterize_line(-13, 4, 21, -9);
        for pair in cells.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!((a.0 - b.0).abs() <= 1 && (a.1 - b.1).abs() <= 1);
        }
    }

    #[test]
    fn test_iterator_is_restartable() {
        let line = BresenhamLine::new(0, 0, 6, 2);
        let first: Vec<_> = line.clone().collect();
        let second: Vec<_> = line.collect();
        assert_eq!(first, second);
    }
}

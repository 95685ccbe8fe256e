//! 2D rotation helpers.
//!
//! Angles are integer degrees everywhere in the fusion core, counter-clockwise
//! positive. A heading of 90° means the robot faces map +Y.

/// Rotate `(x, y)` about the origin by `theta_deg` degrees.
///
/// # Example
/// ```
/// use samooh::core::math::rotate;
///
/// let (x, y) = rotate(10.0, 0.0, 90.0);
/// assert!(x.abs() < 1e-9);
/// assert!((y - 10.0).abs() < 1e-9);
/// ```
#[inline]
pub fn rotate(x: f64, y: f64, theta_deg: f64) -> (f64, f64) {
    let (sin_t, cos_t) = theta_deg.to_radians().sin_cos();
    (x * cos_t - y * sin_t, x * sin_t + y * cos_t)
}

/// Rotate integer coordinates and truncate the result toward zero.
///
/// Pose integration and command translation use truncation so that the two
/// directions stay algebraic inverses up to one unit.
#[inline]
pub fn rotate_truncated(x: i32, y: i32, theta_deg: i32) -> (i32, i32) {
    let (rx, ry) = rotate(x as f64, y as f64, theta_deg as f64);
    (rx as i32, ry as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotate_zero_is_identity() {
        let (x, y) = rotate(12.5, -7.0, 0.0);
        assert_relative_eq!(x, 12.5);
        assert_relative_eq!(y, -7.0);
    }

    #[test]
    fn test_rotate_quarter_turn_faces_positive_y() {
        // Forward (+x) at heading 90° points along map +Y
        let (x, y) = rotate(100.0, 0.0, 90.0);
        assert_relative_eq!(x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(y, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_half_turn() {
        let (x, y) = rotate(3.0, 4.0, 180.0);
        assert_relative_eq!(x, -3.0, epsilon = 1e-9);
        assert_relative_eq!(y, -4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_negative_angle_is_inverse() {
        let (x, y) = rotate(31.0, -17.0, 37.0);
        let (bx, by) = rotate(x, y, -37.0);
        assert_relative_eq!(bx, 31.0, epsilon = 1e-9);
        assert_relative_eq!(by, -17.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_preserves_length() {
        let (x, y) = rotate(30.0, 40.0, 123.0);
        assert_relative_eq!((x * x + y * y).sqrt(), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_truncated_toward_zero() {
        // 45° rotation of (10, 0) is (7.07, 7.07)
        assert_eq!(rotate_truncated(10, 0, 45), (7, 7));
        assert_eq!(rotate_truncated(-10, 0, 45), (-7, -7));
    }
}

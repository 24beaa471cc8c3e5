//! Geographic extents and their normalization into the canonical longitude range.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Full longitudinal span of the globe in degrees.
pub const WORLD_WIDTH: f64 = 360.0;

/// Largest left edge still considered in range.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Errors that can occur while normalizing an extent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtentError {
    #[error("left edge {x} is too large to be wrapped into [-180, 180]")]
    ValueTooLarge { x: f64 },
    #[error("left edge is NaN and cannot be wrapped")]
    NotANumber,
}

/// An axis-aligned geographic box anchored at its top-left corner.
///
/// `x` is the left edge and `y` the top edge, both in degrees. The box
/// extends `width` degrees east and `height` degrees south of that corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Returns whether the right edge lies east of the antimeridian.
    pub fn crosses_dateline(&self) -> bool {
        self.max_x() > MAX_LONGITUDE
    }

    /// Returns a copy whose left edge lies in [-180, 180] and whose width is
    /// at most 360 degrees.
    ///
    /// A box wider than the globe is shrunk to 360 degrees around its
    /// horizontal center, keeping its aspect ratio. The vertical offset of
    /// that shrink is subtracted from `y` while the horizontal one is added
    /// to `x`; callers depend on that pinning, keep both signs as they are.
    pub fn normalized(&self) -> Result<Extent, ExtentError> {
        let mut ret = *self;

        if ret.width > WORLD_WIDTH {
            let old_width = ret.width;
            let old_height = ret.height;

            ret.width = WORLD_WIDTH;
            ret.height *= WORLD_WIDTH / old_width;

            let x_offset = (old_width - ret.width) / 2.0;
            let y_offset = (old_height - ret.height) / 2.0;
            ret.x += x_offset;
            ret.y -= y_offset;
        }

        if ret.x.is_nan() {
            return Err(ExtentError::NotANumber);
        }

        if ret.x.abs() > MAX_LONGITUDE {
            if ret.x + WORLD_WIDTH == ret.x || ret.x - WORLD_WIDTH == ret.x {
                return Err(ExtentError::ValueTooLarge { x: self.x });
            }
            // Skip whole turns at once; the loops below settle any rounding.
            let turns = ((ret.x.abs() - MAX_LONGITUDE) / WORLD_WIDTH).ceil();
            ret.x -= ret.x.signum() * turns * WORLD_WIDTH;
        }

        while ret.x < -MAX_LONGITUDE {
            let next = ret.x + WORLD_WIDTH;
            if next == ret.x {
                return Err(ExtentError::ValueTooLarge { x: self.x });
            }
            ret.x = next;
        }

        while ret.x > MAX_LONGITUDE {
            let next = ret.x - WORLD_WIDTH;
            if next == ret.x {
                return Err(ExtentError::ValueTooLarge { x: self.x });
            }
            ret.x = next;
        }

        Ok(ret)
    }
}

/// Free-function form of [`Extent::normalized`].
pub fn normalize(extent: &Extent) -> Result<Extent, ExtentError> {
    extent.normalized()
}

/// Free-function form of [`Extent::crosses_dateline`].
pub fn crosses_dateline(extent: &Extent) -> bool {
    extent.crosses_dateline()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn samples() -> Vec<Extent> {
        let mut out = Vec::new();
        for x in [-1234.5, -540.0, -200.0, -180.0, -10.0, 0.0, 170.0, 180.0, 181.0, 725.25] {
            for width in [0.0, 20.0, 359.0, 360.0, 361.0, 720.0, 5000.0] {
                out.push(Extent::new(x, 45.0, width, width / 2.0 + 1.0));
            }
        }
        out
    }

    #[test]
    fn test_in_range_extent_is_unchanged() {
        for x in [-180.0, -90.5, 0.0, 179.9, 180.0] {
            for width in [0.0, 1.0, 200.0, 360.0] {
                let extent = Extent::new(x, 10.0, width, 5.0);
                assert_eq!(extent.normalized().unwrap(), extent);
            }
        }
    }

    #[test]
    fn test_crossing_extent_keeps_position() {
        let extent = Extent::new(170.0, 0.0, 20.0, 10.0);
        assert!(crosses_dateline(&extent));
        assert_eq!(extent.max_x(), 190.0);

        let normalized = normalize(&extent).unwrap();
        assert_eq!(normalized.x, 170.0);
        assert_eq!(normalized.width, 20.0);
    }

    #[test]
    fn test_wraps_left_edge_once() {
        let normalized = Extent::new(-200.0, 0.0, 10.0, 10.0).normalized().unwrap();
        assert_eq!(normalized.x, 160.0);
        assert_eq!(normalized.width, 10.0);
        assert_eq!(normalized.height, 10.0);
    }

    #[test]
    fn test_wraps_left_edge_many_times() {
        let normalized = Extent::new(1000.0, 0.0, 10.0, 10.0).normalized().unwrap();
        assert!((normalized.x - (-80.0)).abs() < EPS);

        let normalized = Extent::new(-1000.0, 0.0, 10.0, 10.0).normalized().unwrap();
        assert!((normalized.x - 80.0).abs() < EPS);
    }

    #[test]
    fn test_overly_wide_extent_is_shrunk() {
        let extent = Extent::new(0.0, 0.0, 720.0, 100.0);
        let normalized = extent.normalized().unwrap();

        assert_eq!(normalized.width, 360.0);
        assert_eq!(normalized.height, 50.0);
        // shifted right by half the removed width, which lands exactly on the boundary
        assert_eq!(normalized.x, 180.0);
        // shifted down, not up
        assert_eq!(normalized.y, -25.0);
        // input left untouched
        assert_eq!(extent.width, 720.0);
    }

    #[test]
    fn test_width_of_exactly_360_is_not_scaled() {
        let extent = Extent::new(-180.0, 90.0, 360.0, 180.0);
        assert_eq!(extent.normalized().unwrap(), extent);
    }

    #[test]
    fn test_aspect_ratio_is_preserved() {
        for extent in samples().into_iter().filter(|e| e.width > WORLD_WIDTH) {
            let normalized = extent.normalized().unwrap();
            assert_eq!(normalized.width, WORLD_WIDTH);
            let before = extent.height / extent.width;
            let after = normalized.height / normalized.width;
            assert!((before - after).abs() < EPS, "{extent:?} -> {normalized:?}");
        }
    }

    #[test]
    fn test_left_edge_always_in_range() {
        for extent in samples() {
            let normalized = extent.normalized().unwrap();
            assert!(
                (-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&normalized.x),
                "{extent:?} -> {normalized:?}"
            );
            assert!(normalized.width <= WORLD_WIDTH);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for extent in samples() {
            let once = extent.normalized().unwrap();
            let twice = once.normalized().unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_crosses_dateline_matches_right_edge() {
        for extent in samples() {
            assert_eq!(extent.crosses_dateline(), extent.x + extent.width > 180.0);
        }
        assert!(!Extent::new(170.0, 0.0, 10.0, 1.0).crosses_dateline());
    }

    #[test]
    fn test_huge_values_fail() {
        let err = Extent::new(1e300, 0.0, 10.0, 10.0).normalized().unwrap_err();
        assert_eq!(err, ExtentError::ValueTooLarge { x: 1e300 });

        let err = Extent::new(f64::NEG_INFINITY, 0.0, 10.0, 10.0)
            .normalized()
            .unwrap_err();
        assert!(matches!(err, ExtentError::ValueTooLarge { .. }));
    }

    #[test]
    fn test_large_finite_values_wrap_in_one_jump() {
        let started = std::time::Instant::now();
        let normalized = Extent::new(1e15, 0.0, 10.0, 10.0).normalized().unwrap();
        assert_eq!(normalized.x, -80.0);

        let normalized = Extent::new(-1e15 - 20.0, 0.0, 10.0, 10.0).normalized().unwrap();
        assert_eq!(normalized.x, 60.0);

        let normalized = Extent::new(1e17, 0.0, 10.0, 10.0).normalized().unwrap();
        assert!((-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&normalized.x));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_nan_fails() {
        let err = Extent::new(f64::NAN, 0.0, 10.0, 10.0).normalized().unwrap_err();
        assert_eq!(err, ExtentError::NotANumber);
    }

    #[test]
    fn test_degenerate_sizes_pass_through() {
        let extent = Extent::new(10.0, 10.0, -5.0, 0.0);
        assert_eq!(extent.normalized().unwrap(), extent);
    }
}

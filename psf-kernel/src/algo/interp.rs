//! One-dimensional piecewise-linear interpolation.
//!
//! The radial PSF profile is sampled on a strictly increasing grid and then
//! evaluated at many pixel radii, one axial plane after another. [`LinearGrid`]
//! validates the abscissae once and hands out [`Bracket`]s that can be reused
//! for every plane. Queries outside the sampled range are errors, never clamped
//! or extrapolated.

use thiserror::Error;

/// Errors that can occur during interpolation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpError {
    #[error("Value {0} is out of bounds for interpolation range [{1}, {2}]")]
    OutOfBounds(f64, f64, f64),
    #[error("Input vectors must have at least 2 points")]
    InsufficientData,
    #[error("Input vectors must have the same length")]
    MismatchedLengths,
    #[error("X values must be sorted in ascending order")]
    UnsortedData,
}

/// Position of a query point between two neighbouring samples.
///
/// The interpolated value is `ys[lower] + weight * (ys[lower + 1] - ys[lower])`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: usize,
    pub weight: f64,
}

impl Bracket {
    /// Evaluate the bracket against a set of ordinates.
    ///
    /// `ys` must have the same length as the grid that produced the bracket.
    pub fn apply(&self, ys: &[f64]) -> f64 {
        let y1 = ys[self.lower];
        if self.weight == 0.0 {
            return y1;
        }
        let y2 = ys[self.lower + 1];
        y1 + self.weight * (y2 - y1)
    }
}

/// A validated, strictly increasing interpolation grid.
#[derive(Debug, Clone, Copy)]
pub struct LinearGrid<'a> {
    xs: &'a [f64],
}

impl<'a> LinearGrid<'a> {
    /// Validate the abscissae.
    ///
    /// # Errors
    ///
    /// * `InterpError::InsufficientData` - Less than 2 points
    /// * `InterpError::UnsortedData` - Points are not strictly ascending
    pub fn new(xs: &'a [f64]) -> Result<Self, InterpError> {
        if xs.len() < 2 {
            return Err(InterpError::InsufficientData);
        }

        if xs.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(InterpError::UnsortedData);
        }

        Ok(Self { xs })
    }

    /// Smallest and largest abscissa.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Find the interval holding `x` using binary search (O(log n)).
    pub fn locate(&self, x: f64) -> Result<Bracket, InterpError> {
        let (min_x, max_x) = self.domain();
        if !(min_x..=max_x).contains(&x) {
            return Err(InterpError::OutOfBounds(x, min_x, max_x));
        }

        let idx = match self.xs.binary_search_by(|sample| sample.total_cmp(&x)) {
            Ok(exact_idx) => {
                return Ok(Bracket {
                    lower: exact_idx,
                    weight: 0.0,
                })
            }
            Err(insert_idx) => insert_idx,
        };

        let x1 = self.xs[idx - 1];
        let x2 = self.xs[idx];
        Ok(Bracket {
            lower: idx - 1,
            weight: (x - x1) / (x2 - x1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, InterpError> {
        Ok(LinearGrid::new(xs)?.locate(x)?.apply(ys))
    }

    #[test]
    fn test_exact_match() {
        let xs = vec![1.0, 2.0, 3.0, 4.0];
        let ys = vec![10.0, 20.0, 30.0, 40.0];
        assert_eq!(eval(2.0, &xs, &ys).unwrap(), 20.0);
        assert_eq!(eval(4.0, &xs, &ys).unwrap(), 40.0);
    }

    #[test]
    fn test_linear_interpolation() {
        let xs = vec![1.0, 2.0, 3.0];
        let ys = vec![10.0, 20.0, 30.0];
        assert_eq!(eval(1.5, &xs, &ys).unwrap(), 15.0);
        assert_eq!(eval(2.5, &xs, &ys).unwrap(), 25.0);
    }

    #[test]
    fn test_out_of_bounds() {
        let xs = vec![1.0, 2.0, 3.0];
        let grid = LinearGrid::new(&xs).unwrap();
        assert!(matches!(
            grid.locate(0.5),
            Err(InterpError::OutOfBounds(_, _, _))
        ));
        assert!(matches!(
            grid.locate(3.5),
            Err(InterpError::OutOfBounds(_, _, _))
        ));
    }

    #[test]
    fn test_nan_is_out_of_bounds() {
        let xs = vec![0.0, 1.0];
        let grid = LinearGrid::new(&xs).unwrap();
        assert!(matches!(
            grid.locate(f64::NAN),
            Err(InterpError::OutOfBounds(_, _, _))
        ));
    }

    #[test]
    fn test_insufficient_data() {
        assert!(matches!(
            LinearGrid::new(&[1.0]),
            Err(InterpError::InsufficientData)
        ));
    }

    #[test]
    fn test_unsorted_data() {
        assert!(matches!(
            LinearGrid::new(&[2.0, 1.0, 3.0]),
            Err(InterpError::UnsortedData)
        ));
        assert!(matches!(
            LinearGrid::new(&[1.0, 1.0, 3.0]),
            Err(InterpError::UnsortedData)
        ));
    }

    #[test]
    fn test_domain() {
        let xs = vec![0.5, 1.0, 4.0];
        assert_eq!(LinearGrid::new(&xs).unwrap().domain(), (0.5, 4.0));
    }

    #[test]
    fn test_bracket_reused_across_ordinates() {
        let xs = vec![0.0, 0.5, 1.0];
        let grid = LinearGrid::new(&xs).unwrap();
        let bracket = grid.locate(0.75).unwrap();

        assert_eq!(bracket.lower, 1);
        assert_eq!(bracket.apply(&[0.0, 1.0, 3.0]), 2.0);
        assert_eq!(bracket.apply(&[4.0, 2.0, 0.0]), 1.0);
    }
}

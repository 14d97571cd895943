/// Absolute tolerance used by [`EqualOptions::default`].
pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-5;

/// Knobs of approximate array comparison.
///
/// ```
/// use quiver_array::EqualOptions;
///
/// let opts = EqualOptions::default()
///     .with_abs_tolerance(1e-3)
///     .with_nans_equal(true);
/// assert!(opts.nans_equal());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EqualOptions {
    abs_tolerance: f64,
    nans_equal: bool,
    unordered_map_keys: bool,
}

impl Default for EqualOptions {
    fn default() -> Self {
        EqualOptions {
            abs_tolerance: DEFAULT_ABS_TOLERANCE,
            nans_equal: false,
            unordered_map_keys: false,
        }
    }
}

impl EqualOptions {
    /// Options of exact comparison: floats must be equal and NaN never is.
    pub(crate) fn exact() -> EqualOptions {
        EqualOptions {
            abs_tolerance: 0.0,
            nans_equal: false,
            unordered_map_keys: false,
        }
    }

    /// Largest absolute difference at which two floats still compare equal.
    pub fn with_abs_tolerance(mut self, abs_tolerance: f64) -> Self {
        self.abs_tolerance = abs_tolerance;
        self
    }

    /// Whether two NaNs compare equal.
    pub fn with_nans_equal(mut self, nans_equal: bool) -> Self {
        self.nans_equal = nans_equal;
        self
    }

    /// Whether map entries are matched regardless of their order within a
    /// map slot.
    pub fn with_unordered_map_keys(mut self, unordered_map_keys: bool) -> Self {
        self.unordered_map_keys = unordered_map_keys;
        self
    }

    pub fn abs_tolerance(&self) -> f64 {
        self.abs_tolerance
    }

    pub fn nans_equal(&self) -> bool {
        self.nans_equal
    }

    pub fn unordered_map_keys(&self) -> bool {
        self.unordered_map_keys
    }

    #[inline]
    pub(crate) fn floats_equal(&self, a: f64, b: f64) -> bool {
        a == b
            || (self.abs_tolerance > 0.0 && (a - b).abs() <= self.abs_tolerance)
            || (self.nans_equal && a.is_nan() && b.is_nan())
    }
}

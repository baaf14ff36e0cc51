//! The tolerance policy used for every DP relaxation decision.
//!
//! Integer accumulators compare exactly; floating-point accumulators compare
//! with a small epsilon so that rounding noise from repeated additions can't
//! make the algorithm loop between two walks of (numerically) equal length.
//!
//! The mean-cycle extractor in [`crate::karp`] never goes through this trait:
//! it decides "is candidate A's mean less than B's" with exact integer
//! cross-multiplication instead, precisely to avoid the bias a tolerance
//! introduces (see `Karp::extract_mean` in [`crate::karp`]).

/// Associated data usable as a DP accumulator: the `LargeValue` of the spec.
pub trait Measure:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + std::ops::Add<Self, Output = Self>
    + std::ops::Sub<Self, Output = Self>
    + std::ops::Mul<Self, Output = Self>
    + std::fmt::Debug
{
    /// A value no reachable walk length can equal or exceed.
    const INFINITY: Self;

    /// Converts a small non-negative count (an arc count, never a length) to
    /// this accumulator type, for the cross-multiplications in the mean
    /// extractor.
    fn from_usize(n: usize) -> Self;

    /// Lossy conversion to `f64`, used only for reporting `cycle_mean`.
    fn as_f64(self) -> f64;
}

macro_rules! impl_measure_int {
    ($($t:ty),*) => {
        $(
            impl Measure for $t {
                const INFINITY: Self = <$t>::MAX;

                fn from_usize(n: usize) -> Self {
                    n as $t
                }

                fn as_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_measure_int!(i32, i64, i128, isize);

impl Measure for f32 {
    const INFINITY: Self = f32::INFINITY;

    fn from_usize(n: usize) -> Self {
        n as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Measure for f64 {
    const INFINITY: Self = f64::INFINITY;

    fn from_usize(n: usize) -> Self {
        n as f64
    }

    fn as_f64(self) -> f64 {
        self
    }
}

/// Decides strict-less on two accumulator values during DP relaxation.
///
/// Equality with [`Measure::INFINITY`] is always tested exactly
/// (`==`/`!=`), never through this trait.
pub trait Tolerance<V> {
    fn less(&self, a: V, b: V) -> bool;
}

/// Exact comparison, appropriate when `V` is an integer type.
#[derive(Debug, Default, Copy, Clone)]
pub struct Exact;

impl<V: PartialOrd> Tolerance<V> for Exact {
    fn less(&self, a: V, b: V) -> bool {
        a < b
    }
}

/// Epsilon-based comparison for floating-point accumulators: `a` counts as
/// less than `b` only if it clears `b` by more than `epsilon`.
#[derive(Debug, Copy, Clone)]
pub struct Epsilon {
    epsilon: f64,
}

impl Epsilon {
    pub const DEFAULT_EPSILON: f64 = 1e-9;

    pub fn new(epsilon: f64) -> Self {
        Epsilon { epsilon }
    }
}

impl Default for Epsilon {
    fn default() -> Self {
        Epsilon::new(Self::DEFAULT_EPSILON)
    }
}

impl Tolerance<f64> for Epsilon {
    fn less(&self, a: f64, b: f64) -> bool {
        a < b - self.epsilon
    }
}

impl Tolerance<f32> for Epsilon {
    fn less(&self, a: f32, b: f32) -> bool {
        (a as f64) < (b as f64) - self.epsilon
    }
}

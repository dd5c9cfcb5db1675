//! Numeric generator fields.
//!
//! [`Int`] and [`Float`] sample from a weighted band distribution
//! ([`Odds`]): a band is picked by weight, then the value is drawn
//! uniformly within it. The default tables target boundary conditions
//! that tend to shake out parser bugs.

use crate::rand::Rand;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;

/// A single probability band: an exact value or a `[lo, hi)` range.
#[derive(Debug, Clone, Copy)]
pub enum Band<T> {
    At(T),
    Span(T, T),
}

/// Weighted band distribution.
///
/// Each entry pairs a weight with a [`Band`]; weights need not sum to
/// one, but must be positive.
#[derive(Debug, Clone)]
pub struct Odds<T> {
    entries: Vec<(f64, Band<T>)>,
}

/// Value types [`Odds`] can sample: a uniform draw within a band.
pub trait Draw: Copy {
    fn draw(rand: &mut Rand, lo: Self, hi: Self) -> Self;
}

impl Draw for i64 {
    fn draw(rand: &mut Rand, lo: Self, hi: Self) -> Self {
        rand.int_in(lo, hi)
    }
}

impl Draw for f64 {
    fn draw(rand: &mut Rand, lo: Self, hi: Self) -> Self {
        rand.float_in(lo, hi)
    }
}

impl<T: Draw> Odds<T> {
    pub fn new(entries: Vec<(f64, Band<T>)>) -> Self {
        debug_assert!(
            !entries.is_empty() && entries.iter().all(|(w, _)| *w > 0.0),
            "odds entries must be non-empty with positive weights"
        );
        Self { entries }
    }

    /// A single band covering `[lo, hi)` uniformly.
    pub fn uniform(lo: T, hi: T) -> Self {
        Self {
            entries: vec![(1.0, Band::Span(lo, hi))],
        }
    }

    pub(crate) fn pick(&self, rand: &mut Rand) -> T {
        let dist = WeightedIndex::new(self.entries.iter().map(|(w, _)| *w))
            .expect("odds weights must be positive");
        let (_, band) = self.entries[dist.sample(rand.rng())];
        match band {
            Band::At(v) => v,
            Band::Span(lo, hi) => T::draw(rand, lo, hi),
        }
    }
}

/// Integer generator.
///
/// The default odds target integer boundary conditions (zero, byte and
/// word edges, `2^31`, `2^32`). [`Int::ranged`] gives a plain uniform
/// unsigned integer instead.
#[derive(Debug, Clone)]
pub struct Int {
    pub(crate) value: Option<i64>,
    pub(crate) min: i64,
    pub(crate) max: i64,
    pub(crate) neg: bool,
    pub(crate) odds: Odds<i64>,
}

impl Int {
    /// Boundary-condition odds; the result is negated half of the time.
    pub fn new() -> Self {
        Int {
            value: None,
            min: 0,
            max: 0x1000_0003,
            neg: true,
            odds: Odds::new(vec![
                (0.75, Band::Span(0, 100)),
                (0.05, Band::At(0)),
                (0.05, Band::Span(0x80 - 2, 0x80 + 2)),
                (0.05, Band::Span(0x100 - 2, 0x100 + 2)),
                (0.05, Band::Span(0x1_0000 - 2, 0x1_0000 + 2)),
                (0.03, Band::At(0x8000_0000)),
                (0.02, Band::Span(0x1_0000_0000 - 2, 0x1_0000_0000 + 2)),
            ]),
        }
    }

    /// Like [`Int::new`], but never negates the result.
    pub fn unsigned() -> Self {
        Int {
            neg: false,
            ..Int::new()
        }
    }

    /// Uniform unsigned integer in `[min, max)`.
    pub fn ranged(min: i64, max: i64) -> Self {
        Int {
            value: None,
            min,
            max,
            neg: false,
            odds: Odds::uniform(min, max),
        }
    }

    /// Hard-coded value, emitted instead of a random one half of the time.
    pub fn value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn signed(mut self, neg: bool) -> Self {
        self.neg = neg;
        self
    }

    pub fn odds(mut self, odds: Odds<i64>) -> Self {
        self.odds = odds;
        self
    }

    pub(crate) fn build(&self, rand: &mut Rand) -> String {
        if let Some(v) = self.value {
            if rand.coin() {
                return v.to_string();
            }
        }
        if self.min == self.max {
            return self.min.to_string();
        }
        let mut n = self.odds.pick(rand);
        if self.neg && rand.coin() {
            n = -n;
        }
        n.to_string()
    }
}

impl Default for Int {
    fn default() -> Self {
        Int::new()
    }
}

/// Float generator, analogous to [`Int`].
#[derive(Debug, Clone)]
pub struct Float {
    pub(crate) value: Option<f64>,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) neg: bool,
    pub(crate) odds: Odds<f64>,
}

impl Float {
    pub fn new() -> Self {
        Float {
            value: None,
            min: 0.0,
            max: 100_000.0,
            neg: true,
            odds: Odds::new(vec![
                (0.75, Band::Span(0.0, 100.0)),
                (0.05, Band::At(0.0)),
                (0.10, Band::Span(100.0, 1000.0)),
                (0.10, Band::Span(1000.0, 100_000.0)),
            ]),
        }
    }

    /// Like [`Float::new`], but never negates the result.
    pub fn unsigned() -> Self {
        Float {
            neg: false,
            ..Float::new()
        }
    }

    /// Uniform unsigned float in `[min, max)`.
    pub fn ranged(min: f64, max: f64) -> Self {
        Float {
            value: None,
            min,
            max,
            neg: false,
            odds: Odds::uniform(min, max),
        }
    }

    /// Hard-coded value, emitted instead of a random one half of the time.
    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn signed(mut self, neg: bool) -> Self {
        self.neg = neg;
        self
    }

    pub fn odds(mut self, odds: Odds<f64>) -> Self {
        self.odds = odds;
        self
    }

    pub(crate) fn build(&self, rand: &mut Rand) -> String {
        if let Some(v) = self.value {
            if rand.coin() {
                return v.to_string();
            }
        }
        if self.min == self.max {
            return self.min.to_string();
        }
        let mut x = self.odds.pick(rand);
        if self.neg && rand.coin() {
            x = -x;
        }
        x.to_string()
    }
}

impl Default for Float {
    fn default() -> Self {
        Float::new()
    }
}

#[cfg(test)]
mod test {
    use crate::field::num::{Band, Float, Int, Odds};
    use crate::rand::Rand;

    #[test]
    fn ranged_int_is_uniform_and_unsigned() {
        let mut rand = Rand::seeded(42);
        let field = Int::ranged(5, 6);
        for _ in 0..50 {
            assert_eq!(field.build(&mut rand), "5");
        }
    }

    #[test]
    fn default_int_parses_as_integer() {
        let mut rand = Rand::seeded(42);
        let field = Int::new();
        for _ in 0..200 {
            field.build(&mut rand).parse::<i64>().unwrap();
        }
    }

    #[test]
    fn unsigned_int_never_negates() {
        let mut rand = Rand::seeded(42);
        let field = Int::unsigned();
        for _ in 0..200 {
            assert!(field.build(&mut rand).parse::<i64>().unwrap() >= 0);
        }
    }

    #[test]
    fn hard_coded_value_shows_up_half_the_time() {
        let mut rand = Rand::seeded(42);
        let field = Int::ranged(0, 10).value(777);
        let hits = (0..1000)
            .filter(|_| field.build(&mut rand) == "777")
            .count();
        // 500 expected, ±4 sigma
        assert!((437..=563).contains(&hits), "got {hits}");
    }

    #[test]
    fn exact_band_always_yields_its_value() {
        let mut rand = Rand::seeded(9);
        let odds = Odds::new(vec![(1.0, Band::At(7))]);
        for _ in 0..20 {
            assert_eq!(odds.pick(&mut rand), 7);
        }
    }

    #[test]
    fn ranged_float_stays_in_range() {
        let mut rand = Rand::seeded(42);
        let field = Float::ranged(1.0, 2.0);
        for _ in 0..100 {
            let x = field.build(&mut rand).parse::<f64>().unwrap();
            assert!((1.0..2.0).contains(&x));
        }
    }
}

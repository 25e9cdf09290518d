use crate::prelude::Real;

/// Streaming summary statistics over a sequence of reals.
pub trait Stats {
    fn add(&mut self, x: Real);
    fn add_many<I>(&mut self, xs: I)
    where
        I: IntoIterator<Item = Real>,
    {
        for x in xs {
            self.add(x);
        }
    }
    fn size(&self) -> usize;
    fn total(&self) -> Real;
    fn min(&self) -> Real;
    fn max(&self) -> Real;
    fn var(&self) -> Real;
    fn mean(&self) -> Real {
        self.total() / self.size() as Real
    }
    fn std(&self) -> Real {
        self.var().sqrt()
    }
}

/// Constant-space moment accumulator.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StatsAcc {
    n: usize,
    m1: Real,
    m2: Real,
    min: Real,
    max: Real,
}

impl StatsAcc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for StatsAcc {
    fn default() -> Self {
        StatsAcc {
            n: 0,
            m1: 0.,
            m2: 0.,
            min: Real::INFINITY,
            max: Real::NEG_INFINITY,
        }
    }
}

impl Stats for StatsAcc {
    fn add(&mut self, x: Real) {
        self.n += 1;
        self.m1 += x;
        self.m2 += x * x;
        self.min = Real::min(x, self.min);
        self.max = Real::max(x, self.max);
    }

    fn size(&self) -> usize {
        self.n
    }

    fn total(&self) -> Real {
        return self.m1;
    }

    fn var(&self) -> Real {
        let m = self.mean();
        return self.m2 / self.n as Real - m * m;
    }

    fn min(&self) -> Real {
        self.min
    }

    fn max(&self) -> Real {
        self.max
    }
}

use std::fmt;

/// Running min/max/average over a stream of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    count: u64,
    sum: u64,
    min: u32,
    max: u32,
}

impl Stats {
    pub fn observe(&mut self, value: u32) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += u64::from(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> Option<u32> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<u32> {
        (self.count > 0).then_some(self.max)
    }

    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.avg() {
            Some(avg) => write!(
                f,
                "min={}, max={}, avg={:.1}",
                self.min, self.max, avg
            ),
            None => write!(f, "n/a"),
        }
    }
}

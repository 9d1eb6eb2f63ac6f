/// Decides which byte counts are worth a progress notice: only when the
/// percentage has advanced at least `step` points since the last one.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    step: u8,
    total: Option<u64>,
    last_reported: u8,
}

impl ProgressThrottle {
    pub fn new(step: u8, total: Option<u64>) -> Self {
        Self {
            step: step.max(1),
            total: total.filter(|t| *t > 0),
            last_reported: 0,
        }
    }

    /// Floor percentage of `done` over the known total, capped at 100.
    pub fn percent(&self, done: u64) -> Option<u8> {
        let total = self.total?;
        let pct = (u128::from(done) * 100 / u128::from(total)).min(100);
        Some(pct as u8)
    }

    /// Feed the cumulative byte count; returns the percentage to report, if any.
    pub fn observe(&mut self, done: u64) -> Option<u8> {
        let pct = self.percent(done)?;
        if pct > self.last_reported && pct - self.last_reported >= self.step {
            self.last_reported = pct;
            Some(pct)
        } else {
            None
        }
    }

    pub fn last_reported(&self) -> u8 {
        self.last_reported
    }
}

/// Splits variable frame time into fixed collision ticks.
///
/// At most `max_steps` ticks are produced per frame; leftover time beyond that is dropped so a
/// long stall does not trigger a burst of catch-up steps.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
    max_steps: u32,
}

impl FixedTimestep {
    pub fn from_rate(tick_rate: f32) -> Self {
        Self::new(1.0 / tick_rate.max(f32::EPSILON), 8)
    }

    pub fn new(step: f32, max_steps: u32) -> Self {
        Self { step, accumulator: 0.0, max_steps: max_steps.max(1) }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Feeds `elapsed` seconds and returns how many fixed ticks should run now.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            log::warn!("dropping {:.3}s of simulation time after {steps} catch-up ticks", self.accumulator);
            self.accumulator %= self.step;
        }
        steps
    }

    /// Fraction of a tick left in the accumulator, for interpolating presentation.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }
}

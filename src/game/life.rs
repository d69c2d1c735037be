pub const LIFE_MAX: f32 = 1.0;

pub struct LifeChange;
impl LifeChange {
    pub const HIT: f32 = 0.02;
    pub const HELD: f32 = 0.001; // per tick while holding
    pub const MISS: f32 = -0.15;
}

/// Health bar in [0, LIFE_MAX]. Running out of life is sticky.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LifeMeter {
    value: f32,
    failed: bool,
}

impl Default for LifeMeter {
    fn default() -> Self {
        Self {
            value: LIFE_MAX,
            failed: false,
        }
    }
}

impl LifeMeter {
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn apply(&mut self, delta: f32) {
        if self.failed {
            return;
        }
        self.value = (self.value + delta).clamp(0.0, LIFE_MAX);
        if self.value <= 0.0 {
            self.failed = true;
        }
    }
}

//! Sample-accurate parameter automation.
//!
//! A `ParamTimeline` holds set/ramp events the way a scheduled audio
//! parameter does: every ramp starts from the time and value of the event
//! before it and ends at its own time and value.

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    Set { time: f64, value: f32 },
    Linear { time: f64, value: f32 },
    Exponential { time: f64, value: f32 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::Set { time, .. }
            | ParamEvent::Linear { time, .. }
            | ParamEvent::Exponential { time, .. } => time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            ParamEvent::Set { value, .. }
            | ParamEvent::Linear { value, .. }
            | ParamEvent::Exponential { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamTimeline {
    default: f32,
    events: Vec<ParamEvent>,
}

impl ParamTimeline {
    pub fn new(default: f32) -> Self {
        Self { default, events: Vec::new() }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Set { time, value })
    }

    pub fn linear_ramp_to(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Linear { time, value })
    }

    pub fn exponential_ramp_to(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Exponential { time, value })
    }

    // Events stay sorted by time; equal times keep insertion order.
    fn insert(&mut self, event: ParamEvent) -> &mut Self {
        let pos = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
        self
    }

    /// Value at time `t` (seconds).
    pub fn value_at(&self, t: f64) -> f32 {
        let next = self.events.iter().position(|e| e.time() > t);
        let prev = match next {
            Some(0) => None,
            Some(i) => Some(self.events[i - 1]),
            None => self.events.last().copied(),
        };

        let (t0, v0) = prev.map(|e| (e.time(), e.value())).unwrap_or((0.0, self.default));

        match next.map(|i| self.events[i]) {
            Some(ParamEvent::Linear { time: t1, value: v1 }) => {
                let frac = ((t - t0) / (t1 - t0)) as f32;
                v0 + (v1 - v0) * frac
            }
            Some(ParamEvent::Exponential { time: t1, value: v1 }) => {
                if v0 * v1 <= 0.0 {
                    // Undefined across zero or a sign change: hold.
                    v0
                } else {
                    let frac = (t - t0) / (t1 - t0);
                    (v0 as f64 * (v1 as f64 / v0 as f64).powf(frac)) as f32
                }
            }
            _ => v0,
        }
    }

    /// Render `len` samples at `sample_rate`, starting at time zero.
    pub fn render(&self, len: usize, sample_rate: u32) -> Vec<f32> {
        let sr = sample_rate as f64;
        (0..len).map(|i| self.value_at(i as f64 / sr)).collect()
    }
}

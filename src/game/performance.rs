//! Frame budget monitoring
//!
//! Tracks how long each engine tick takes against the frame budget.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples needed before the load level is trusted
const MIN_SAMPLES: usize = 10;

/// How much of the frame budget recent ticks have used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLoad {
    /// Under 30% of budget
    Light,
    /// 30-70%
    Nominal,
    /// 70-100%, frames still fit
    Strained,
    /// Over budget, frames are being dropped
    Overrun,
}

impl FrameLoad {
    /// Spawn logic should hold back optional objects (effects, debris)
    pub fn should_shed_effects(&self) -> bool {
        matches!(self, FrameLoad::Strained | FrameLoad::Overrun)
    }
}

/// Rolling window of tick durations
pub struct FrameMonitor {
    durations: VecDeque<Duration>,
    max_samples: usize,
    budget: Duration,
    load: FrameLoad,
    tick_start: Option<Instant>,
    last_object_count: usize,
}

impl FrameMonitor {
    pub fn new(tick_rate: u32) -> Self {
        let budget = Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32);
        Self {
            durations: VecDeque::with_capacity(120),
            max_samples: 120,
            budget,
            load: FrameLoad::Light,
            tick_start: None,
            last_object_count: 0,
        }
    }

    /// Mark the start of a tick
    pub fn tick_start(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// Mark the end of a tick and record how long it took
    pub fn tick_end(&mut self, object_count: usize) {
        if let Some(start) = self.tick_start.take() {
            self.record_tick(start.elapsed());
            self.last_object_count = object_count;
        }
    }

    fn record_tick(&mut self, duration: Duration) {
        self.durations.push_back(duration);
        while self.durations.len() > self.max_samples {
            self.durations.pop_front();
        }
        self.update_load();
    }

    fn update_load(&mut self) {
        if self.durations.len() < MIN_SAMPLES {
            return;
        }
        let ratio = self.budget_usage_percent() / 100.0;
        self.load = if ratio < 0.3 {
            FrameLoad::Light
        } else if ratio < 0.7 {
            FrameLoad::Nominal
        } else if ratio < 1.0 {
            FrameLoad::Strained
        } else {
            FrameLoad::Overrun
        };
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.durations.iter().sum();
        sum / self.durations.len() as u32
    }

    pub fn p95_tick_duration(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.durations.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Average tick time as a percentage of the budget (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        self.average_tick_duration().as_secs_f32() / self.budget.as_secs_f32() * 100.0
    }

    #[inline]
    pub fn load(&self) -> FrameLoad {
        self.load
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, p95 {:?}, {} objects",
            self.load,
            self.budget_usage_percent(),
            self.p95_tick_duration(),
            self.last_object_count
        )
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new(crate::game::constants::timing::TICK_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_monitor_is_light() {
        let monitor = FrameMonitor::new(60);
        assert_eq!(monitor.load(), FrameLoad::Light);
        assert_eq!(monitor.average_tick_duration(), Duration::ZERO);
    }

    #[test]
    fn test_needs_minimum_samples() {
        let mut monitor = FrameMonitor::new(60);
        for _ in 0..(MIN_SAMPLES - 1) {
            monitor.record_tick(Duration::from_millis(30));
        }
        assert_eq!(monitor.load(), FrameLoad::Light);
        monitor.record_tick(Duration::from_millis(30));
        assert_eq!(monitor.load(), FrameLoad::Overrun);
    }

    #[test]
    fn test_load_levels() {
        // Budget at 60 Hz is ~16.67ms
        for (millis, expected) in [
            (2, FrameLoad::Light),
            (8, FrameLoad::Nominal),
            (14, FrameLoad::Strained),
            (20, FrameLoad::Overrun),
        ] {
            let mut monitor = FrameMonitor::new(60);
            for _ in 0..20 {
                monitor.record_tick(Duration::from_millis(millis));
            }
            assert_eq!(monitor.load(), expected, "{}ms", millis);
        }
        assert!(FrameLoad::Overrun.should_shed_effects());
        assert!(!FrameLoad::Nominal.should_shed_effects());
    }

    #[test]
    fn test_window_is_bounded() {
        let mut monitor = FrameMonitor::new(60);
        for _ in 0..500 {
            monitor.record_tick(Duration::from_millis(1));
        }
        assert_eq!(monitor.durations.len(), 120);
    }

    #[test]
    fn test_p95() {
        let mut monitor = FrameMonitor::new(60);
        for i in 1..=100 {
            monitor.record_tick(Duration::from_millis(i));
        }
        assert_eq!(monitor.p95_tick_duration(), Duration::from_millis(96));
    }

    #[test]
    fn test_tick_timing() {
        let mut monitor = FrameMonitor::new(60);
        monitor.tick_start();
        std::thread::sleep(Duration::from_millis(1));
        monitor.tick_end(10);
        assert_eq!(monitor.durations.len(), 1);
        assert!(monitor.average_tick_duration() >= Duration::from_millis(1));
    }

    #[test]
    fn test_status_message_reports_last_count() {
        let mut monitor = FrameMonitor::new(60);
        monitor.tick_start();
        monitor.tick_end(42);
        // An unmatched end keeps the previous count
        monitor.tick_end(7);
        let message = monitor.status_message();
        assert!(message.starts_with("Light"), "{}", message);
        assert!(message.ends_with("42 objects"), "{}", message);
    }
}

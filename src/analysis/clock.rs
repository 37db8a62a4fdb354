//! Pausable wall clock used to pace file and synthetic playback.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    started: Option<Instant>,
    accumulated: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Total running time, excluding paused spans.
    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Elapsed running time expressed as a sample position.
    pub fn position(&self, sample_rate: u32) -> usize {
        (self.elapsed().as_secs_f64() * sample_rate as f64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_clock_does_not_advance() {
        let mut clock = PlaybackClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert!(!clock.is_running());

        clock.resume();
        std::thread::sleep(Duration::from_millis(5));
        clock.pause();
        let frozen = clock.elapsed();
        assert!(frozen >= Duration::from_millis(5));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.elapsed(), frozen);
        assert!(clock.position(1000) >= 5);
    }
}

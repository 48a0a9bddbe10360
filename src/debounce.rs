use std::time::{Duration, Instant};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<(String, Instant)>,
    last_emitted: String,
}

impl Debouncer {
    // Starts with an empty last value, matching the initial browse mode.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last_emitted: String::new(),
        }
    }

    pub fn update(&mut self, value: impl Into<String>, now: Instant) {
        self.pending = Some((value.into(), now));
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let (_, since) = self.pending.as_ref()?;
        Some(self.quiet.saturating_sub(now.saturating_duration_since(*since)))
    }

    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let (_, since) = self.pending.as_ref()?;
        if now.saturating_duration_since(*since) < self.quiet {
            return None;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Option<String> {
        let (value, _) = self.pending.take()?;
        if value == self.last_emitted {
            return None;
        }
        self.last_emitted = value.clone();
        Some(value)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn emits_only_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.update("bat", start);
        assert_eq!(debouncer.poll(start + ms(499)), None);
        assert_eq!(debouncer.poll(start + ms(500)), Some("bat".to_string()));
        assert_eq!(debouncer.remaining(start + ms(500)), None);
    }

    #[test]
    fn burst_collapses_to_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.update("b", start);
        debouncer.update("ba", start + ms(200));
        debouncer.update("bat", start + ms(400));
        assert_eq!(debouncer.poll(start + ms(700)), None);
        assert_eq!(debouncer.poll(start + ms(900)), Some("bat".to_string()));
        assert_eq!(debouncer.poll(start + ms(2000)), None);
    }

    #[test]
    fn repeated_value_is_not_re_emitted() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.update("batman", start);
        assert_eq!(debouncer.poll(start + ms(600)), Some("batman".to_string()));
        debouncer.update("batma", start + ms(700));
        debouncer.update("batman", start + ms(800));
        assert_eq!(debouncer.poll(start + ms(1400)), None);
    }

    #[test]
    fn initial_empty_value_counts_as_emitted() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.update("", start);
        assert_eq!(debouncer.poll(start + ms(600)), None);
    }

    #[test]
    fn flush_skips_the_wait() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(500));
        debouncer.update("alien", start);
        assert_eq!(debouncer.remaining(start + ms(100)), Some(ms(400)));
        assert_eq!(debouncer.flush(), Some("alien".to_string()));
        assert_eq!(debouncer.remaining(start + ms(100)), None);
    }
}

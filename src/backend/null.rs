use super::{SoundBackend, FRAME_BYTES};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

// The AI holds the playing buffer plus one pending buffer.
const FIFO_DEPTH: usize = 2;

/// Silent backend that drains accepted buffers in real time so the
/// length register and `update(wait)` pacing behave like real output.
pub struct NullBackend {
    running: bool,
    frequency: u32,
    // Byte lengths; front is the buffer currently "playing".
    queue: VecDeque<u32>,
    last_tick: Option<Instant>,
    partial_bytes: f64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            running: false,
            frequency: 0,
            queue: VecDeque::with_capacity(FIFO_DEPTH + 1),
            last_tick: None,
            partial_bytes: 0.0,
        }
    }

    fn bytes_per_second(&self) -> f64 {
        self.frequency as f64 * FRAME_BYTES as f64
    }

    fn drain(&mut self, now: Instant) {
        let last = match self.last_tick.replace(now) {
            Some(t) => t,
            None => return,
        };
        if !self.running || self.frequency == 0 {
            return;
        }
        let elapsed = now.saturating_duration_since(last);
        let mut budget = self.partial_bytes + elapsed.as_secs_f64() * self.bytes_per_second();
        while let Some(front) = self.queue.front_mut() {
            if budget >= *front as f64 {
                budget -= *front as f64;
                self.queue.pop_front();
            } else {
                let used = budget as u32;
                *front -= used;
                budget -= used as f64;
                break;
            }
        }
        self.partial_bytes = if self.queue.is_empty() { 0.0 } else { budget };
    }

    fn accept_at(&mut self, length: u32, now: Instant) {
        self.drain(now);
        if length == 0 {
            return;
        }
        if self.queue.is_empty() {
            self.last_tick = Some(now);
            self.partial_bytes = 0.0;
        }
        self.queue.push_back(length);
    }

    fn remaining_at(&mut self, now: Instant) -> u32 {
        self.drain(now);
        self.queue.front().copied().unwrap_or(0)
    }

    fn time_until_room(&self) -> Option<Duration> {
        if self.queue.len() < FIFO_DEPTH || self.frequency == 0 || !self.running {
            return None;
        }
        let front = self.queue.front().copied().unwrap_or(0) as f64;
        let secs = (front - self.partial_bytes).max(0.0) / self.bytes_per_second();
        Some(Duration::from_secs_f64(secs).max(Duration::from_millis(1)))
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundBackend for NullBackend {
    fn startup(&mut self) {
        self.running = true;
        self.last_tick = Some(Instant::now());
    }

    fn shutdown(&mut self) {
        self.running = false;
        self.reset();
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.partial_bytes = 0.0;
        self.last_tick = Some(Instant::now());
    }

    fn set_frequency(&mut self, hz: u32) {
        self.drain(Instant::now());
        self.frequency = hz;
    }

    fn accept_buffer(&mut self, buffer: &[u8]) {
        self.accept_at(buffer.len() as u32, Instant::now());
    }

    fn query_remaining_length(&mut self) -> u32 {
        self.remaining_at(Instant::now())
    }

    fn update(&mut self, wait: bool) {
        self.drain(Instant::now());
        if !wait {
            return;
        }
        while let Some(delay) = self.time_until_room() {
            std::thread::sleep(delay);
            self.drain(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(hz: u32) -> NullBackend {
        let mut b = NullBackend::new();
        b.running = true;
        b.frequency = hz;
        b
    }

    #[test]
    fn drains_at_four_bytes_per_frame() {
        let t0 = Instant::now();
        let mut b = running(1000);
        b.accept_at(4000, t0);
        assert_eq!(b.remaining_at(t0 + Duration::from_millis(500)), 2000);
        assert_eq!(b.remaining_at(t0 + Duration::from_millis(1000)), 0);
    }

    #[test]
    fn second_buffer_starts_after_first() {
        let t0 = Instant::now();
        let mut b = running(1000);
        b.accept_at(4000, t0);
        b.accept_at(4000, t0);
        assert!(b.time_until_room().is_some());
        assert_eq!(b.remaining_at(t0 + Duration::from_millis(1250)), 3000);
        assert!(b.time_until_room().is_none());
    }

    #[test]
    fn no_drain_without_frequency() {
        let t0 = Instant::now();
        let mut b = running(0);
        b.accept_at(64, t0);
        assert_eq!(b.remaining_at(t0 + Duration::from_secs(5)), 64);
        // update(true) must not sleep forever with an unset rate
        b.update(true);
    }

    #[test]
    fn reset_and_shutdown_clear_the_queue() {
        let mut b = NullBackend::new();
        b.startup();
        b.set_frequency(32000);
        b.accept_buffer(&[0; 256]);
        b.reset();
        assert_eq!(b.query_remaining_length(), 0);
        b.accept_buffer(&[0; 256]);
        b.shutdown();
        assert_eq!(b.query_remaining_length(), 0);
    }

    #[test]
    fn zero_length_buffers_are_ignored() {
        let t0 = Instant::now();
        let mut b = running(1000);
        b.accept_at(0, t0);
        assert!(b.queue.is_empty());
    }
}

//! Sliding-window admission gate shared by every outbound call.
//!
//! The REST client and the Sync client hold the same `Arc<RateLimiter>`, so
//! the window reflects the combined quota Todoist enforces per token.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use super::error::{ApiError, ApiResult};

/// Todoist allows 450 requests per 15 minutes per user token.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_CAPACITY: usize = 450;

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    capacity: usize,
    state: Mutex<Window>,
}

#[derive(Debug, Default)]
struct Window {
    admitted: VecDeque<Instant>,
    reserved: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_CAPACITY)
    }
}

impl RateLimiter {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity,
            state: Mutex::new(Window {
                admitted: VecDeque::with_capacity(capacity),
                reserved: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit one request, recording it against the window.
    ///
    /// Check and record happen under the same lock, so two callers can never
    /// both take the last free slot. Reservations do not gate this call.
    pub fn try_admit(&self) -> ApiResult<()> {
        let mut state = self.lock();
        let now = Instant::now();
        Self::purge(&mut state.admitted, now, self.window);

        if state.admitted.len() >= self.capacity {
            return Err(ApiError::RateLimitExceeded {
                used: state.admitted.len(),
                capacity: self.capacity,
                window_minutes: self.window.as_secs() / 60,
            });
        }

        state.admitted.push_back(now);
        Ok(())
    }

    /// Slots still available in the current window. Records nothing.
    pub fn remaining(&self) -> usize {
        let mut state = self.lock();
        Self::purge(&mut state.admitted, Instant::now(), self.window);
        self.capacity.saturating_sub(state.admitted.len())
    }

    /// Available slots nobody has reserved.
    pub fn unreserved(&self) -> usize {
        let mut state = self.lock();
        Self::purge(&mut state.admitted, Instant::now(), self.window);
        self.capacity
            .saturating_sub(state.admitted.len())
            .saturating_sub(state.reserved)
    }

    /// Hold `slots` for a sequential run that needs one request per target.
    ///
    /// Returns the unreserved count on refusal. Held slots are returned one
    /// at a time with [`Reservation::release_one`] or all at once on drop.
    pub fn try_reserve(&self, slots: usize) -> Result<Reservation<'_>, usize> {
        let mut state = self.lock();
        Self::purge(&mut state.admitted, Instant::now(), self.window);
        let free = self
            .capacity
            .saturating_sub(state.admitted.len())
            .saturating_sub(state.reserved);
        if free < slots {
            return Err(free);
        }

        state.reserved += slots;
        Ok(Reservation {
            limiter: self,
            held: slots,
        })
    }

    fn release(&self, slots: usize) {
        let mut state = self.lock();
        state.reserved = state.reserved.saturating_sub(slots);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Window> {
        // A poisoned lock still guards a valid queue of instants.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Entries are pushed in order, so expired ones are always at the front.
    fn purge(admitted: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = admitted.front() {
            if now.duration_since(*oldest) >= window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Slots held against a [`RateLimiter`] until released or dropped.
#[derive(Debug)]
pub struct Reservation<'a> {
    limiter: &'a RateLimiter,
    held: usize,
}

impl Reservation<'_> {
    pub fn held(&self) -> usize {
        self.held
    }

    /// Hand one slot back just before the request it was held for.
    pub fn release_one(&mut self) {
        if self.held > 0 {
            self.held -= 1;
            self.limiter.release(1);
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.limiter.release(self.held);
    }
}

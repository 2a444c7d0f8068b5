//! Countdowns and the scheduling seam.
//!
//! A `Countdown` is the pure per-second state of the resend and QR refresh
//! timers. The repeating task that drives it comes from a `Scheduler`, whose
//! handles cancel on drop; a `TimerSlot` holds at most one of them.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Host event loop: repeating timers and fire-and-forget local tasks.
pub trait Scheduler {
    /// Dropping the handle cancels the timer.
    type Handle;

    fn every(&self, period: Duration, tick: Box<dyn FnMut()>) -> Self::Handle;
    fn spawn(&self, task: LocalTask);
}

/// Single-instance holder for a timer handle.
pub struct TimerSlot<H> {
    handle: Option<H>,
}

impl<H> Default for TimerSlot<H> {
    fn default() -> Self {
        Self { handle: None }
    }
}

impl<H> TimerSlot<H> {
    pub fn replace(&mut self, handle: H) {
        self.cancel();
        self.handle = Some(handle);
    }

    pub fn cancel(&mut self) {
        drop(self.handle.take());
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Running(u32),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    initial: u32,
    remaining: u32,
    active: bool,
}

impl Countdown {
    pub fn new(initial: u32) -> Self {
        Self {
            initial,
            remaining: 0,
            active: false,
        }
    }

    pub fn start(&mut self) {
        self.remaining = self.initial;
        self.active = self.initial > 0;
    }

    /// Stops counting and clears the remaining time.
    pub fn reset(&mut self) {
        self.remaining = 0;
        self.active = false;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.active {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = false;
            Tick::Finished
        } else {
            Tick::Running(self.remaining)
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining == 0
    }
}

/// `(mm:ss)`, or empty once the countdown is over.
pub fn format_countdown(seconds: u32) -> String {
    if seconds == 0 {
        return String::new();
    }
    format!("({:02}:{:02})", seconds / 60, seconds % 60)
}

//! Browser scheduler for the drawer session.
//!
//! Repeating timers are `gloo-timers` intervals, cancelled when the handle
//! drops; background work runs on the microtask queue via `spawn_local`.

use gloo_timers::callback::Interval;
use od_drawer_core::{LocalTask, Scheduler};
use std::time::Duration;

#[derive(Clone, Copy, Default)]
pub struct GlooScheduler;

impl Scheduler for GlooScheduler {
    type Handle = Interval;

    fn every(&self, period: Duration, mut tick: Box<dyn FnMut()>) -> Interval {
        let millis = u32::try_from(period.as_millis()).unwrap_or(u32::MAX);
        Interval::new(millis, move || tick())
    }

    fn spawn(&self, task: LocalTask) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

//! Deterministic doubles for the host seams: a manual scheduler, scripted
//! transport, recording sleeper, fixed host and recording view.

use async_trait::async_trait;
use od_api_types::BrowserData;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::client::{HttpReply, Sleeper, Transport, TransportError};
use crate::machine::{DrawerController, DrawerStep};
use crate::otp::FocusTarget;
use crate::session::{DrawerView, Host};
use crate::timer::{LocalTask, Scheduler};

// ── Scheduler ──

type TickFn = Rc<RefCell<Box<dyn FnMut()>>>;

#[derive(Default)]
struct SchedulerState {
    next_id: u64,
    timers: Vec<(u64, TickFn)>,
    tasks: VecDeque<LocalTask>,
}

/// Timers fire only when `fire` is called; spawned tasks run only in
/// `run_pending`.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

pub struct ManualHandle {
    id: u64,
    state: Weak<RefCell<SchedulerState>>,
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().timers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn every(&self, _period: Duration, tick: Box<dyn FnMut()>) -> ManualHandle {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.timers.push((id, Rc::new(RefCell::new(tick))));
        ManualHandle {
            id,
            state: Rc::downgrade(&self.state),
        }
    }

    fn spawn(&self, task: LocalTask) {
        self.state.borrow_mut().tasks.push_back(task);
    }
}

impl ManualScheduler {
    pub fn active_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// One period of every live timer. A timer cancelled by an earlier tick
    /// in the same round does not fire.
    pub fn fire(&self) {
        let timers: Vec<(u64, TickFn)> = self.state.borrow().timers.clone();
        for (id, tick) in timers {
            let live = self.state.borrow().timers.iter().any(|(t, _)| *t == id);
            if live {
                (tick.borrow_mut())();
            }
        }
    }

    /// Runs `seconds` rounds, draining spawned tasks after each.
    pub async fn advance(&self, seconds: u32) {
        for _ in 0..seconds {
            self.fire();
            self.run_pending().await;
        }
    }

    pub async fn run_pending(&self) {
        loop {
            let next = self.state.borrow_mut().tasks.pop_front();
            match next {
                Some(task) => task.await,
                None => break,
            }
        }
    }
}

// ── Transport ──

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub url: String,
    pub body: serde_json::Value,
    pub timeout: Duration,
}

type Hook = Box<dyn FnOnce()>;

/// Replies queued per URL, consumed in order. An unscripted call fails as a
/// network error.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<HashMap<String, VecDeque<Result<HttpReply, TransportError>>>>,
    calls: RefCell<Vec<RecordedCall>>,
    hook: RefCell<Option<Hook>>,
}

impl ScriptedTransport {
    pub fn reply(&self, url: &str, status: u16, body: &str) {
        self.push(
            url,
            Ok(HttpReply {
                status,
                body: body.to_owned(),
            }),
        );
    }

    pub fn reply_json(&self, url: &str, status: u16, body: serde_json::Value) {
        self.reply(url, status, &body.to_string());
    }

    pub fn fail(&self, url: &str, err: TransportError) {
        self.push(url, Err(err));
    }

    /// Runs while the next request is in flight.
    pub fn on_next_call(&self, hook: impl FnOnce() + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.url == url).count()
    }

    fn push(&self, url: &str, reply: Result<HttpReply, TransportError>) {
        self.replies
            .borrow_mut()
            .entry(url.to_owned())
            .or_default()
            .push_back(reply);
    }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        self.calls.borrow_mut().push(RecordedCall {
            url: url.to_owned(),
            body: body.clone(),
            timeout,
        });
        let hook = self.hook.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        self.replies
            .borrow_mut()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TransportError::Network(format!("no reply scripted for {url}"))))
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

// ── Host and view ──

pub struct FixedHost {
    pub now_epoch_ms: Cell<u64>,
}

impl Default for FixedHost {
    fn default() -> Self {
        Self {
            now_epoch_ms: Cell::new(1_767_225_600_000),
        }
    }
}

impl Host for FixedHost {
    fn now_epoch_ms(&self) -> u64 {
        self.now_epoch_ms.get()
    }

    fn now_iso(&self) -> String {
        "2026-01-01T00:00:00.000Z".to_owned()
    }

    fn browser_data(&self) -> BrowserData {
        BrowserData {
            user_agent: "test-agent".to_owned(),
            language: "en-IN".to_owned(),
            timezone: "Asia/Kolkata".to_owned(),
            ..BrowserData::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub step: DrawerStep,
    pub focus: Option<FocusTarget>,
}

#[derive(Default)]
pub struct RecordingView {
    frames: RefCell<Vec<Frame>>,
}

impl RecordingView {
    pub fn last(&self) -> Option<Frame> {
        self.frames.borrow().last().cloned()
    }

    /// Most recent focus request, ignoring frames that carried none.
    pub fn last_focus(&self) -> Option<FocusTarget> {
        self.frames.borrow().iter().rev().find_map(|f| f.focus)
    }
}

impl DrawerView for RecordingView {
    fn render(&self, drawer: &DrawerController, focus: Option<FocusTarget>) {
        self.frames.borrow_mut().push(Frame {
            step: drawer.step(),
            focus,
        });
    }
}

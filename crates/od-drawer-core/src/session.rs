//! Async orchestration around `DrawerController`.
//!
//! One `DrawerSession` per page. It owns the controller, the API client, the
//! site storage and the two repeating timers, and re-renders through a
//! `DrawerView` after every change. Controller borrows are never held across
//! an `.await`: each operation runs `begin_*`, awaits the request, then
//! applies it with `complete_*`, and the ticket check drops results that
//! arrive after a close or step change.

use od_api_types::{BrowserData, GenerateQrRequest, VerifyOtpRequest};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cart::CartSnapshot;
use crate::client::ApiClient;
use crate::config::DrawerConfig;
use crate::error::FlowError;
use crate::machine::{Completion, DrawerController, DrawerStep};
use crate::otp::FocusTarget;
use crate::timer::{Scheduler, Tick, TimerSlot};
use od_storage::SiteStorage;

const TICK: Duration = Duration::from_secs(1);

/// Clock and device facts supplied by the page.
pub trait Host {
    fn now_epoch_ms(&self) -> u64;
    /// ISO-8601 timestamp sent as `request_time`.
    fn now_iso(&self) -> String;
    fn browser_data(&self) -> BrowserData;
}

pub trait DrawerView {
    fn render(&self, drawer: &DrawerController, focus: Option<FocusTarget>);
}

struct Inner<C: Scheduler> {
    controller: RefCell<DrawerController>,
    api: ApiClient,
    storage: SiteStorage,
    config: Rc<DrawerConfig>,
    scheduler: C,
    host: Rc<dyn Host>,
    view: Rc<dyn DrawerView>,
    resend_timer: RefCell<TimerSlot<C::Handle>>,
    qr_timer: RefCell<TimerSlot<C::Handle>>,
}

pub struct DrawerSession<C: Scheduler> {
    inner: Rc<Inner<C>>,
}

impl<C: Scheduler> Clone for DrawerSession<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Scheduler + 'static> DrawerSession<C> {
    pub fn new(
        config: Rc<DrawerConfig>,
        api: ApiClient,
        storage: SiteStorage,
        scheduler: C,
        host: Rc<dyn Host>,
        view: Rc<dyn DrawerView>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                controller: RefCell::new(DrawerController::new(config.clone())),
                api,
                storage,
                config,
                scheduler,
                host,
                view,
                resend_timer: RefCell::new(TimerSlot::default()),
                qr_timer: RefCell::new(TimerSlot::default()),
            }),
        }
    }

    // ── Open / close ──

    /// Opens at phone entry, or at the payment step when a verification is
    /// remembered. A record older than the configured TTL is cleared first.
    pub fn open(&self) {
        let now = self.inner.host.now_epoch_ms();
        let verified = match self.inner.storage.load_verified_session() {
            Ok(Some(record)) if record.is_expired(now, self.inner.config.verification_ttl_ms()) => {
                info!("verified phone expired, asking again");
                if let Err(err) = self.inner.storage.clear_verified_session() {
                    warn!("failed to clear expired verification: {err:#}");
                }
                None
            }
            Ok(record) => record,
            Err(err) => {
                warn!("failed to read verified session: {err:#}");
                None
            }
        };

        let opened = self.inner.controller.borrow_mut().open(verified);
        if opened.is_err() {
            return;
        }
        self.render();
        if self.step() == DrawerStep::PaymentQr {
            self.spawn_qr_refresh();
        }
    }

    /// Cancels both timers; in-flight requests complete as stale.
    pub fn close(&self) {
        self.inner.resend_timer.borrow_mut().cancel();
        self.inner.qr_timer.borrow_mut().cancel();
        self.inner.controller.borrow_mut().close();
        self.render();
    }

    // ── Verification ──

    pub async fn submit_phone(&self, raw_phone: &str) -> Result<Completion, FlowError> {
        let begun = self.inner.controller.borrow_mut().begin_send(raw_phone);
        let (ticket, request) = self.rendered(begun)?;

        let result = self.inner.api.send_otp(&request).await.map(drop);
        if let Err(err) = &result {
            warn!("send otp failed: {err}");
        }

        let completion = self.inner.controller.borrow_mut().complete_send(ticket, result);
        if completion == Completion::Succeeded {
            if let Err(err) = self.inner.storage.set_current_phone(&request.phone_number) {
                warn!("failed to remember current phone: {err:#}");
            }
            self.start_resend_timer();
        }
        self.render();
        Ok(completion)
    }

    pub async fn resend(&self) -> Result<Completion, FlowError> {
        let begun = self.inner.controller.borrow_mut().begin_resend();
        let (ticket, request) = self.rendered(begun)?;

        let result = self.inner.api.resend_otp(&request).await.map(drop);
        if let Err(err) = &result {
            warn!("resend otp failed: {err}");
        }

        let completion = self
            .inner
            .controller
            .borrow_mut()
            .complete_resend(ticket, result);
        if completion == Completion::Succeeded {
            self.start_resend_timer();
        }
        self.render();
        Ok(completion)
    }

    pub async fn verify(&self) -> Result<Completion, FlowError> {
        let begun = self.inner.controller.borrow_mut().begin_verify();
        let (ticket, submission) = self.rendered(begun)?;

        let request = VerifyOtpRequest {
            phone_number: submission.phone_number,
            country_code: submission.country_code,
            otp: submission.otp,
            browser_data: self.inner.host.browser_data(),
            request_time: self.inner.host.now_iso(),
        };
        let result = self.inner.api.verify_otp(&request).await.map(drop);
        if let Err(err) = &result {
            warn!("otp verification failed: {err}");
        }

        let now = self.inner.host.now_epoch_ms();
        let completion = self
            .inner
            .controller
            .borrow_mut()
            .complete_verify(ticket, result, now);
        if completion == Completion::Succeeded {
            self.inner.resend_timer.borrow_mut().cancel();
            let record = self.inner.controller.borrow().verified().cloned();
            if let Some(record) = record {
                info!("phone verified");
                if let Err(err) = self.inner.storage.save_verified_session(&record) {
                    warn!("failed to persist verification: {err:#}");
                }
            }
        }
        self.render();
        Ok(completion)
    }

    pub fn back_to_phone(&self) -> Result<(), FlowError> {
        self.inner.controller.borrow_mut().back_to_phone()?;
        self.inner.resend_timer.borrow_mut().cancel();
        self.render();
        Ok(())
    }

    // ── Payment ──

    pub fn continue_to_payment(&self) -> Result<(), FlowError> {
        self.inner.controller.borrow_mut().continue_to_payment()?;
        self.render();
        self.spawn_qr_refresh();
        Ok(())
    }

    /// Requests a QR for the current cart total, or the fallback amount
    /// when the cart is empty or unpriced.
    pub async fn refresh_qr(&self) -> Result<Completion, FlowError> {
        let snapshot = CartSnapshot::load(&self.inner.storage).unwrap_or_else(|err| {
            warn!("failed to read cart: {err:#}");
            CartSnapshot::default()
        });
        let amount = snapshot.payable_amount(self.inner.config.fallback_amount());

        let begun = self.inner.controller.borrow_mut().begin_qr_refresh(amount);
        let (ticket, submission) = self.rendered(begun)?;
        self.inner.qr_timer.borrow_mut().cancel();
        debug!("requesting payment qr for {}", amount.display());

        let request = GenerateQrRequest {
            amount: submission.amount.as_rupees(),
            phone_number: submission.phone_number,
            browser_data: self.inner.host.browser_data(),
            transaction_note: self.inner.config.transaction_note.clone(),
        };
        let result = self.inner.api.generate_qr(&request).await;
        if let Err(err) = &result {
            warn!("qr generation failed: {err}");
        }

        let completion = self.inner.controller.borrow_mut().complete_qr(ticket, result);
        if completion != Completion::Stale {
            self.start_qr_timer();
        }
        self.render();
        Ok(completion)
    }

    pub fn forget_verification(&self) -> Result<(), FlowError> {
        self.inner.controller.borrow_mut().forget_verification()?;
        self.inner.qr_timer.borrow_mut().cancel();
        if let Err(err) = self.inner.storage.clear_verified_session() {
            warn!("failed to clear verification: {err:#}");
        }
        self.render();
        Ok(())
    }

    // ── Input ──

    /// Applies a synchronous edit (OTP cells, country picker) and re-renders.
    pub fn update<R>(&self, edit: impl FnOnce(&mut DrawerController) -> R) -> R {
        let out = edit(&mut self.inner.controller.borrow_mut());
        self.render();
        out
    }

    pub fn with<R>(&self, read: impl FnOnce(&DrawerController) -> R) -> R {
        read(&self.inner.controller.borrow())
    }

    pub fn step(&self) -> DrawerStep {
        self.inner.controller.borrow().step()
    }

    // ── Internals ──

    fn render(&self) {
        let focus = self.inner.controller.borrow_mut().take_focus();
        let controller = self.inner.controller.borrow();
        self.inner.view.render(&controller, focus);
    }

    /// Renders either way so a rejected action shows its notice.
    fn rendered<T>(&self, begun: Result<T, FlowError>) -> Result<T, FlowError> {
        self.render();
        begun
    }

    fn spawn_qr_refresh(&self) {
        let session = self.clone();
        self.inner.scheduler.spawn(Box::pin(async move {
            if let Err(err) = session.refresh_qr().await {
                debug!("qr refresh skipped: {err}");
            }
        }));
    }

    fn start_resend_timer(&self) {
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.every(
            TICK,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    DrawerSession { inner }.on_resend_tick();
                }
            }),
        );
        self.inner.resend_timer.borrow_mut().replace(handle);
    }

    fn on_resend_tick(&self) {
        let tick = self.inner.controller.borrow_mut().tick_resend();
        match tick {
            Tick::Idle => {}
            Tick::Running(_) => self.render(),
            Tick::Finished => {
                self.render();
                // The handle may not be dropped from inside its own callback.
                let session = self.clone();
                self.inner.scheduler.spawn(Box::pin(async move {
                    if !session.inner.controller.borrow().resend_active() {
                        session.inner.resend_timer.borrow_mut().cancel();
                    }
                }));
            }
        }
    }

    fn start_qr_timer(&self) {
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.every(
            TICK,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    DrawerSession { inner }.on_qr_tick();
                }
            }),
        );
        self.inner.qr_timer.borrow_mut().replace(handle);
    }

    fn on_qr_tick(&self) {
        let tick = self.inner.controller.borrow_mut().tick_qr();
        match tick {
            Tick::Idle => {}
            Tick::Running(_) => self.render(),
            Tick::Finished => self.spawn_qr_refresh(),
        }
    }
}

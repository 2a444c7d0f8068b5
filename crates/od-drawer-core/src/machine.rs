//! Drawer state machine.
//!
//! Steps: `Closed` → `PhoneEntry` → `OtpEntry` → `Success` → `PaymentQr`.
//! Every network step is split into `begin_*`, which validates and hands out
//! the request plus a `Ticket`, and `complete_*`, which applies the result
//! only when the ticket still matches the current generation. Nothing here
//! awaits or touches the DOM; see `session` for the async side.

use od_api_types::{GenerateQrResponse, SendOtpRequest};
use od_storage::VerifiedSessionRecord;
use std::rc::Rc;

use crate::cart::Amount;
use crate::config::DrawerConfig;
use crate::country::{self, CountryPicker};
use crate::error::{ApiError, FlowError};
use crate::otp::{FocusTarget, OtpCells};
use crate::timer::{Countdown, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerStep {
    Closed,
    PhoneEntry,
    OtpEntry,
    Success,
    PaymentQr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Generation a request was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Issued before a close, back or reopen; ignored.
    Stale,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSubmission {
    pub phone_number: String,
    pub country_code: String,
    pub otp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrSubmission {
    pub amount: Amount,
    /// International form, e.g. `+919876543210`.
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentQr {
    pub image: String,
    pub pay_url: Option<String>,
    pub merchant_name: Option<String>,
}

impl PaymentQr {
    fn from_response(response: GenerateQrResponse) -> Self {
        let upi = response.upi_details.unwrap_or_default();
        Self {
            image: response.qr_code.unwrap_or_default(),
            pay_url: upi.pay_url(),
            merchant_name: upi.merchant_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrImage {
    Idle,
    Loading,
    Ready(PaymentQr),
    /// Generation failed; the view shows the configured placeholder.
    Placeholder,
}

pub struct DrawerController {
    config: Rc<DrawerConfig>,
    step: DrawerStep,
    generation: u64,
    busy: bool,
    picker: CountryPicker,
    pending: Option<SendOtpRequest>,
    verified: Option<VerifiedSessionRecord>,
    otp: OtpCells,
    resend: Countdown,
    qr_countdown: Countdown,
    qr: QrImage,
    amount: Option<Amount>,
    notice: Option<Notice>,
    focus: Option<FocusTarget>,
}

impl DrawerController {
    pub fn new(config: Rc<DrawerConfig>) -> Self {
        Self {
            picker: CountryPicker::new(&config.default_country_code),
            resend: Countdown::new(config.resend_seconds),
            qr_countdown: Countdown::new(config.qr_refresh_seconds),
            config,
            step: DrawerStep::Closed,
            generation: 0,
            busy: false,
            pending: None,
            verified: None,
            otp: OtpCells::default(),
            qr: QrImage::Idle,
            amount: None,
            notice: None,
            focus: None,
        }
    }

    // ── Open / close ──

    /// A remembered verification skips straight to the payment step.
    pub fn open(&mut self, verified: Option<VerifiedSessionRecord>) -> Result<Ticket, FlowError> {
        if self.step != DrawerStep::Closed {
            return Err(FlowError::WrongStep);
        }
        self.generation += 1;
        self.notice = None;
        match verified {
            Some(record) => {
                self.verified = Some(record);
                self.step = DrawerStep::PaymentQr;
                self.qr = QrImage::Loading;
            }
            None => {
                self.verified = None;
                self.step = DrawerStep::PhoneEntry;
                self.focus = Some(FocusTarget::PhoneInput);
            }
        }
        Ok(self.ticket())
    }

    /// Drops all per-visit state. The durable verified record is untouched.
    pub fn close(&mut self) {
        self.generation += 1;
        self.step = DrawerStep::Closed;
        self.busy = false;
        self.pending = None;
        self.otp.clear();
        self.resend.reset();
        self.qr_countdown.reset();
        self.qr = QrImage::Idle;
        self.amount = None;
        self.notice = None;
        self.focus = None;
        self.picker.close();
    }

    // ── Phone entry ──

    pub fn begin_send(&mut self, raw_phone: &str) -> Result<(Ticket, SendOtpRequest), FlowError> {
        self.guard(DrawerStep::PhoneEntry)?;
        let phone = match country::validate_phone(raw_phone, self.config.min_phone_length) {
            Ok(phone) => phone,
            Err(err) => return Err(self.reject(err, FocusTarget::PhoneInput)),
        };
        let request = SendOtpRequest {
            phone_number: phone,
            country_code: self.picker.selected().code.to_owned(),
        };
        self.pending = Some(request.clone());
        self.busy = true;
        self.notice = Some(Notice::info("Sending code..."));
        Ok((self.ticket(), request))
    }

    pub fn complete_send(&mut self, ticket: Ticket, result: Result<(), ApiError>) -> Completion {
        if !self.accepts(ticket) {
            return Completion::Stale;
        }
        self.busy = false;
        match result {
            Ok(()) => {
                self.step = DrawerStep::OtpEntry;
                self.otp.clear();
                self.resend.start();
                self.focus = Some(FocusTarget::OtpCell(0));
                self.notice = self
                    .pending_display()
                    .map(|number| Notice::info(format!("Code sent to {number}")));
                Completion::Succeeded
            }
            Err(err) => {
                self.notice = Some(Notice::error(err.user_message()));
                self.focus = Some(FocusTarget::PhoneInput);
                Completion::Failed
            }
        }
    }

    // ── OTP entry ──

    pub fn begin_resend(&mut self) -> Result<(Ticket, SendOtpRequest), FlowError> {
        self.guard(DrawerStep::OtpEntry)?;
        if !self.resend.is_elapsed() {
            return Err(FlowError::ResendNotReady {
                seconds: self.resend.remaining(),
            });
        }
        let request = self.pending.clone().ok_or(FlowError::WrongStep)?;
        self.busy = true;
        Ok((self.ticket(), request))
    }

    /// A failed resend leaves the countdown at zero so it can be retried.
    pub fn complete_resend(&mut self, ticket: Ticket, result: Result<(), ApiError>) -> Completion {
        if !self.accepts(ticket) {
            return Completion::Stale;
        }
        self.busy = false;
        match result {
            Ok(()) => {
                self.resend.start();
                self.otp.clear();
                self.focus = Some(FocusTarget::OtpCell(0));
                self.notice = Some(Notice::info("A new code has been sent"));
                Completion::Succeeded
            }
            Err(err) => {
                self.notice = Some(Notice::error(err.user_message()));
                Completion::Failed
            }
        }
    }

    pub fn back_to_phone(&mut self) -> Result<(), FlowError> {
        if self.step != DrawerStep::OtpEntry {
            return Err(FlowError::WrongStep);
        }
        self.generation += 1;
        self.step = DrawerStep::PhoneEntry;
        self.busy = false;
        self.otp.clear();
        self.resend.reset();
        self.notice = None;
        self.focus = Some(FocusTarget::PhoneInput);
        Ok(())
    }

    pub fn begin_verify(&mut self) -> Result<(Ticket, OtpSubmission), FlowError> {
        self.guard(DrawerStep::OtpEntry)?;
        let Some(otp) = self.otp.code() else {
            let cell = self.otp.first_empty().unwrap_or(0);
            return Err(self.reject(FlowError::OtpIncomplete, FocusTarget::OtpCell(cell)));
        };
        let pending = self.pending.as_ref().ok_or(FlowError::WrongStep)?;
        let submission = OtpSubmission {
            phone_number: pending.phone_number.clone(),
            country_code: pending.country_code.clone(),
            otp,
        };
        self.busy = true;
        self.notice = Some(Notice::info("Verifying..."));
        Ok((self.ticket(), submission))
    }

    /// On failure the cells are cleared and focus returns to the first one.
    pub fn complete_verify(
        &mut self,
        ticket: Ticket,
        result: Result<(), ApiError>,
        now_epoch_ms: u64,
    ) -> Completion {
        if !self.accepts(ticket) {
            return Completion::Stale;
        }
        self.busy = false;
        self.otp.clear();
        match result {
            Ok(()) => {
                self.verified = self.pending.as_ref().map(|p| VerifiedSessionRecord {
                    phone_number: p.phone_number.clone(),
                    country_code: p.country_code.clone(),
                    verified_at_epoch_ms: now_epoch_ms,
                });
                self.step = DrawerStep::Success;
                self.resend.reset();
                self.focus = Some(FocusTarget::ContinueButton);
                self.notice = Some(Notice::success("Phone number verified"));
                Completion::Succeeded
            }
            Err(err) => {
                self.focus = Some(FocusTarget::OtpCell(0));
                self.notice = Some(Notice::error(err.user_message()));
                Completion::Failed
            }
        }
    }

    pub fn continue_to_payment(&mut self) -> Result<(), FlowError> {
        self.guard(DrawerStep::Success)?;
        self.step = DrawerStep::PaymentQr;
        self.qr = QrImage::Loading;
        self.notice = None;
        Ok(())
    }

    // ── Payment ──

    /// "Use a different number": back to phone entry without the remembered
    /// verification.
    pub fn forget_verification(&mut self) -> Result<(), FlowError> {
        if self.step != DrawerStep::PaymentQr {
            return Err(FlowError::WrongStep);
        }
        self.generation += 1;
        self.step = DrawerStep::PhoneEntry;
        self.busy = false;
        self.verified = None;
        self.pending = None;
        self.qr_countdown.reset();
        self.qr = QrImage::Idle;
        self.amount = None;
        self.notice = None;
        self.focus = Some(FocusTarget::PhoneInput);
        Ok(())
    }

    pub fn begin_qr_refresh(&mut self, amount: Amount) -> Result<(Ticket, QrSubmission), FlowError> {
        self.guard(DrawerStep::PaymentQr)?;
        let phone_number = self
            .verified
            .as_ref()
            .map(|v| country::international(&v.country_code, &v.phone_number))
            .ok_or(FlowError::WrongStep)?;
        self.busy = true;
        self.amount = Some(amount);
        self.qr_countdown.reset();
        if !matches!(self.qr, QrImage::Ready(_)) {
            self.qr = QrImage::Loading;
        }
        Ok((
            self.ticket(),
            QrSubmission {
                amount,
                phone_number,
            },
        ))
    }

    /// Success or failure, the refresh countdown restarts so a failed QR is
    /// retried on the next cycle.
    pub fn complete_qr(
        &mut self,
        ticket: Ticket,
        result: Result<GenerateQrResponse, ApiError>,
    ) -> Completion {
        if !self.accepts(ticket) {
            return Completion::Stale;
        }
        self.busy = false;
        self.qr_countdown.start();
        match result {
            Ok(response) => {
                self.qr = QrImage::Ready(PaymentQr::from_response(response));
                self.notice = None;
                Completion::Succeeded
            }
            Err(err) => {
                self.qr = QrImage::Placeholder;
                self.notice = Some(Notice::error(format!(
                    "Could not generate the payment QR. {}",
                    err.user_message()
                )));
                Completion::Failed
            }
        }
    }

    // ── Timers ──

    pub fn tick_resend(&mut self) -> Tick {
        if self.step != DrawerStep::OtpEntry {
            return Tick::Idle;
        }
        self.resend.tick()
    }

    pub fn tick_qr(&mut self) -> Tick {
        if self.step != DrawerStep::PaymentQr || self.busy {
            return Tick::Idle;
        }
        self.qr_countdown.tick()
    }

    // ── Input ──

    pub fn otp_input(&mut self, index: usize, raw: &str) {
        if let Some(target) = self.otp.input(index, raw) {
            self.focus = Some(target);
        }
    }

    pub fn otp_backspace(&mut self, index: usize) {
        if let Some(target) = self.otp.backspace(index) {
            self.focus = Some(target);
        }
    }

    pub fn picker_mut(&mut self) -> &mut CountryPicker {
        &mut self.picker
    }

    /// Pending focus request, consumed by the view.
    pub fn take_focus(&mut self) -> Option<FocusTarget> {
        self.focus.take()
    }

    // ── Accessors ──

    pub fn step(&self) -> DrawerStep {
        self.step
    }

    pub fn is_open(&self) -> bool {
        self.step != DrawerStep::Closed
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn picker(&self) -> &CountryPicker {
        &self.picker
    }

    pub fn otp(&self) -> &OtpCells {
        &self.otp
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn resend_remaining(&self) -> u32 {
        self.resend.remaining()
    }

    pub fn resend_active(&self) -> bool {
        self.resend.is_active()
    }

    pub fn can_resend(&self) -> bool {
        self.step == DrawerStep::OtpEntry && !self.busy && self.resend.is_elapsed()
    }

    pub fn qr_remaining(&self) -> u32 {
        self.qr_countdown.remaining()
    }

    pub fn qr(&self) -> &QrImage {
        &self.qr
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    pub fn verified(&self) -> Option<&VerifiedSessionRecord> {
        self.verified.as_ref()
    }

    /// `+91 9876543210` for the number the code was sent to.
    pub fn pending_display(&self) -> Option<String> {
        self.pending
            .as_ref()
            .map(|p| country::display_phone(&p.country_code, &p.phone_number))
    }

    pub fn config(&self) -> &DrawerConfig {
        &self.config
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
        }
    }

    fn accepts(&self, ticket: Ticket) -> bool {
        ticket.generation == self.generation && self.step != DrawerStep::Closed
    }

    fn guard(&self, step: DrawerStep) -> Result<(), FlowError> {
        if self.step != step {
            return Err(FlowError::WrongStep);
        }
        if self.busy {
            return Err(FlowError::Busy);
        }
        Ok(())
    }

    fn reject(&mut self, err: FlowError, focus: FocusTarget) -> FlowError {
        self.notice = Some(Notice::error(err.to_string()));
        self.focus = Some(focus);
        err
    }
}

//! Event binding.
//!
//! Wires the drawer's listeners to the session. Async actions are spawned
//! with `wasm_bindgen_futures::spawn_local`; everything else goes through
//! `Session::update` so the view re-renders after each change.
//! To add new events, add a `listen` call here.

use od_drawer_core::FlowError;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, EventTarget, KeyboardEvent};

use crate::dom::{self, Elements};
use crate::state::Session;

/// Attach a listener for the page lifetime.
pub fn listen(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), JsValue> {
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

/// Helper: run an async session method on click.
macro_rules! on_click_async {
    ($el:expr, $session:expr, $method:ident) => {{
        let session = $session.clone();
        listen(&$el, "click", move |_: Event| {
            let session = session.clone();
            wasm_bindgen_futures::spawn_local(async move {
                report(session.$method().await.map(drop));
            });
        })?;
    }};
}

/// Helper: run a sync session action on click.
macro_rules! on_click {
    ($el:expr, $session:expr, $action:expr) => {{
        let session = $session.clone();
        listen(&$el, "click", move |_: Event| {
            report($action(&session));
        })?;
    }};
}

/// Validation failures are already rendered as notices.
fn report(result: Result<(), FlowError>) {
    if let Err(err) = result {
        gloo_console::debug!(format!("drawer: {}", err));
    }
}

fn submit_phone(session: &Session, els: &Elements) {
    let session = session.clone();
    let phone = els.phone_input.value();
    wasm_bindgen_futures::spawn_local(async move {
        report(session.submit_phone(&phone).await.map(drop));
    });
}

/// Bind all drawer listeners. Call once after init.
pub fn bind_events(els: &Elements, session: &Session) -> Result<(), JsValue> {
    // ── Open / close ──
    on_click!(els.close_btn, session, |s: &Session| {
        s.close();
        Ok(())
    });
    on_click!(els.overlay, session, |s: &Session| {
        s.close();
        Ok(())
    });
    {
        let session = session.clone();
        listen(&dom::document(), "keydown", move |e: Event| {
            let Some(key) = e.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key) else {
                return;
            };
            if key == "Escape" && session.with(|d| d.is_open()) {
                session.close();
            }
        })?;
    }

    // ── Phone entry ──
    {
        let (session, els2) = (session.clone(), els.clone());
        listen(&els.send_otp_btn, "click", move |_: Event| {
            submit_phone(&session, &els2);
        })?;
    }
    {
        let (session, els2) = (session.clone(), els.clone());
        listen(&els.phone_input, "keydown", move |e: Event| {
            if e.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key).as_deref() == Some("Enter") {
                e.prevent_default();
                submit_phone(&session, &els2);
            }
        })?;
    }
    bind_country_picker(els, session)?;

    // ── OTP entry ──
    for (index, input) in els.otp_inputs.iter().enumerate() {
        {
            let (session, input2) = (session.clone(), input.clone());
            listen(input, "input", move |_: Event| {
                let raw = input2.value();
                session.update(|d| d.otp_input(index, &raw));
            })?;
        }
        {
            let (session, input2) = (session.clone(), input.clone());
            listen(input, "keydown", move |e: Event| {
                let backspace = e.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key).as_deref()
                    == Some("Backspace");
                if backspace && input2.value().is_empty() {
                    session.update(|d| d.otp_backspace(index));
                }
            })?;
        }
    }
    on_click_async!(els.verify_otp_btn, session, verify);
    on_click_async!(els.resend_otp_btn, session, resend);
    on_click!(els.back_to_phone_btn, session, |s: &Session| s.back_to_phone());

    // ── Success / payment ──
    on_click!(els.continue_btn, session, |s: &Session| s.continue_to_payment());
    on_click!(els.change_number_btn, session, |s: &Session| s.forget_verification());

    Ok(())
}

fn bind_country_picker(els: &Elements, session: &Session) -> Result<(), JsValue> {
    {
        let session = session.clone();
        listen(&els.country_toggle, "click", move |e: Event| {
            e.stop_propagation();
            session.update(|d| d.picker_mut().toggle());
        })?;
    }

    // Clicks inside the dropdown must not reach the document handler below.
    listen(&els.country_dropdown, "click", |e: Event| e.stop_propagation())?;
    {
        let session = session.clone();
        listen(&dom::document(), "click", move |_: Event| {
            if session.with(|d| d.picker().is_open()) {
                session.update(|d| d.picker_mut().close());
            }
        })?;
    }

    {
        let (session, search) = (session.clone(), els.country_search.clone());
        listen(&els.country_search, "input", move |_: Event| {
            let query = search.value();
            session.update(|d| d.picker_mut().set_query(&query));
        })?;
    }
    {
        let session = session.clone();
        listen(&els.country_list, "click", move |e: Event| {
            let name = e
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|t| t.closest(".country-option").ok().flatten())
                .and_then(|option| option.get_attribute("data-country"));
            if let Some(name) = name {
                session.update(|d| {
                    d.picker_mut().select(&name);
                });
            }
        })?;
    }
    Ok(())
}

use std::rc::Rc;

use super::*;
use crate::net::claims::Claims;
use crate::state::events::AuthEvent;
use crate::testing::{Harness, member_tokens};

fn signed_out_harness() -> Harness {
    let mut h = Harness::new();
    let _handle = h.machine.start();
    h.run();
    h
}

#[test]
fn loading_state_renders_placeholder() {
    assert_eq!(decide(&AuthState::checking()), GuardView::Loading);
}

#[test]
fn signed_out_state_redirects() {
    assert_eq!(decide(&AuthState::signed_out()), GuardView::Redirecting);
}

#[test]
fn member_sees_content_and_outsider_is_denied() {
    assert_eq!(decide(&AuthState::authenticated(Claims::default(), true)), GuardView::Content);
    assert_eq!(decide(&AuthState::authenticated(Claims::default(), false)), GuardView::AccessDenied);
}

#[test]
fn location_path_keeps_query_and_hash() {
    assert_eq!(location_path("/vault/item/42", "", ""), "/vault/item/42");
    assert_eq!(location_path("/vault", "?tab=shared", "#top"), "/vault?tab=shared#top");
    assert_eq!(location_path("/vault", "tab=shared", ""), "/vault?tab=shared");
    assert_eq!(location_path("", "", ""), "/");
}

#[test]
fn repeated_renders_start_sign_in_once() {
    let h = signed_out_harness();
    let guard = RouteGuard::new(h.machine.clone());

    for _ in 0..5 {
        assert_eq!(guard.evaluate(&h.machine.state(), "/vault/item/42"), GuardView::Redirecting);
    }

    assert_eq!(h.gateway.sign_in_calls.get(), 1);
    assert_eq!(h.machine.redirects().peek().as_deref(), Some("/vault/item/42"));
}

#[test]
fn loading_has_no_side_effects() {
    let h = Harness::new();
    let guard = RouteGuard::new(h.machine.clone());

    assert_eq!(guard.evaluate(&AuthState::checking(), "/vault"), GuardView::Loading);
    assert_eq!(h.gateway.sign_in_calls.get(), 0);
    assert!(h.machine.redirects().peek().is_none());
}

#[test]
fn access_denied_does_not_redirect() {
    let h = Harness::new();
    let guard = RouteGuard::new(h.machine.clone());

    let state = AuthState::authenticated(Claims::default(), false);
    assert_eq!(guard.evaluate(&state, "/vault"), GuardView::AccessDenied);
    assert_eq!(guard.evaluate(&state, "/vault"), GuardView::AccessDenied);
    assert_eq!(h.gateway.sign_in_calls.get(), 0);
}

#[test]
fn a_new_guard_may_redirect_again() {
    let h = signed_out_harness();

    RouteGuard::new(h.machine.clone()).evaluate(&h.machine.state(), "/a");
    RouteGuard::new(h.machine.clone()).evaluate(&h.machine.state(), "/b");

    assert_eq!(h.gateway.sign_in_calls.get(), 2);
    assert_eq!(h.machine.redirects().peek().as_deref(), Some("/b"));
}

#[test]
fn sign_out_does_not_start_a_new_sign_in() {
    let mut h = Harness::new();
    *h.gateway.tokens.borrow_mut() = Some(member_tokens());
    let _handle = h.machine.start();
    h.run();

    let guard = Rc::new(RouteGuard::new(h.machine.clone()));
    let watcher = Rc::clone(&guard);
    let _sub = h.machine.watch(move |state| {
        watcher.evaluate(state, "/");
    });

    h.pool.run_until(h.machine.sign_out());

    assert_eq!(h.gateway.sign_out_calls.get(), 1);
    assert_eq!(h.gateway.sign_in_calls.get(), 0);
    assert!(h.machine.redirects().peek().is_none());
    assert_eq!(guard.evaluate(&h.machine.state(), "/"), GuardView::Redirecting);
    assert_eq!(h.gateway.sign_in_calls.get(), 0);
}

#[test]
fn guard_redirects_again_after_a_later_sign_in_event() {
    let mut h = Harness::new();
    *h.gateway.tokens.borrow_mut() = Some(member_tokens());
    let _handle = h.machine.start();
    h.run();
    h.pool.run_until(h.machine.sign_out());

    let guard = Rc::new(RouteGuard::new(h.machine.clone()));
    let watcher = Rc::clone(&guard);
    let _sub = h.machine.watch(move |state| {
        watcher.evaluate(state, "/vault");
    });
    h.bus.publish(AuthEvent::SignedIn);
    h.run();

    assert!(!h.machine.is_signing_out());
    assert_eq!(h.gateway.sign_in_calls.get(), 1);
}

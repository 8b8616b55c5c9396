mod common;

use common::{FakeBackend, Harness};
use shared::capabilities::UiSignal;
use shared::{Event, ScreenView, ViewTag};

const HOME: &str = "https://app.test/";
const DARK_MODE_KEY: &str = "settings:darkMode";

#[test]
fn theme_defaults_to_light() {
    let mut h = Harness::started(FakeBackend::default(), HOME);

    assert!(!h.view().dark_mode);
    assert!(h
        .take_signals()
        .contains(&UiSignal::ThemeChanged { dark: false }));
}

#[test]
fn toggle_persists_and_is_read_back_next_start() {
    let mut h = Harness::started(FakeBackend::default(), HOME);
    h.run(Event::OpenScreen {
        view: ViewTag::Settings,
    });
    h.take_signals();

    h.run(Event::DarkModeToggled);

    assert!(h.view().dark_mode);
    assert!(matches!(
        h.view().screen,
        ScreenView::Settings {
            dark_mode: true,
            ..
        }
    ));
    assert_eq!(h.take_signals(), vec![UiSignal::ThemeChanged { dark: true }]);
    assert_eq!(
        h.backend.kv.get(DARK_MODE_KEY).map(Vec::as_slice),
        Some(b"true".as_slice())
    );

    let backend = std::mem::take(&mut h.backend);
    let mut next = Harness::started(backend, HOME);
    assert!(next.view().dark_mode);
    assert!(next
        .take_signals()
        .contains(&UiSignal::ThemeChanged { dark: true }));
}

#[test]
fn toggling_twice_turns_it_back_off() {
    let mut h = Harness::started(FakeBackend::default(), HOME);

    h.run(Event::DarkModeToggled);
    h.run(Event::DarkModeToggled);

    assert!(!h.view().dark_mode);
    assert_eq!(
        h.backend.kv.get(DARK_MODE_KEY).map(Vec::as_slice),
        Some(b"false".as_slice())
    );
}

#[test]
fn malformed_stored_value_falls_back_to_light() {
    let mut backend = FakeBackend::default();
    backend
        .kv
        .insert(DARK_MODE_KEY.to_string(), b"{not json".to_vec());

    let h = Harness::started(backend, HOME);

    assert!(!h.view().dark_mode);
}

#[test]
fn theme_survives_sign_in_and_out() {
    let mut h = Harness::started(common::FakeBackend::with_account(), HOME);
    h.run(Event::DarkModeToggled);

    h.run(common::sign_in_event(common::PASSWORD));
    h.run(Event::SignOutRequested);

    assert!(h.view().dark_mode);
}

//! Fire-and-forget signals to the shell.
//!
//! These are the orchestrator's outward notifications. The shell applies
//! them to its chrome (document theme, header avatar, browser history) and
//! answers with nothing.

use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};

use crate::view_state::ViewTag;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum UiSignal {
    ViewChanged { view: ViewTag },
    AvatarChanged { url: Option<String> },
    SessionEnded,
    ThemeChanged { dark: bool },
    /// Rewrite the address bar in place, without adding a history entry.
    ReplaceUrl { path: String },
}

impl Operation for UiSignal {
    type Output = ();
}

#[derive(Capability)]
pub struct Notify<Ev> {
    context: CapabilityContext<UiSignal, Ev>,
}

impl<Ev> Notify<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<UiSignal, Ev>) -> Self {
        Self { context }
    }

    pub fn view_changed(&self, view: ViewTag) {
        self.send(UiSignal::ViewChanged { view });
    }

    pub fn avatar_changed(&self, url: Option<String>) {
        self.send(UiSignal::AvatarChanged { url });
    }

    pub fn session_ended(&self) {
        self.send(UiSignal::SessionEnded);
    }

    pub fn theme_changed(&self, dark: bool) {
        self.send(UiSignal::ThemeChanged { dark });
    }

    pub fn replace_url(&self, path: impl Into<String>) {
        self.send(UiSignal::ReplaceUrl { path: path.into() });
    }

    fn send(&self, signal: UiSignal) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(signal).await;
        });
    }
}

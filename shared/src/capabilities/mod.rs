//! Capabilities the core talks to its shell through.
//!
//! Render is Crux's built-in; the rest are typed request/response (or
//! fire-and-forget) channels whose operations the shell executes.

mod gateway;
mod kv;
mod notify;

pub use self::gateway::{Gateway, GatewayError, GatewayOperation, GatewayOutput, GatewayResult};
pub use self::kv::{KeyNamespace, KvError, KvKey, KvOperation, KvOutput, KvResult, Store};
pub use self::notify::{Notify, UiSignal};

pub use crux_core::render::Render;

use crate::event::Event;
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub gateway: Gateway<Event>,
    pub store: Store<Event>,
    pub notify: Notify<Event>,
}

//! Event polling and event watches
//!
//! Events are carried as the raw 128-byte `SDL_Event` union; only the leading
//! type tag is decoded. Watches are host closures the native library calls
//! synchronously whenever an event is added to the queue.

use crate::context::Context;
use crate::error::BinderyResult;
use crate::ffi::callbacks::{CallbackRegistry, CallbackShape, EventWatch, OwnerKey};
use crate::ffi::sys::{self, SDL_Event};
use crate::native::{check, NativeApi};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::os::raw::c_void;

/// Decoded event type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Quit,
    WindowCloseRequested,
    KeyDown,
    KeyUp,
    MouseMotion,
    MouseButtonDown,
    MouseButtonUp,
    /// Application-defined type at or above `SDL_EVENT_USER`
    User(u32),
    Other(u32),
}

impl From<u32> for EventType {
    fn from(raw: u32) -> Self {
        match raw {
            sys::SDL_EVENT_QUIT => EventType::Quit,
            sys::SDL_EVENT_WINDOW_CLOSE_REQUESTED => EventType::WindowCloseRequested,
            sys::SDL_EVENT_KEY_DOWN => EventType::KeyDown,
            sys::SDL_EVENT_KEY_UP => EventType::KeyUp,
            sys::SDL_EVENT_MOUSE_MOTION => EventType::MouseMotion,
            sys::SDL_EVENT_MOUSE_BUTTON_DOWN => EventType::MouseButtonDown,
            sys::SDL_EVENT_MOUSE_BUTTON_UP => EventType::MouseButtonUp,
            user @ sys::SDL_EVENT_USER..=sys::SDL_EVENT_LAST => EventType::User(user),
            other => EventType::Other(other),
        }
    }
}

impl From<EventType> for u32 {
    fn from(kind: EventType) -> Self {
        match kind {
            EventType::Quit => sys::SDL_EVENT_QUIT,
            EventType::WindowCloseRequested => sys::SDL_EVENT_WINDOW_CLOSE_REQUESTED,
            EventType::KeyDown => sys::SDL_EVENT_KEY_DOWN,
            EventType::KeyUp => sys::SDL_EVENT_KEY_UP,
            EventType::MouseMotion => sys::SDL_EVENT_MOUSE_MOTION,
            EventType::MouseButtonDown => sys::SDL_EVENT_MOUSE_BUTTON_DOWN,
            EventType::MouseButtonUp => sys::SDL_EVENT_MOUSE_BUTTON_UP,
            EventType::User(raw) | EventType::Other(raw) => raw,
        }
    }
}

// SDL_UserEvent: type, reserved, timestamp, windowID, code
const USER_CODE_OFFSET: usize = 20;

/// One polled event
#[derive(Clone)]
pub struct Event {
    pub kind: EventType,
    pub raw: [u8; sys::SDL_EVENT_SIZE],
}

impl Event {
    pub fn from_raw(raw: &SDL_Event) -> Self {
        Self {
            kind: raw.event_type().into(),
            raw: raw.bytes,
        }
    }

    /// A user event of type `kind` carrying `code`
    pub fn user(kind: u32, code: i32) -> Self {
        let mut raw = SDL_Event::zeroed();
        raw.set_event_type(kind);
        raw.bytes[USER_CODE_OFFSET..USER_CODE_OFFSET + 4].copy_from_slice(&code.to_ne_bytes());
        Self::from_raw(&raw)
    }

    /// `SDL_UserEvent.code`, for user events
    pub fn user_code(&self) -> Option<i32> {
        match self.kind {
            EventType::User(_) => {
                let mut code = [0u8; 4];
                code.copy_from_slice(&self.raw[USER_CODE_OFFSET..USER_CODE_OFFSET + 4]);
                Some(i32::from_ne_bytes(code))
            }
            _ => None,
        }
    }

    pub fn to_raw(&self) -> SDL_Event {
        SDL_Event { bytes: self.raw }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Queue access through a [`Context`]
pub struct EventPump<'a> {
    ctx: &'a Context,
}

impl<'a> EventPump<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Next queued event, if any
    pub fn poll(&self) -> Option<Event> {
        let mut raw = SDL_Event::zeroed();
        let api = self.ctx.api();
        unsafe { api.poll_event(&mut raw) }.then(|| Event::from_raw(&raw))
    }

    /// Drain the queue
    pub fn poll_iter(&self) -> impl Iterator<Item = Event> + '_ {
        std::iter::from_fn(move || self.poll())
    }

    /// Whether anything is waiting, without removing it
    pub fn has_pending(&self) -> bool {
        unsafe { self.ctx.api().poll_event(std::ptr::null_mut()) }
    }

    pub fn push(&self, event: &Event) -> BinderyResult<()> {
        let api = self.ctx.api();
        let mut raw = event.to_raw();
        check(&**api, "SDL_PushEvent", unsafe { api.push_event(&mut raw) })
    }

    /// Push an `SDL_EVENT_USER` event with `code`
    pub fn push_user_event(&self, code: i32) -> BinderyResult<()> {
        self.push(&Event::user(sys::SDL_EVENT_USER, code))
    }

    /// Reserve `count` consecutive user event types; returns the first
    pub fn register_user_events(&self, count: i32) -> BinderyResult<u32> {
        let api = self.ctx.api();
        match unsafe { api.register_events(count) } {
            0 => Err(crate::native::native_error(&**api, "SDL_RegisterEvents")),
            base => Ok(base),
        }
    }
}

/// Identity of an installed event watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

impl WatchId {
    fn slot(self) -> String {
        format!("watch-{}", self.0)
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

const WATCH_OWNER: OwnerKey = OwnerKey::new("event-watch", 0);

/// Event watches installed through one context
#[derive(Default)]
pub(crate) struct EventWatches {
    registry: CallbackRegistry,
    installed: RefCell<BTreeMap<WatchId, usize>>,
    next_id: Cell<u64>,
}

impl EventWatches {
    pub(crate) fn add(&self, api: &dyn NativeApi, mut watch: Box<dyn FnMut(&Event) -> bool>) -> BinderyResult<WatchId> {
        let id = WatchId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let mut userdata_addr = 0usize;
        self.registry.register::<EventWatch>(
            WATCH_OWNER,
            id.slot(),
            Box::new(move |raw: &SDL_Event| watch(&Event::from_raw(raw))),
            |filter, userdata| {
                check(api, "SDL_AddEventWatch", unsafe { api.add_event_watch(filter, userdata) })?;
                userdata_addr = userdata as usize;
                Ok(())
            },
        )?;

        self.installed.borrow_mut().insert(id, userdata_addr);
        tracing::debug!(%id, "event watch added");
        Ok(id)
    }

    /// Uninstall natively, then retire; `false` for an unknown id
    pub(crate) fn remove(&self, api: &dyn NativeApi, id: WatchId) -> bool {
        let Some(userdata) = self.installed.borrow_mut().remove(&id) else {
            return false;
        };
        unsafe { api.remove_event_watch(EventWatch::trampoline(), userdata as *mut c_void) };
        self.registry.retire(WATCH_OWNER, &id.slot())
    }

    pub(crate) fn remove_all(&self, api: &dyn NativeApi) -> usize {
        let ids: Vec<WatchId> = self.installed.borrow().keys().copied().collect();
        ids.into_iter().filter(|id| self.remove(api, *id)).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.installed.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tags() {
        assert_eq!(EventType::from(0x100), EventType::Quit);
        assert_eq!(EventType::from(0x401), EventType::MouseButtonDown);
        assert_eq!(EventType::from(0x8005), EventType::User(0x8005));
        assert_eq!(EventType::from(0x1234), EventType::Other(0x1234));
        assert_eq!(u32::from(EventType::KeyUp), 0x301);
    }

    #[test]
    fn test_user_event_carries_code() {
        let event = Event::user(sys::SDL_EVENT_USER + 1, -7);
        assert_eq!(event.kind, EventType::User(sys::SDL_EVENT_USER + 1));
        assert_eq!(event.user_code(), Some(-7));
        assert_eq!(event.to_raw().event_type(), sys::SDL_EVENT_USER + 1);
    }

    #[test]
    fn test_non_user_event_has_no_code() {
        let mut raw = SDL_Event::zeroed();
        raw.set_event_type(sys::SDL_EVENT_QUIT);
        assert_eq!(Event::from_raw(&raw).user_code(), None);
    }
}

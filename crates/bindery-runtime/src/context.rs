//! Entry point owning the native backend
//!
//! A [`Context`] picks the backend (from config or explicitly) and holds the
//! event-watch registry. Trays and property groups keep their own clone of the
//! backend, so they may outlive the context that created them. Fonts and text
//! engines share the context's SDL_ttf guard, and `TTF_Quit` runs only once
//! the last of them is gone.

use crate::error::BinderyResult;
use crate::events::{Event, EventPump, EventWatches, WatchId};
use crate::native::{DynamicApi, HeadlessApi, NativeApi};
use crate::ttf::TtfLibrary;
use bindery_config::{BackendKind, Config};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub struct Context {
    api: Rc<dyn NativeApi>,
    watches: EventWatches,
    ttf: RefCell<Option<Rc<TtfLibrary>>>,
}

impl Context {
    pub fn new(api: Rc<dyn NativeApi>) -> Self {
        tracing::debug!(backend = api.backend_name(), "context created");
        Self {
            api,
            watches: EventWatches::default(),
            ttf: RefCell::new(None),
        }
    }

    /// Build the backend named by `config`
    pub fn from_config(config: &Config) -> BinderyResult<Self> {
        let api: Rc<dyn NativeApi> = match config.backend() {
            BackendKind::Dynamic => Rc::new(DynamicApi::from_config(config)?),
            BackendKind::Headless => Rc::new(HeadlessApi::new()),
        };
        Ok(Self::new(api))
    }

    pub fn api(&self) -> &Rc<dyn NativeApi> {
        &self.api
    }

    pub fn backend_name(&self) -> &'static str {
        self.api.backend_name()
    }

    /// Let the platform process pending tray interaction
    pub fn update_trays(&self) {
        unsafe { self.api.update_trays() }
    }

    pub fn events(&self) -> EventPump<'_> {
        EventPump::new(self)
    }

    /// Call `watch` for every event added to the queue from now on.
    ///
    /// The return value of `watch` is ignored by the native library for
    /// watches; it exists for parity with event filters.
    pub fn add_event_watch(&self, watch: impl FnMut(&Event) -> bool + 'static) -> BinderyResult<WatchId> {
        self.watches.add(&*self.api, Box::new(watch))
    }

    /// `false` when `id` is not installed (already removed)
    pub fn remove_event_watch(&self, id: WatchId) -> bool {
        self.watches.remove(&*self.api, id)
    }

    pub fn event_watch_count(&self) -> usize {
        self.watches.len()
    }

    /// Initialize SDL_ttf once for this context and hand out a share of it
    pub(crate) fn ensure_ttf(&self) -> BinderyResult<Rc<TtfLibrary>> {
        let mut slot = self.ttf.borrow_mut();
        if let Some(library) = slot.as_ref() {
            return Ok(Rc::clone(library));
        }
        let library = TtfLibrary::init(Rc::clone(&self.api))?;
        *slot = Some(Rc::clone(&library));
        Ok(library)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let removed = self.watches.remove_all(&*self.api);
        if removed > 0 {
            tracing::debug!(removed, "event watches removed with context");
        }
        if let Some(library) = self.ttf.borrow_mut().take() {
            if Rc::strong_count(&library) > 1 {
                tracing::debug!("SDL_ttf kept alive past the context by open fonts");
            }
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("backend", &self.api.backend_name())
            .field("event_watches", &self.watches.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_config::BackendConfig;
    use std::cell::Cell;

    fn headless() -> (Rc<HeadlessApi>, Context) {
        let api = Rc::new(HeadlessApi::new());
        let ctx = Context::new(api.clone());
        (api, ctx)
    }

    #[test]
    fn test_from_config_headless() {
        let mut config = Config::default();
        config.project.backend = Some(BackendConfig {
            kind: Some(BackendKind::Headless),
        });
        let ctx = Context::from_config(&config).unwrap();
        assert_eq!(ctx.backend_name(), "headless");
    }

    #[test]
    fn test_watch_sees_pushed_events() {
        let (_api, ctx) = headless();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        ctx.add_event_watch(move |event| {
            sink.borrow_mut().push(event.user_code());
            true
        })
        .unwrap();

        ctx.events().push_user_event(3).unwrap();
        ctx.events().push_user_event(4).unwrap();
        assert_eq!(*seen.borrow(), vec![Some(3), Some(4)]);
    }

    #[test]
    fn test_removed_watch_is_silent() {
        let (api, ctx) = headless();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let id = ctx
            .add_event_watch(move |_| {
                counter.set(counter.get() + 1);
                true
            })
            .unwrap();

        assert!(ctx.remove_event_watch(id));
        assert!(!ctx.remove_event_watch(id));
        ctx.events().push_user_event(1).unwrap();
        assert_eq!(calls.get(), 0);
        assert_eq!(api.live_objects().event_watches, 0);
    }

    #[test]
    fn test_failed_watch_install_registers_nothing() {
        let (api, ctx) = headless();
        api.fail_next("SDL_AddEventWatch");
        let err = ctx.add_event_watch(|_| true).unwrap_err();
        assert_eq!(err.operation(), Some("SDL_AddEventWatch"));
        assert_eq!(ctx.event_watch_count(), 0);
    }

    #[test]
    fn test_drop_removes_watches() {
        let (api, ctx) = headless();
        ctx.add_event_watch(|_| true).unwrap();
        ctx.add_event_watch(|_| true).unwrap();
        assert_eq!(api.live_objects().event_watches, 2);
        drop(ctx);
        assert_eq!(api.live_objects().event_watches, 0);
    }
}

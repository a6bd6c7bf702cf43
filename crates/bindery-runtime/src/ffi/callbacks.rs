//! Callback trampolines - let the native library call host closures
//!
//! The native library takes a C function pointer plus a `void *userdata`.
//! Every callback shape gets one monomorphic `extern "C"` trampoline; the
//! userdata is a pointer to a reference-counted [`Trampoline`] that holds the
//! closure. A [`CallbackRegistry`] owns those trampolines, keyed by
//! `(owner, slot)`.
//!
//! # Lifetime rules
//!
//! - `register` installs the new trampoline on the native side first and only
//!   then retires the previous one for the same key.
//! - Retiring marks the trampoline dead (later invocations never reach host
//!   code) and drops the registry's reference. A call that is in flight holds
//!   its own reference, so the closure is freed after that call returns, never
//!   during it.
//! - Panics in host closures are caught at the trampoline and logged.
//! - Everything here is `!Send`. Each thread keeps its own table of the
//!   trampolines it created, and a native invocation is only routed when the
//!   userdata is in the calling thread's table. Calls arriving on any other
//!   thread (SDL may run event watches wherever an event is pushed) are
//!   refused with a warning and answered with the shape's fallback.

use crate::error::BinderyResult;
use crate::ffi::handle::{Handle, HandleKind};
use crate::ffi::sys;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::os::raw::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Which callback purpose on an owner a registration fills
pub type Slot = Cow<'static, str>;

/// The native object (or logical group) a registration is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerKey {
    kind: &'static str,
    addr: usize,
}

impl OwnerKey {
    pub const fn new(kind: &'static str, addr: usize) -> Self {
        Self { kind, addr }
    }

    pub fn of<K: HandleKind>(handle: Handle<K>) -> Self {
        Self::new(K::NAME, handle.addr())
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn addr(&self) -> usize {
        self.addr
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.kind, self.addr)
    }
}

/// Identity of one registration; never reused within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrampolineId(u64);

impl TrampolineId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrampolineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

thread_local! {
    // Userdata addresses of trampolines created on this thread and not yet freed
    static LIVE_TRAMPOLINES: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

fn owned_by_this_thread(addr: usize) -> bool {
    LIVE_TRAMPOLINES
        .try_with(|live| live.borrow().contains(&addr))
        .unwrap_or(false)
}

/// Heap cell the native userdata points at
pub struct Trampoline<C: ?Sized> {
    id: TrampolineId,
    retired: Cell<bool>,
    closure: RefCell<Box<C>>,
}

impl<C: ?Sized> Drop for Trampoline<C> {
    fn drop(&mut self) {
        let addr = self as *const Self as usize;
        // The table is already gone when the thread itself is exiting
        let _ = LIVE_TRAMPOLINES.try_with(|live| live.borrow_mut().remove(&addr));
    }
}

impl<C: ?Sized> Trampoline<C> {
    pub fn id(&self) -> TrampolineId {
        self.id
    }

    pub fn is_retired(&self) -> bool {
        self.retired.get()
    }
}

trait Retire {
    fn retire(&self);
}

impl<C: ?Sized> Retire for Trampoline<C> {
    fn retire(&self) {
        self.retired.set(true);
    }
}

/// A native callback signature and its trampoline
pub trait CallbackShape: 'static {
    /// Host closure type
    type Closure: ?Sized + 'static;

    /// Native function pointer type
    type FnPtr: Copy;

    /// C typedef name, used in diagnostics
    const NAME: &'static str;

    fn trampoline() -> Self::FnPtr;
}

/// `SDL_TrayCallback`
pub enum TrayAction {}

impl CallbackShape for TrayAction {
    type Closure = dyn FnMut(*mut sys::SDL_TrayEntry);
    type FnPtr = sys::SDL_TrayCallback;
    const NAME: &'static str = "SDL_TrayCallback";

    fn trampoline() -> Self::FnPtr {
        tray_trampoline
    }
}

/// `SDL_CleanupPropertyCallback`
pub enum PropertyCleanup {}

impl CallbackShape for PropertyCleanup {
    type Closure = dyn FnMut(*mut c_void);
    type FnPtr = sys::SDL_CleanupPropertyCallback;
    const NAME: &'static str = "SDL_CleanupPropertyCallback";

    fn trampoline() -> Self::FnPtr {
        cleanup_trampoline
    }
}

/// `SDL_EventFilter` used as an event watch
pub enum EventWatch {}

impl CallbackShape for EventWatch {
    type Closure = dyn FnMut(&sys::SDL_Event) -> bool;
    type FnPtr = sys::SDL_EventFilter;
    const NAME: &'static str = "SDL_EventFilter";

    fn trampoline() -> Self::FnPtr {
        event_watch_trampoline
    }
}

unsafe extern "C" fn tray_trampoline(userdata: *mut c_void, entry: *mut sys::SDL_TrayEntry) {
    dispatch::<TrayAction, _>(userdata, (), |closure| closure(entry))
}

unsafe extern "C" fn cleanup_trampoline(userdata: *mut c_void, value: *mut c_void) {
    dispatch::<PropertyCleanup, _>(userdata, (), |closure| closure(value))
}

unsafe extern "C" fn event_watch_trampoline(userdata: *mut c_void, event: *mut sys::SDL_Event) -> bool {
    if event.is_null() {
        return true;
    }
    let event = &*event;
    dispatch::<EventWatch, _>(userdata, true, |closure| closure(event))
}

/// Route a native invocation into the closure behind `userdata`.
///
/// # Safety
///
/// `userdata` must be null or a pointer produced by [`CallbackRegistry::register`]
/// for shape `S`. Pointers created on another thread, or already freed, are
/// refused before they are dereferenced.
unsafe fn dispatch<S, R>(userdata: *mut c_void, fallback: R, call: impl FnOnce(&mut S::Closure) -> R) -> R
where
    S: CallbackShape,
{
    if userdata.is_null() {
        tracing::warn!(shape = S::NAME, "callback invoked with null userdata");
        return fallback;
    }
    if !owned_by_this_thread(userdata as usize) {
        tracing::warn!(
            shape = S::NAME,
            thread = ?std::thread::current().id(),
            "refusing callback invocation outside its owning thread"
        );
        return fallback;
    }

    // Take a reference of our own for the duration of the call, so a closure
    // that retires itself cannot free the memory it is running from.
    let ptr = userdata as *const Trampoline<S::Closure>;
    Rc::increment_strong_count(ptr);
    let trampoline = Rc::from_raw(ptr);

    if trampoline.is_retired() {
        tracing::trace!(shape = S::NAME, id = %trampoline.id, "dropping call to retired trampoline");
        return fallback;
    }

    let result = match trampoline.closure.try_borrow_mut() {
        Ok(mut closure) => {
            tracing::trace!(shape = S::NAME, id = %trampoline.id, "invoking callback");
            match panic::catch_unwind(AssertUnwindSafe(|| call(&mut **closure))) {
                Ok(value) => value,
                Err(payload) => {
                    tracing::error!(
                        shape = S::NAME,
                        id = %trampoline.id,
                        message = panic_message(&payload),
                        "callback panicked; unwinding stopped at the native boundary"
                    );
                    fallback
                }
            }
        }
        Err(_) => {
            tracing::warn!(shape = S::NAME, id = %trampoline.id, "refusing re-entrant callback invocation");
            fallback
        }
    };

    drop(trampoline);
    result
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

struct Registration {
    id: TrampolineId,
    trampoline: Rc<dyn Retire>,
}

impl Registration {
    fn retire(self) {
        self.trampoline.retire();
    }
}

/// Keyed store of live trampolines
///
/// At most one registration exists per `(owner, slot)`. No internal borrow is
/// held while native code or host closures run, so closures may call back into
/// the registry (including to retire themselves).
#[derive(Default)]
pub struct CallbackRegistry {
    entries: RefCell<HashMap<(OwnerKey, Slot), Registration>>,
    next_id: Cell<u64>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `closure` as the callback for `(owner, slot)`.
    ///
    /// `install` receives the native trampoline and its userdata and must
    /// hand both to the native library. If it fails, nothing is stored and any
    /// previous registration for the key stays in place. If it succeeds, the
    /// previous registration is retired.
    pub fn register<S: CallbackShape>(
        &self,
        owner: OwnerKey,
        slot: impl Into<Slot>,
        closure: Box<S::Closure>,
        install: impl FnOnce(S::FnPtr, *mut c_void) -> BinderyResult<()>,
    ) -> BinderyResult<TrampolineId> {
        let slot = slot.into();
        let id = TrampolineId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let trampoline: Rc<Trampoline<S::Closure>> = Rc::new(Trampoline {
            id,
            retired: Cell::new(false),
            closure: RefCell::new(closure),
        });
        let userdata = Rc::as_ptr(&trampoline) as *mut c_void;
        LIVE_TRAMPOLINES.with(|live| live.borrow_mut().insert(userdata as usize));

        if let Err(e) = install(S::trampoline(), userdata) {
            tracing::debug!(%owner, slot = %slot, %id, error = %e, "callback install failed");
            trampoline.retire();
            return Err(e);
        }

        let previous = self.entries.borrow_mut().insert(
            (owner, slot.clone()),
            Registration {
                id,
                trampoline: trampoline as Rc<dyn Retire>,
            },
        );

        match previous {
            Some(previous) => {
                tracing::debug!(%owner, slot = %slot, %id, replaced = %previous.id, "callback replaced");
                previous.retire();
            }
            None => tracing::debug!(%owner, slot = %slot, %id, shape = S::NAME, "callback registered"),
        }

        Ok(id)
    }

    /// Retire the registration for `(owner, slot)`; `false` when there was none
    pub fn retire(&self, owner: OwnerKey, slot: &str) -> bool {
        let removed = self
            .entries
            .borrow_mut()
            .remove(&(owner, Cow::Owned(slot.to_string())));
        match removed {
            Some(registration) => {
                tracing::debug!(%owner, slot, id = %registration.id, "callback retired");
                registration.retire();
                true
            }
            None => false,
        }
    }

    /// Retire `(owner, slot)` only if it still holds registration `id`
    pub fn retire_exact(&self, owner: OwnerKey, slot: &str, id: TrampolineId) -> bool {
        let key = (owner, Cow::Owned(slot.to_string()));
        let removed = {
            let mut entries = self.entries.borrow_mut();
            match entries.get(&key) {
                Some(registration) if registration.id == id => entries.remove(&key),
                _ => None,
            }
        };
        match removed {
            Some(registration) => {
                tracing::debug!(%owner, slot, %id, "callback retired");
                registration.retire();
                true
            }
            None => false,
        }
    }

    /// Retire every registration of `owner`; returns how many were live
    pub fn retire_all(&self, owner: OwnerKey) -> usize {
        let removed: Vec<Registration> = {
            let mut entries = self.entries.borrow_mut();
            let keys: Vec<_> = entries.keys().filter(|(o, _)| *o == owner).cloned().collect();
            keys.iter().filter_map(|key| entries.remove(key)).collect()
        };
        let count = removed.len();
        if count > 0 {
            tracing::debug!(%owner, count, "callbacks retired for owner");
        }
        removed.into_iter().for_each(Registration::retire);
        count
    }

    /// Retire everything
    pub fn clear(&self) -> usize {
        let removed: Vec<Registration> = self.entries.borrow_mut().drain().map(|(_, r)| r).collect();
        let count = removed.len();
        removed.into_iter().for_each(Registration::retire);
        count
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Live registrations scoped to `owner`
    pub fn count_for(&self, owner: OwnerKey) -> usize {
        self.entries.borrow().keys().filter(|(o, _)| *o == owner).count()
    }

    pub fn contains(&self, owner: OwnerKey, slot: &str) -> bool {
        self.id_of(owner, slot).is_some()
    }

    /// Registration currently filling `(owner, slot)`
    pub fn id_of(&self, owner: OwnerKey, slot: &str) -> Option<TrampolineId> {
        self.entries
            .borrow()
            .get(&(owner, Cow::Owned(slot.to_string())))
            .map(|r| r.id)
    }
}

impl Drop for CallbackRegistry {
    fn drop(&mut self) {
        let count = self.clear();
        if count > 0 {
            tracing::debug!(count, "callback registry dropped with live registrations");
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("live", &self.len())
            .finish()
    }
}

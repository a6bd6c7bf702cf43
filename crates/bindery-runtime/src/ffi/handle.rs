//! Typed foreign handles
//!
//! `Handle<K>` is an opaque native address tagged with a zero-sized kind, so a
//! tray entry can never be passed where a menu is expected. Handles are plain
//! `Copy` aliases and own nothing.
//!
//! `HandleCell<K>` is the owning slot used by wrapper types: it is nulled when
//! the object is destroyed, and every access goes through [`HandleCell::live`],
//! which panics on a null slot. Using a destroyed native object is a
//! programming error; continuing would corrupt native memory.

use crate::ffi::sys;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Raw representation of a native handle: a pointer or an integer id
pub trait RawHandle: Copy + Eq + fmt::Debug {
    /// The null sentinel
    fn null() -> Self;

    /// Numeric address (or id) for keying and display
    fn addr(self) -> usize;

    fn is_null(self) -> bool {
        self == Self::null()
    }
}

impl<T> RawHandle for *mut T {
    fn null() -> Self {
        std::ptr::null_mut()
    }

    fn addr(self) -> usize {
        self as usize
    }
}

impl RawHandle for u32 {
    fn null() -> Self {
        0
    }

    fn addr(self) -> usize {
        self as usize
    }
}

/// Marker for one kind of native object
pub trait HandleKind: 'static {
    type Raw: RawHandle;

    /// C type name, used in diagnostics
    const NAME: &'static str;
}

macro_rules! handle_kinds {
    ($($(#[$meta:meta])* $kind:ident => $raw:ty, $name:literal;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $kind {}

            impl HandleKind for $kind {
                type Raw = $raw;
                const NAME: &'static str = $name;
            }
        )*
    };
}

handle_kinds! {
    /// A system tray icon
    TrayKind => *mut sys::SDL_Tray, "SDL_Tray";
    /// A tray menu (top-level or submenu)
    TrayMenuKind => *mut sys::SDL_TrayMenu, "SDL_TrayMenu";
    /// A tray menu entry
    TrayEntryKind => *mut sys::SDL_TrayEntry, "SDL_TrayEntry";
    /// A pixel surface
    SurfaceKind => *mut sys::SDL_Surface, "SDL_Surface";
    /// A loaded font
    FontKind => *mut sys::TTF_Font, "TTF_Font";
    /// A text object
    TextKind => *mut sys::TTF_Text, "TTF_Text";
    /// A text engine
    TextEngineKind => *mut sys::TTF_TextEngine, "TTF_TextEngine";
    /// A property group
    PropertiesKind => sys::SDL_PropertiesID, "SDL_PropertiesID";
}

/// Non-null native handle of kind `K`
pub struct Handle<K: HandleKind> {
    raw: K::Raw,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Handle<K> {
    /// Wrap a raw value; `None` for the null sentinel
    pub fn from_raw(raw: K::Raw) -> Option<Self> {
        if raw.is_null() {
            None
        } else {
            Some(Self {
                raw,
                _kind: PhantomData,
            })
        }
    }

    pub fn raw(self) -> K::Raw {
        self.raw
    }

    pub fn addr(self) -> usize {
        self.raw.addr()
    }

    pub fn kind_name(self) -> &'static str {
        K::NAME
    }
}

impl<K: HandleKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: HandleKind> Copy for Handle<K> {}

impl<K: HandleKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: HandleKind> Eq for Handle<K> {}

impl<K: HandleKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.addr().hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", K::NAME, self.raw.addr())
    }
}

/// Owning slot for a native handle
///
/// Single-threaded by construction (`Cell`), matching the native library's
/// thread affinity for the objects it holds.
pub struct HandleCell<K: HandleKind> {
    raw: Cell<K::Raw>,
}

impl<K: HandleKind> HandleCell<K> {
    pub fn new(handle: Handle<K>) -> Self {
        Self {
            raw: Cell::new(handle.raw()),
        }
    }

    /// A cell that is already destroyed
    pub fn null() -> Self {
        Self {
            raw: Cell::new(K::Raw::null()),
        }
    }

    /// The raw value for a native call.
    ///
    /// # Panics
    ///
    /// Panics if the handle was destroyed; `operation` names the caller.
    #[track_caller]
    pub fn live(&self, operation: &str) -> K::Raw {
        let raw = self.raw.get();
        if raw.is_null() {
            panic!("{} used after destroy in `{}`", K::NAME, operation);
        }
        raw
    }

    pub fn get(&self) -> Option<Handle<K>> {
        Handle::from_raw(self.raw.get())
    }

    pub fn is_live(&self) -> bool {
        !self.raw.get().is_null()
    }

    /// Null the slot and return what it held
    pub fn take(&self) -> Option<Handle<K>> {
        Handle::from_raw(self.raw.replace(K::Raw::null()))
    }

    /// Run the native destructor exactly once.
    ///
    /// The slot is nulled before `destructor` runs, so a re-entrant destroy
    /// from inside the destructor sees a dead handle. Returns `false` (and does
    /// nothing) when the slot was already null.
    pub fn destroy_with(&self, destructor: impl FnOnce(K::Raw)) -> bool {
        match self.take() {
            Some(handle) => {
                tracing::debug!(kind = K::NAME, addr = handle.addr(), "destroying native handle");
                destructor(handle.raw());
                true
            }
            None => false,
        }
    }
}

impl<K: HandleKind> fmt::Debug for HandleCell<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(handle) => write!(f, "{:?}", handle),
            None => write!(f, "{}(destroyed)", K::NAME),
        }
    }
}

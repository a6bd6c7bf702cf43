//! Bindery Runtime - lifecycle layer over the SDL3 C ABI
//!
//! This library provides:
//! - Phantom-typed native handles that die with their object
//! - A per-owner registry of callback trampolines
//! - The system tray resource tree (tray, menus, entries, submenus)
//! - Fixed-layout record codecs for structs exchanged with the library
//! - Thin wrappers for properties, events, fonts and text

/// Bindery runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod context;
pub mod error;
pub mod events;
pub mod ffi;
pub mod logging;
pub mod native;
pub mod properties;
pub mod surface;
pub mod tray;
pub mod ttf;

// Re-export commonly used types
pub use context::Context;
pub use error::{BinderyError, BinderyResult};
pub use events::{Event, EventPump, EventType, WatchId};
pub use ffi::{
    BinaryRecord, CallbackRegistry, Color, FColor, FPoint, ForeignPtr, GpuAtlasDrawSequence, Handle, HandleCell,
    HandleKind, ImageType, Ownership, PixelFormatDetails, Rect, SubString, SubStringFlags, TrampolineId,
};
pub use native::{DynamicApi, HeadlessApi, NativeApi};
pub use properties::{Properties, PropertyType};
pub use surface::Surface;
pub use tray::{EntryAction, EntryFlags, EntryOptions, Tray, TrayEntry, TrayMenu, TrayOptions};
pub use ttf::{Font, SubStrings, Text, TextEngine};

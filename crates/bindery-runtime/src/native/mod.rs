//! The native call seam
//!
//! [`NativeApi`] is the one trait every wrapper calls through. It mirrors the
//! C functions in `ffi::surface` closely: raw typed pointers in and out, null
//! or `false` for failure, `SDL_GetError` for the reason. Two implementations
//! ship:
//! - [`DynamicApi`]: the real SDL3 / SDL3_ttf shared libraries via `libloading`
//! - [`HeadlessApi`]: an in-process model of the same semantics, for tests and
//!   for running without a desktop session

pub mod dynamic;
pub mod headless;

pub use dynamic::DynamicApi;
pub use headless::{HeadlessApi, LiveObjects};

use crate::error::{BinderyError, BinderyResult};
use crate::ffi::records::{RawGpuAtlasDrawSequence, RawSubString};
use crate::ffi::sys::*;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};

/// Typed access to the native library
///
/// # Safety
///
/// Every method is a thin shim over the C function of the same name and
/// carries its preconditions: pointers must be live objects of the right kind
/// created by this same backend, and calls must come from the thread that owns
/// the objects involved.
#[allow(clippy::missing_safety_doc)]
pub trait NativeApi {
    /// Short backend name for diagnostics
    fn backend_name(&self) -> &'static str;

    // ---- core ----------------------------------------------------------------

    unsafe fn get_error(&self) -> String;
    unsafe fn free(&self, ptr: *mut c_void);
    unsafe fn load_bmp(&self, file: &CStr) -> *mut SDL_Surface;
    unsafe fn destroy_surface(&self, surface: *mut SDL_Surface);

    // ---- tray ----------------------------------------------------------------

    unsafe fn create_tray(&self, icon: *mut SDL_Surface, tooltip: Option<&CStr>) -> *mut SDL_Tray;
    unsafe fn set_tray_icon(&self, tray: *mut SDL_Tray, icon: *mut SDL_Surface);
    unsafe fn set_tray_tooltip(&self, tray: *mut SDL_Tray, tooltip: Option<&CStr>);
    unsafe fn create_tray_menu(&self, tray: *mut SDL_Tray) -> *mut SDL_TrayMenu;
    unsafe fn create_tray_submenu(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu;
    unsafe fn get_tray_menu(&self, tray: *mut SDL_Tray) -> *mut SDL_TrayMenu;
    unsafe fn get_tray_submenu(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu;
    /// Null-terminated and owned by the menu; valid until the menu changes
    unsafe fn get_tray_entries(&self, menu: *mut SDL_TrayMenu, count: *mut c_int) -> *const *mut SDL_TrayEntry;
    unsafe fn remove_tray_entry(&self, entry: *mut SDL_TrayEntry);
    unsafe fn insert_tray_entry_at(
        &self,
        menu: *mut SDL_TrayMenu,
        pos: c_int,
        label: Option<&CStr>,
        flags: SDL_TrayEntryFlags,
    ) -> *mut SDL_TrayEntry;
    unsafe fn set_tray_entry_label(&self, entry: *mut SDL_TrayEntry, label: &CStr);
    unsafe fn get_tray_entry_label(&self, entry: *mut SDL_TrayEntry) -> Option<String>;
    unsafe fn set_tray_entry_checked(&self, entry: *mut SDL_TrayEntry, checked: bool);
    unsafe fn get_tray_entry_checked(&self, entry: *mut SDL_TrayEntry) -> bool;
    unsafe fn set_tray_entry_enabled(&self, entry: *mut SDL_TrayEntry, enabled: bool);
    unsafe fn get_tray_entry_enabled(&self, entry: *mut SDL_TrayEntry) -> bool;
    unsafe fn set_tray_entry_callback(
        &self,
        entry: *mut SDL_TrayEntry,
        callback: Option<SDL_TrayCallback>,
        userdata: *mut c_void,
    );
    unsafe fn click_tray_entry(&self, entry: *mut SDL_TrayEntry);
    unsafe fn destroy_tray(&self, tray: *mut SDL_Tray);
    unsafe fn get_tray_entry_parent(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu;
    unsafe fn get_tray_menu_parent_entry(&self, menu: *mut SDL_TrayMenu) -> *mut SDL_TrayEntry;
    unsafe fn get_tray_menu_parent_tray(&self, menu: *mut SDL_TrayMenu) -> *mut SDL_Tray;
    unsafe fn update_trays(&self);

    // ---- properties ------------------------------------------------------------

    unsafe fn create_properties(&self) -> SDL_PropertiesID;
    unsafe fn destroy_properties(&self, props: SDL_PropertiesID);
    unsafe fn set_pointer_property_with_cleanup(
        &self,
        props: SDL_PropertiesID,
        name: &CStr,
        value: *mut c_void,
        cleanup: Option<SDL_CleanupPropertyCallback>,
        userdata: *mut c_void,
    ) -> bool;
    unsafe fn get_pointer_property(&self, props: SDL_PropertiesID, name: &CStr, default: *mut c_void) -> *mut c_void;
    unsafe fn set_string_property(&self, props: SDL_PropertiesID, name: &CStr, value: Option<&CStr>) -> bool;
    unsafe fn get_string_property(&self, props: SDL_PropertiesID, name: &CStr) -> Option<String>;
    unsafe fn set_number_property(&self, props: SDL_PropertiesID, name: &CStr, value: i64) -> bool;
    unsafe fn get_number_property(&self, props: SDL_PropertiesID, name: &CStr, default: i64) -> i64;
    unsafe fn set_float_property(&self, props: SDL_PropertiesID, name: &CStr, value: f32) -> bool;
    unsafe fn get_float_property(&self, props: SDL_PropertiesID, name: &CStr, default: f32) -> f32;
    unsafe fn set_boolean_property(&self, props: SDL_PropertiesID, name: &CStr, value: bool) -> bool;
    unsafe fn get_boolean_property(&self, props: SDL_PropertiesID, name: &CStr, default: bool) -> bool;
    unsafe fn has_property(&self, props: SDL_PropertiesID, name: &CStr) -> bool;
    unsafe fn get_property_type(&self, props: SDL_PropertiesID, name: &CStr) -> SDL_PropertyType;
    unsafe fn clear_property(&self, props: SDL_PropertiesID, name: &CStr) -> bool;
    unsafe fn enumerate_properties(
        &self,
        props: SDL_PropertiesID,
        callback: SDL_EnumeratePropertiesCallback,
        userdata: *mut c_void,
    ) -> bool;

    // ---- events ----------------------------------------------------------------

    unsafe fn poll_event(&self, event: *mut SDL_Event) -> bool;
    unsafe fn push_event(&self, event: *mut SDL_Event) -> bool;
    unsafe fn register_events(&self, count: c_int) -> u32;
    unsafe fn add_event_watch(&self, filter: SDL_EventFilter, userdata: *mut c_void) -> bool;
    unsafe fn remove_event_watch(&self, filter: SDL_EventFilter, userdata: *mut c_void);

    // ---- ttf -------------------------------------------------------------------

    unsafe fn ttf_init(&self) -> bool;
    unsafe fn ttf_quit(&self);
    unsafe fn open_font(&self, file: &CStr, ptsize: f32) -> *mut TTF_Font;
    unsafe fn close_font(&self, font: *mut TTF_Font);
    unsafe fn get_font_size(&self, font: *mut TTF_Font) -> f32;
    unsafe fn set_font_size(&self, font: *mut TTF_Font, ptsize: f32) -> bool;
    unsafe fn get_font_height(&self, font: *mut TTF_Font) -> c_int;
    unsafe fn get_font_family_name(&self, font: *mut TTF_Font) -> Option<String>;
    unsafe fn create_surface_text_engine(&self) -> *mut TTF_TextEngine;
    unsafe fn destroy_surface_text_engine(&self, engine: *mut TTF_TextEngine);
    unsafe fn create_text(
        &self,
        engine: *mut TTF_TextEngine,
        font: *mut TTF_Font,
        text: *const c_char,
        length: usize,
    ) -> *mut TTF_Text;
    unsafe fn destroy_text(&self, text: *mut TTF_Text);
    unsafe fn set_text_color(&self, text: *mut TTF_Text, r: u8, g: u8, b: u8, a: u8) -> bool;
    unsafe fn get_text_color(&self, text: *mut TTF_Text, r: *mut u8, g: *mut u8, b: *mut u8, a: *mut u8) -> bool;
    unsafe fn set_text_string(&self, text: *mut TTF_Text, string: *const c_char, length: usize) -> bool;
    unsafe fn get_text_substring(&self, text: *mut TTF_Text, offset: c_int, substring: *mut RawSubString) -> bool;
    /// Null-terminated; the caller releases the block with [`free`](Self::free)
    unsafe fn get_text_substrings_for_range(
        &self,
        text: *mut TTF_Text,
        offset: c_int,
        length: c_int,
        count: *mut c_int,
    ) -> *mut *mut RawSubString;
    /// Linked through `next`; owned by the text object
    unsafe fn get_gpu_text_draw_data(&self, text: *mut TTF_Text) -> *mut RawGpuAtlasDrawSequence;
}

/// Build a native failure for `operation` from the library's error string
pub(crate) fn native_error(api: &dyn NativeApi, operation: &'static str) -> BinderyError {
    let message = unsafe { api.get_error() };
    let message = if message.is_empty() {
        "unknown error".to_string()
    } else {
        message
    };
    tracing::debug!(operation, %message, backend = api.backend_name(), "native call failed");
    BinderyError::native(operation, message)
}

/// Turn a `false` result into a native failure
pub(crate) fn check(api: &dyn NativeApi, operation: &'static str, ok: bool) -> BinderyResult<()> {
    if ok {
        Ok(())
    } else {
        Err(native_error(api, operation))
    }
}

/// Convert a host string for a native call
pub(crate) fn c_string(operation: &'static str, value: &str) -> BinderyResult<CString> {
    CString::new(value).map_err(|_| BinderyError::InteriorNul { operation })
}

/// Copy a borrowed C string; `None` for null
///
/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn copy_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

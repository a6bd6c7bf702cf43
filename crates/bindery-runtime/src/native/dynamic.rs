//! Native backend over the real SDL3 / SDL3_ttf shared libraries
//!
//! Every symbol is resolved once at load time into a table of function
//! pointers; a missing symbol fails the load, naming it. The libraries stay
//! loaded for as long as the `DynamicApi` lives.

use super::{copy_c_str, NativeApi};
use crate::ffi::loader::{LibraryLoader, LoadError};
use crate::ffi::records::{RawGpuAtlasDrawSequence, RawSubString};
use crate::ffi::sys::*;
use bindery_config::{Config, LibraryConfig};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;

/// Library names the table resolves against
struct Libraries {
    sdl: String,
    ttf: String,
}

macro_rules! native_table {
    ($($lib:ident $field:ident = $symbol:literal : fn($($arg:ty),*) $(-> $ret:ty)?;)*) => {
        struct Table {
            $($field: unsafe extern "C" fn($($arg),*) $(-> $ret)?,)*
        }

        impl Table {
            fn resolve(loader: &LibraryLoader, libraries: &Libraries) -> Result<Self, LoadError> {
                Ok(Self {
                    $($field: unsafe {
                        *loader.lookup_symbol::<unsafe extern "C" fn($($arg),*) $(-> $ret)?>(
                            &libraries.$lib,
                            $symbol,
                        )?
                    },)*
                })
            }
        }

        /// `(symbol, parameter count)` for every resolved function
        pub(crate) const RESOLVED_SYMBOLS: &[(&str, usize)] = &[
            $(($symbol, <[&str]>::len(&[$(stringify!($arg)),*])),)*
        ];
    };
}

native_table! {
    sdl get_error = "SDL_GetError": fn() -> *const c_char;
    sdl free = "SDL_free": fn(*mut c_void);
    sdl load_bmp = "SDL_LoadBMP": fn(*const c_char) -> *mut SDL_Surface;
    sdl destroy_surface = "SDL_DestroySurface": fn(*mut SDL_Surface);

    sdl create_tray = "SDL_CreateTray": fn(*mut SDL_Surface, *const c_char) -> *mut SDL_Tray;
    sdl set_tray_icon = "SDL_SetTrayIcon": fn(*mut SDL_Tray, *mut SDL_Surface);
    sdl set_tray_tooltip = "SDL_SetTrayTooltip": fn(*mut SDL_Tray, *const c_char);
    sdl create_tray_menu = "SDL_CreateTrayMenu": fn(*mut SDL_Tray) -> *mut SDL_TrayMenu;
    sdl create_tray_submenu = "SDL_CreateTraySubmenu": fn(*mut SDL_TrayEntry) -> *mut SDL_TrayMenu;
    sdl get_tray_menu = "SDL_GetTrayMenu": fn(*mut SDL_Tray) -> *mut SDL_TrayMenu;
    sdl get_tray_submenu = "SDL_GetTraySubmenu": fn(*mut SDL_TrayEntry) -> *mut SDL_TrayMenu;
    sdl get_tray_entries = "SDL_GetTrayEntries": fn(*mut SDL_TrayMenu, *mut c_int) -> *const *mut SDL_TrayEntry;
    sdl remove_tray_entry = "SDL_RemoveTrayEntry": fn(*mut SDL_TrayEntry);
    sdl insert_tray_entry_at = "SDL_InsertTrayEntryAt":
        fn(*mut SDL_TrayMenu, c_int, *const c_char, SDL_TrayEntryFlags) -> *mut SDL_TrayEntry;
    sdl set_tray_entry_label = "SDL_SetTrayEntryLabel": fn(*mut SDL_TrayEntry, *const c_char);
    sdl get_tray_entry_label = "SDL_GetTrayEntryLabel": fn(*mut SDL_TrayEntry) -> *const c_char;
    sdl set_tray_entry_checked = "SDL_SetTrayEntryChecked": fn(*mut SDL_TrayEntry, bool);
    sdl get_tray_entry_checked = "SDL_GetTrayEntryChecked": fn(*mut SDL_TrayEntry) -> bool;
    sdl set_tray_entry_enabled = "SDL_SetTrayEntryEnabled": fn(*mut SDL_TrayEntry, bool);
    sdl get_tray_entry_enabled = "SDL_GetTrayEntryEnabled": fn(*mut SDL_TrayEntry) -> bool;
    sdl set_tray_entry_callback = "SDL_SetTrayEntryCallback":
        fn(*mut SDL_TrayEntry, Option<SDL_TrayCallback>, *mut c_void);
    sdl click_tray_entry = "SDL_ClickTrayEntry": fn(*mut SDL_TrayEntry);
    sdl destroy_tray = "SDL_DestroyTray": fn(*mut SDL_Tray);
    sdl get_tray_entry_parent = "SDL_GetTrayEntryParent": fn(*mut SDL_TrayEntry) -> *mut SDL_TrayMenu;
    sdl get_tray_menu_parent_entry = "SDL_GetTrayMenuParentEntry": fn(*mut SDL_TrayMenu) -> *mut SDL_TrayEntry;
    sdl get_tray_menu_parent_tray = "SDL_GetTrayMenuParentTray": fn(*mut SDL_TrayMenu) -> *mut SDL_Tray;
    sdl update_trays = "SDL_UpdateTrays": fn();

    sdl create_properties = "SDL_CreateProperties": fn() -> SDL_PropertiesID;
    sdl destroy_properties = "SDL_DestroyProperties": fn(SDL_PropertiesID);
    sdl set_pointer_property_with_cleanup = "SDL_SetPointerPropertyWithCleanup":
        fn(SDL_PropertiesID, *const c_char, *mut c_void, Option<SDL_CleanupPropertyCallback>, *mut c_void) -> bool;
    sdl get_pointer_property = "SDL_GetPointerProperty":
        fn(SDL_PropertiesID, *const c_char, *mut c_void) -> *mut c_void;
    sdl set_string_property = "SDL_SetStringProperty": fn(SDL_PropertiesID, *const c_char, *const c_char) -> bool;
    sdl get_string_property = "SDL_GetStringProperty":
        fn(SDL_PropertiesID, *const c_char, *const c_char) -> *const c_char;
    sdl set_number_property = "SDL_SetNumberProperty": fn(SDL_PropertiesID, *const c_char, i64) -> bool;
    sdl get_number_property = "SDL_GetNumberProperty": fn(SDL_PropertiesID, *const c_char, i64) -> i64;
    sdl set_float_property = "SDL_SetFloatProperty": fn(SDL_PropertiesID, *const c_char, f32) -> bool;
    sdl get_float_property = "SDL_GetFloatProperty": fn(SDL_PropertiesID, *const c_char, f32) -> f32;
    sdl set_boolean_property = "SDL_SetBooleanProperty": fn(SDL_PropertiesID, *const c_char, bool) -> bool;
    sdl get_boolean_property = "SDL_GetBooleanProperty": fn(SDL_PropertiesID, *const c_char, bool) -> bool;
    sdl has_property = "SDL_HasProperty": fn(SDL_PropertiesID, *const c_char) -> bool;
    sdl get_property_type = "SDL_GetPropertyType": fn(SDL_PropertiesID, *const c_char) -> SDL_PropertyType;
    sdl clear_property = "SDL_ClearProperty": fn(SDL_PropertiesID, *const c_char) -> bool;
    sdl enumerate_properties = "SDL_EnumerateProperties":
        fn(SDL_PropertiesID, SDL_EnumeratePropertiesCallback, *mut c_void) -> bool;

    sdl poll_event = "SDL_PollEvent": fn(*mut SDL_Event) -> bool;
    sdl push_event = "SDL_PushEvent": fn(*mut SDL_Event) -> bool;
    sdl register_events = "SDL_RegisterEvents": fn(c_int) -> u32;
    sdl add_event_watch = "SDL_AddEventWatch": fn(SDL_EventFilter, *mut c_void) -> bool;
    sdl remove_event_watch = "SDL_RemoveEventWatch": fn(SDL_EventFilter, *mut c_void);

    ttf ttf_init = "TTF_Init": fn() -> bool;
    ttf ttf_quit = "TTF_Quit": fn();
    ttf open_font = "TTF_OpenFont": fn(*const c_char, f32) -> *mut TTF_Font;
    ttf close_font = "TTF_CloseFont": fn(*mut TTF_Font);
    ttf get_font_size = "TTF_GetFontSize": fn(*mut TTF_Font) -> f32;
    ttf set_font_size = "TTF_SetFontSize": fn(*mut TTF_Font, f32) -> bool;
    ttf get_font_height = "TTF_GetFontHeight": fn(*mut TTF_Font) -> c_int;
    ttf get_font_family_name = "TTF_GetFontFamilyName": fn(*mut TTF_Font) -> *const c_char;
    ttf create_surface_text_engine = "TTF_CreateSurfaceTextEngine": fn() -> *mut TTF_TextEngine;
    ttf destroy_surface_text_engine = "TTF_DestroySurfaceTextEngine": fn(*mut TTF_TextEngine);
    ttf create_text = "TTF_CreateText":
        fn(*mut TTF_TextEngine, *mut TTF_Font, *const c_char, usize) -> *mut TTF_Text;
    ttf destroy_text = "TTF_DestroyText": fn(*mut TTF_Text);
    ttf set_text_color = "TTF_SetTextColor": fn(*mut TTF_Text, u8, u8, u8, u8) -> bool;
    ttf get_text_color = "TTF_GetTextColor": fn(*mut TTF_Text, *mut u8, *mut u8, *mut u8, *mut u8) -> bool;
    ttf set_text_string = "TTF_SetTextString": fn(*mut TTF_Text, *const c_char, usize) -> bool;
    ttf get_text_substring = "TTF_GetTextSubString": fn(*mut TTF_Text, c_int, *mut RawSubString) -> bool;
    ttf get_text_substrings_for_range = "TTF_GetTextSubStringsForRange":
        fn(*mut TTF_Text, c_int, c_int, *mut c_int) -> *mut *mut RawSubString;
    ttf get_gpu_text_draw_data = "TTF_GetGPUTextDrawData": fn(*mut TTF_Text) -> *mut RawGpuAtlasDrawSequence;
}

fn opt_ptr(value: Option<&CStr>) -> *const c_char {
    value.map_or(std::ptr::null(), CStr::as_ptr)
}

/// SDL3 loaded from shared libraries
pub struct DynamicApi {
    table: Table,
    // Keeps the resolved function pointers valid; dropped last.
    loader: LibraryLoader,
}

impl DynamicApi {
    /// Load SDL3 and SDL3_ttf as configured and resolve every symbol
    pub fn load(library: &LibraryConfig) -> Result<Self, LoadError> {
        let sdl = library.sdl.as_deref().unwrap_or(Path::new(bindery_config::DEFAULT_SDL_LIBRARY));
        let ttf = library.ttf.as_deref().unwrap_or(Path::new(bindery_config::DEFAULT_TTF_LIBRARY));
        Self::load_paths(sdl, ttf, library.search_paths.iter().cloned())
    }

    /// Load using the effective values of a merged [`Config`]
    pub fn from_config(config: &Config) -> Result<Self, LoadError> {
        Self::load_paths(&config.sdl_library(), &config.ttf_library(), config.search_paths())
    }

    fn load_paths(sdl: &Path, ttf: &Path, search_paths: impl IntoIterator<Item = std::path::PathBuf>) -> Result<Self, LoadError> {
        let mut loader = LibraryLoader::with_search_paths(search_paths);
        let libraries = Libraries {
            sdl: sdl.to_string_lossy().into_owned(),
            ttf: ttf.to_string_lossy().into_owned(),
        };

        loader.load(&libraries.sdl)?;
        loader.load(&libraries.ttf)?;
        let table = Table::resolve(&loader, &libraries)?;

        tracing::info!(
            sdl = %libraries.sdl,
            ttf = %libraries.ttf,
            symbols = RESOLVED_SYMBOLS.len(),
            "native libraries loaded"
        );
        Ok(Self { table, loader })
    }

    /// Where a library was resolved to
    pub fn resolved_path(&self, library_name: &str) -> Option<&Path> {
        self.loader.resolved_path(library_name)
    }
}

impl NativeApi for DynamicApi {
    fn backend_name(&self) -> &'static str {
        "dynamic"
    }

    unsafe fn get_error(&self) -> String {
        copy_c_str((self.table.get_error)()).unwrap_or_default()
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        (self.table.free)(ptr)
    }

    unsafe fn load_bmp(&self, file: &CStr) -> *mut SDL_Surface {
        (self.table.load_bmp)(file.as_ptr())
    }

    unsafe fn destroy_surface(&self, surface: *mut SDL_Surface) {
        (self.table.destroy_surface)(surface)
    }

    unsafe fn create_tray(&self, icon: *mut SDL_Surface, tooltip: Option<&CStr>) -> *mut SDL_Tray {
        (self.table.create_tray)(icon, opt_ptr(tooltip))
    }

    unsafe fn set_tray_icon(&self, tray: *mut SDL_Tray, icon: *mut SDL_Surface) {
        (self.table.set_tray_icon)(tray, icon)
    }

    unsafe fn set_tray_tooltip(&self, tray: *mut SDL_Tray, tooltip: Option<&CStr>) {
        (self.table.set_tray_tooltip)(tray, opt_ptr(tooltip))
    }

    unsafe fn create_tray_menu(&self, tray: *mut SDL_Tray) -> *mut SDL_TrayMenu {
        (self.table.create_tray_menu)(tray)
    }

    unsafe fn create_tray_submenu(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu {
        (self.table.create_tray_submenu)(entry)
    }

    unsafe fn get_tray_menu(&self, tray: *mut SDL_Tray) -> *mut SDL_TrayMenu {
        (self.table.get_tray_menu)(tray)
    }

    unsafe fn get_tray_submenu(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu {
        (self.table.get_tray_submenu)(entry)
    }

    unsafe fn get_tray_entries(&self, menu: *mut SDL_TrayMenu, count: *mut c_int) -> *const *mut SDL_TrayEntry {
        (self.table.get_tray_entries)(menu, count)
    }

    unsafe fn remove_tray_entry(&self, entry: *mut SDL_TrayEntry) {
        (self.table.remove_tray_entry)(entry)
    }

    unsafe fn insert_tray_entry_at(
        &self,
        menu: *mut SDL_TrayMenu,
        pos: c_int,
        label: Option<&CStr>,
        flags: SDL_TrayEntryFlags,
    ) -> *mut SDL_TrayEntry {
        (self.table.insert_tray_entry_at)(menu, pos, opt_ptr(label), flags)
    }

    unsafe fn set_tray_entry_label(&self, entry: *mut SDL_TrayEntry, label: &CStr) {
        (self.table.set_tray_entry_label)(entry, label.as_ptr())
    }

    unsafe fn get_tray_entry_label(&self, entry: *mut SDL_TrayEntry) -> Option<String> {
        copy_c_str((self.table.get_tray_entry_label)(entry))
    }

    unsafe fn set_tray_entry_checked(&self, entry: *mut SDL_TrayEntry, checked: bool) {
        (self.table.set_tray_entry_checked)(entry, checked)
    }

    unsafe fn get_tray_entry_checked(&self, entry: *mut SDL_TrayEntry) -> bool {
        (self.table.get_tray_entry_checked)(entry)
    }

    unsafe fn set_tray_entry_enabled(&self, entry: *mut SDL_TrayEntry, enabled: bool) {
        (self.table.set_tray_entry_enabled)(entry, enabled)
    }

    unsafe fn get_tray_entry_enabled(&self, entry: *mut SDL_TrayEntry) -> bool {
        (self.table.get_tray_entry_enabled)(entry)
    }

    unsafe fn set_tray_entry_callback(
        &self,
        entry: *mut SDL_TrayEntry,
        callback: Option<SDL_TrayCallback>,
        userdata: *mut c_void,
    ) {
        (self.table.set_tray_entry_callback)(entry, callback, userdata)
    }

    unsafe fn click_tray_entry(&self, entry: *mut SDL_TrayEntry) {
        (self.table.click_tray_entry)(entry)
    }

    unsafe fn destroy_tray(&self, tray: *mut SDL_Tray) {
        (self.table.destroy_tray)(tray)
    }

    unsafe fn get_tray_entry_parent(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu {
        (self.table.get_tray_entry_parent)(entry)
    }

    unsafe fn get_tray_menu_parent_entry(&self, menu: *mut SDL_TrayMenu) -> *mut SDL_TrayEntry {
        (self.table.get_tray_menu_parent_entry)(menu)
    }

    unsafe fn get_tray_menu_parent_tray(&self, menu: *mut SDL_TrayMenu) -> *mut SDL_Tray {
        (self.table.get_tray_menu_parent_tray)(menu)
    }

    unsafe fn update_trays(&self) {
        (self.table.update_trays)()
    }

    unsafe fn create_properties(&self) -> SDL_PropertiesID {
        (self.table.create_properties)()
    }

    unsafe fn destroy_properties(&self, props: SDL_PropertiesID) {
        (self.table.destroy_properties)(props)
    }

    unsafe fn set_pointer_property_with_cleanup(
        &self,
        props: SDL_PropertiesID,
        name: &CStr,
        value: *mut c_void,
        cleanup: Option<SDL_CleanupPropertyCallback>,
        userdata: *mut c_void,
    ) -> bool {
        (self.table.set_pointer_property_with_cleanup)(props, name.as_ptr(), value, cleanup, userdata)
    }

    unsafe fn get_pointer_property(&self, props: SDL_PropertiesID, name: &CStr, default: *mut c_void) -> *mut c_void {
        (self.table.get_pointer_property)(props, name.as_ptr(), default)
    }

    unsafe fn set_string_property(&self, props: SDL_PropertiesID, name: &CStr, value: Option<&CStr>) -> bool {
        (self.table.set_string_property)(props, name.as_ptr(), opt_ptr(value))
    }

    unsafe fn get_string_property(&self, props: SDL_PropertiesID, name: &CStr) -> Option<String> {
        copy_c_str((self.table.get_string_property)(props, name.as_ptr(), std::ptr::null()))
    }

    unsafe fn set_number_property(&self, props: SDL_PropertiesID, name: &CStr, value: i64) -> bool {
        (self.table.set_number_property)(props, name.as_ptr(), value)
    }

    unsafe fn get_number_property(&self, props: SDL_PropertiesID, name: &CStr, default: i64) -> i64 {
        (self.table.get_number_property)(props, name.as_ptr(), default)
    }

    unsafe fn set_float_property(&self, props: SDL_PropertiesID, name: &CStr, value: f32) -> bool {
        (self.table.set_float_property)(props, name.as_ptr(), value)
    }

    unsafe fn get_float_property(&self, props: SDL_PropertiesID, name: &CStr, default: f32) -> f32 {
        (self.table.get_float_property)(props, name.as_ptr(), default)
    }

    unsafe fn set_boolean_property(&self, props: SDL_PropertiesID, name: &CStr, value: bool) -> bool {
        (self.table.set_boolean_property)(props, name.as_ptr(), value)
    }

    unsafe fn get_boolean_property(&self, props: SDL_PropertiesID, name: &CStr, default: bool) -> bool {
        (self.table.get_boolean_property)(props, name.as_ptr(), default)
    }

    unsafe fn has_property(&self, props: SDL_PropertiesID, name: &CStr) -> bool {
        (self.table.has_property)(props, name.as_ptr())
    }

    unsafe fn get_property_type(&self, props: SDL_PropertiesID, name: &CStr) -> SDL_PropertyType {
        (self.table.get_property_type)(props, name.as_ptr())
    }

    unsafe fn clear_property(&self, props: SDL_PropertiesID, name: &CStr) -> bool {
        (self.table.clear_property)(props, name.as_ptr())
    }

    unsafe fn enumerate_properties(
        &self,
        props: SDL_PropertiesID,
        callback: SDL_EnumeratePropertiesCallback,
        userdata: *mut c_void,
    ) -> bool {
        (self.table.enumerate_properties)(props, callback, userdata)
    }

    unsafe fn poll_event(&self, event: *mut SDL_Event) -> bool {
        (self.table.poll_event)(event)
    }

    unsafe fn push_event(&self, event: *mut SDL_Event) -> bool {
        (self.table.push_event)(event)
    }

    unsafe fn register_events(&self, count: c_int) -> u32 {
        (self.table.register_events)(count)
    }

    unsafe fn add_event_watch(&self, filter: SDL_EventFilter, userdata: *mut c_void) -> bool {
        (self.table.add_event_watch)(filter, userdata)
    }

    unsafe fn remove_event_watch(&self, filter: SDL_EventFilter, userdata: *mut c_void) {
        (self.table.remove_event_watch)(filter, userdata)
    }

    unsafe fn ttf_init(&self) -> bool {
        (self.table.ttf_init)()
    }

    unsafe fn ttf_quit(&self) {
        (self.table.ttf_quit)()
    }

    unsafe fn open_font(&self, file: &CStr, ptsize: f32) -> *mut TTF_Font {
        (self.table.open_font)(file.as_ptr(), ptsize)
    }

    unsafe fn close_font(&self, font: *mut TTF_Font) {
        (self.table.close_font)(font)
    }

    unsafe fn get_font_size(&self, font: *mut TTF_Font) -> f32 {
        (self.table.get_font_size)(font)
    }

    unsafe fn set_font_size(&self, font: *mut TTF_Font, ptsize: f32) -> bool {
        (self.table.set_font_size)(font, ptsize)
    }

    unsafe fn get_font_height(&self, font: *mut TTF_Font) -> c_int {
        (self.table.get_font_height)(font)
    }

    unsafe fn get_font_family_name(&self, font: *mut TTF_Font) -> Option<String> {
        copy_c_str((self.table.get_font_family_name)(font))
    }

    unsafe fn create_surface_text_engine(&self) -> *mut TTF_TextEngine {
        (self.table.create_surface_text_engine)()
    }

    unsafe fn destroy_surface_text_engine(&self, engine: *mut TTF_TextEngine) {
        (self.table.destroy_surface_text_engine)(engine)
    }

    unsafe fn create_text(
        &self,
        engine: *mut TTF_TextEngine,
        font: *mut TTF_Font,
        text: *const c_char,
        length: usize,
    ) -> *mut TTF_Text {
        (self.table.create_text)(engine, font, text, length)
    }

    unsafe fn destroy_text(&self, text: *mut TTF_Text) {
        (self.table.destroy_text)(text)
    }

    unsafe fn set_text_color(&self, text: *mut TTF_Text, r: u8, g: u8, b: u8, a: u8) -> bool {
        (self.table.set_text_color)(text, r, g, b, a)
    }

    unsafe fn get_text_color(&self, text: *mut TTF_Text, r: *mut u8, g: *mut u8, b: *mut u8, a: *mut u8) -> bool {
        (self.table.get_text_color)(text, r, g, b, a)
    }

    unsafe fn set_text_string(&self, text: *mut TTF_Text, string: *const c_char, length: usize) -> bool {
        (self.table.set_text_string)(text, string, length)
    }

    unsafe fn get_text_substring(&self, text: *mut TTF_Text, offset: c_int, substring: *mut RawSubString) -> bool {
        (self.table.get_text_substring)(text, offset, substring)
    }

    unsafe fn get_text_substrings_for_range(
        &self,
        text: *mut TTF_Text,
        offset: c_int,
        length: c_int,
        count: *mut c_int,
    ) -> *mut *mut RawSubString {
        (self.table.get_text_substrings_for_range)(text, offset, length, count)
    }

    unsafe fn get_gpu_text_draw_data(&self, text: *mut TTF_Text) -> *mut RawGpuAtlasDrawSequence {
        (self.table.get_gpu_text_draw_data)(text)
    }
}

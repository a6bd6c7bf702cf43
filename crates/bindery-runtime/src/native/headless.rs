//! In-process backend with SDL's documented semantics and no display
//!
//! Objects get stable fake addresses that are never dereferenced. Memory the
//! caller does read (entry arrays, substring blocks, draw sequences) is real.
//! Callbacks are invoked with no internal borrow held, so they may call back
//! into the backend.

use super::NativeApi;
use crate::ffi::records::{RawGpuAtlasDrawSequence, RawRect, RawSubString, SubStringFlags};
use crate::ffi::sys::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;

const TTF_DIRECTION_LTR: u32 = 4;
const ATLAS_TEXTURE: usize = 0x7A71_0000;

fn addr<T>(ptr: *const T) -> usize {
    ptr as usize
}

fn ptr<T>(addr: usize) -> *mut T {
    addr as *mut T
}

/// Counts of native objects currently alive in a [`HeadlessApi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveObjects {
    pub trays: usize,
    pub menus: usize,
    pub entries: usize,
    pub entry_callbacks: usize,
    pub surfaces: usize,
    pub properties: usize,
    pub event_watches: usize,
    pub fonts: usize,
    pub text_engines: usize,
    pub texts: usize,
    pub allocations: usize,
}

impl LiveObjects {
    pub fn total(&self) -> usize {
        self.trays
            + self.menus
            + self.entries
            + self.surfaces
            + self.properties
            + self.event_watches
            + self.fonts
            + self.text_engines
            + self.texts
            + self.allocations
    }
}

struct TrayObj {
    menu: Option<usize>,
    tooltip: Option<String>,
    icon: usize,
}

enum MenuParent {
    Tray(usize),
    Entry(usize),
}

struct MenuObj {
    parent: MenuParent,
    entries: Vec<usize>,
    // Backing store for the last SDL_GetTrayEntries result
    snapshot: Vec<*mut SDL_TrayEntry>,
}

struct EntryObj {
    menu: usize,
    label: Option<String>,
    flags: SDL_TrayEntryFlags,
    checked: bool,
    enabled: bool,
    submenu: Option<usize>,
    callback: Option<(SDL_TrayCallback, usize)>,
}

enum PropValue {
    Pointer {
        value: usize,
        cleanup: Option<(SDL_CleanupPropertyCallback, usize)>,
    },
    String(String),
    Number(i64),
    Float(f32),
    Boolean(bool),
}

impl PropValue {
    fn type_code(&self) -> SDL_PropertyType {
        match self {
            PropValue::Pointer { .. } => SDL_PROPERTY_TYPE_POINTER,
            PropValue::String(_) => SDL_PROPERTY_TYPE_STRING,
            PropValue::Number(_) => SDL_PROPERTY_TYPE_NUMBER,
            PropValue::Float(_) => SDL_PROPERTY_TYPE_FLOAT,
            PropValue::Boolean(_) => SDL_PROPERTY_TYPE_BOOLEAN,
        }
    }

    fn into_cleanup(self) -> Option<PendingCleanup> {
        match self {
            PropValue::Pointer {
                value,
                cleanup: Some((callback, userdata)),
            } => Some(PendingCleanup {
                callback,
                userdata,
                value,
            }),
            _ => None,
        }
    }
}

struct PendingCleanup {
    callback: SDL_CleanupPropertyCallback,
    userdata: usize,
    value: usize,
}

impl PendingCleanup {
    unsafe fn run(self) {
        (self.callback)(ptr(self.userdata), ptr(self.value))
    }
}

struct FontObj {
    size: f32,
    family: String,
}

impl FontObj {
    fn advance(&self) -> i32 {
        ((self.size / 2.0).round() as i32).max(1)
    }

    fn height(&self) -> i32 {
        ((self.size * 1.25).ceil() as i32).max(1)
    }
}

#[derive(Default)]
struct DrawData {
    sequences: Vec<RawGpuAtlasDrawSequence>,
    xy: Vec<Vec<f32>>,
    uv: Vec<Vec<f32>>,
    indices: Vec<Vec<i32>>,
}

struct TextObj {
    font: usize,
    bytes: Vec<u8>,
    color: [u8; 4],
    draw: DrawData,
}

/// Block handed out by TTF_GetTextSubStringsForRange, freed with SDL_free
struct SubStringBlock {
    _items: Vec<RawSubString>,
    _pointers: Vec<*mut RawSubString>,
}

#[derive(Default)]
struct World {
    next_addr: usize,
    next_props: SDL_PropertiesID,
    next_event: u32,
    error: String,
    failures: HashMap<String, usize>,
    surfaces: HashSet<usize>,
    trays: HashMap<usize, TrayObj>,
    menus: HashMap<usize, MenuObj>,
    entries: HashMap<usize, EntryObj>,
    properties: HashMap<SDL_PropertiesID, BTreeMap<String, PropValue>>,
    events: VecDeque<SDL_Event>,
    watches: Vec<(SDL_EventFilter, usize)>,
    ttf_refs: u32,
    fonts: HashMap<usize, FontObj>,
    engines: HashSet<usize>,
    texts: HashMap<usize, TextObj>,
    allocations: HashMap<usize, SubStringBlock>,
}

impl World {
    fn alloc_addr(&mut self) -> usize {
        self.next_addr += 0x40;
        0x1_0000 + self.next_addr
    }

    fn set_error(&mut self, message: impl Into<String>) {
        self.error = message.into();
    }

    /// Consume an injected failure for `operation`, if one is pending
    fn injected(&mut self, operation: &str) -> bool {
        match self.failures.get_mut(operation) {
            Some(count) if *count > 0 => {
                *count -= 1;
                self.set_error(format!("injected failure in {}", operation));
                true
            }
            _ => false,
        }
    }

    fn remove_menu_tree(&mut self, menu: usize) {
        if let Some(obj) = self.menus.remove(&menu) {
            for entry in obj.entries {
                self.remove_entry_tree(entry);
            }
        }
    }

    fn remove_entry_tree(&mut self, entry: usize) {
        if let Some(obj) = self.entries.remove(&entry) {
            if let Some(submenu) = obj.submenu {
                self.remove_menu_tree(submenu);
            }
        }
    }

    fn take_cleanup(&mut self, props: SDL_PropertiesID, name: &str) -> Option<PendingCleanup> {
        self.properties
            .get_mut(&props)
            .and_then(|group| group.remove(name))
            .and_then(PropValue::into_cleanup)
    }

    /// Replace a property; the displaced pointer's cleanup is returned
    fn put_property(
        &mut self,
        operation: &str,
        props: SDL_PropertiesID,
        name: &CStr,
        value: PropValue,
    ) -> Result<Option<PendingCleanup>, PropValue> {
        if self.injected(operation) {
            return Err(value);
        }
        let name = name.to_string_lossy().into_owned();
        match self.properties.get_mut(&props) {
            Some(group) => Ok(group.insert(name, value).and_then(PropValue::into_cleanup)),
            None => {
                self.set_error("Parameter 'props' is invalid");
                Err(value)
            }
        }
    }

    fn property(&self, props: SDL_PropertiesID, name: &CStr) -> Option<&PropValue> {
        self.properties
            .get(&props)
            .and_then(|group| group.get(name.to_string_lossy().as_ref()))
    }
}

/// Native backend that keeps everything in memory
#[derive(Default)]
pub struct HeadlessApi {
    world: RefCell<World>,
}

impl HeadlessApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of native function `operation` (e.g. `"SDL_CreateTray"`)
    /// fail with an error string
    pub fn fail_next(&self, operation: &str) {
        *self.world.borrow_mut().failures.entry(operation.to_string()).or_default() += 1;
    }

    pub fn live_objects(&self) -> LiveObjects {
        let world = self.world.borrow();
        LiveObjects {
            trays: world.trays.len(),
            menus: world.menus.len(),
            entries: world.entries.len(),
            entry_callbacks: world.entries.values().filter(|e| e.callback.is_some()).count(),
            surfaces: world.surfaces.len(),
            properties: world.properties.len(),
            event_watches: world.watches.len(),
            fonts: world.fonts.len(),
            text_engines: world.engines.len(),
            texts: world.texts.len(),
            allocations: world.allocations.len(),
        }
    }

    /// Tooltip last set on a tray
    pub fn tray_tooltip(&self, tray: *mut SDL_Tray) -> Option<String> {
        self.world.borrow().trays.get(&addr(tray)).and_then(|t| t.tooltip.clone())
    }

    /// Surface last set as a tray's icon
    pub fn tray_icon(&self, tray: *mut SDL_Tray) -> *mut SDL_Surface {
        self.world
            .borrow()
            .trays
            .get(&addr(tray))
            .map_or(std::ptr::null_mut(), |t| ptr(t.icon))
    }

    /// Events waiting in the queue
    pub fn pending_events(&self) -> usize {
        self.world.borrow().events.len()
    }

    /// Outstanding `TTF_Init` calls not yet balanced by `TTF_Quit`
    pub fn ttf_init_count(&self) -> u32 {
        self.world.borrow().ttf_refs
    }

    fn rebuild_draw_data(text: &mut TextObj, font: &FontObj) {
        let advance = font.advance() as f32;
        let height = font.height() as f32;
        let mut draw = DrawData::default();

        for (line, content) in text.bytes.split(|b| *b == b'\n').enumerate() {
            if content.is_empty() {
                continue;
            }
            let top = line as f32 * height;
            let mut xy = Vec::with_capacity(content.len() * 8);
            let mut uv = Vec::with_capacity(content.len() * 8);
            let mut indices = Vec::with_capacity(content.len() * 6);
            for (col, _) in content.iter().enumerate() {
                let left = col as f32 * advance;
                xy.extend_from_slice(&[left, top, left + advance, top, left + advance, top + height, left, top + height]);
                uv.extend_from_slice(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
                let base = (col * 4) as i32;
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
            draw.sequences.push(RawGpuAtlasDrawSequence {
                atlas_texture: ATLAS_TEXTURE,
                xy: addr(xy.as_ptr()),
                uv: addr(uv.as_ptr()),
                num_vertices: (content.len() * 4) as i32,
                _gap: Default::default(),
                indices: addr(indices.as_ptr()),
                num_indices: indices.len() as i32,
                image_type: 1,
                next: 0,
            });
            draw.xy.push(xy);
            draw.uv.push(uv);
            draw.indices.push(indices);
        }

        let base = draw.sequences.as_ptr();
        let count = draw.sequences.len();
        for i in 0..count.saturating_sub(1) {
            draw.sequences[i].next = addr(unsafe { base.add(i + 1) });
        }
        text.draw = draw;
    }
}

/// One cluster per byte, laid out on a fixed grid
fn layout(bytes: &[u8], advance: i32, height: i32) -> Vec<RawSubString> {
    let mut out = Vec::with_capacity(bytes.len());
    let (mut line, mut col) = (0i32, 0i32);

    for (i, &byte) in bytes.iter().enumerate() {
        let last = i + 1 == bytes.len();
        let mut flags = SubStringFlags::from_bits_retain(TTF_DIRECTION_LTR);
        if i == 0 {
            flags |= SubStringFlags::TEXT_START;
        }
        if col == 0 {
            flags |= SubStringFlags::LINE_START;
        }
        if byte == b'\n' || last || bytes[i + 1] == b'\n' {
            flags |= SubStringFlags::LINE_END;
        }
        if last {
            flags |= SubStringFlags::TEXT_END;
        }

        out.push(RawSubString {
            flags: flags.bits(),
            offset: i as i32,
            length: 1,
            line_index: line,
            cluster_index: i as i32,
            rect: RawRect {
                x: col * advance,
                y: line * height,
                w: if byte == b'\n' { 0 } else { advance },
                h: height,
            },
        });

        if byte == b'\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    out
}

/// Zero-length marker past the last cluster
fn end_marker(clusters: &[RawSubString], height: i32) -> RawSubString {
    let (x, line) = clusters
        .last()
        .map_or((0, 0), |c| (c.rect.x + c.rect.w, c.line_index));
    RawSubString {
        flags: (SubStringFlags::from_bits_retain(TTF_DIRECTION_LTR) | SubStringFlags::TEXT_END).bits(),
        offset: clusters.len() as i32,
        length: 0,
        line_index: line,
        cluster_index: clusters.len() as i32,
        rect: RawRect {
            x,
            y: line * height,
            w: 0,
            h: height,
        },
    }
}

impl NativeApi for HeadlessApi {
    fn backend_name(&self) -> &'static str {
        "headless"
    }

    unsafe fn get_error(&self) -> String {
        self.world.borrow().error.clone()
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        if !ptr.is_null() {
            self.world.borrow_mut().allocations.remove(&addr(ptr));
        }
    }

    unsafe fn load_bmp(&self, file: &CStr) -> *mut SDL_Surface {
        let mut world = self.world.borrow_mut();
        if world.injected("SDL_LoadBMP") {
            return std::ptr::null_mut();
        }
        let path = file.to_string_lossy().into_owned();
        match std::fs::read(Path::new(&path)) {
            Ok(bytes) if bytes.starts_with(b"BM") => {
                let surface = world.alloc_addr();
                world.surfaces.insert(surface);
                ptr(surface)
            }
            Ok(_) => {
                world.set_error("File is not a Windows BMP file");
                std::ptr::null_mut()
            }
            Err(_) => {
                world.set_error(format!("Couldn't open {}", path));
                std::ptr::null_mut()
            }
        }
    }

    unsafe fn destroy_surface(&self, surface: *mut SDL_Surface) {
        self.world.borrow_mut().surfaces.remove(&addr(surface));
    }

    unsafe fn create_tray(&self, icon: *mut SDL_Surface, tooltip: Option<&CStr>) -> *mut SDL_Tray {
        let mut world = self.world.borrow_mut();
        if world.injected("SDL_CreateTray") {
            return std::ptr::null_mut();
        }
        let tray = world.alloc_addr();
        world.trays.insert(
            tray,
            TrayObj {
                menu: None,
                tooltip: tooltip.map(|t| t.to_string_lossy().into_owned()),
                icon: addr(icon),
            },
        );
        ptr(tray)
    }

    unsafe fn set_tray_icon(&self, tray: *mut SDL_Tray, icon: *mut SDL_Surface) {
        if let Some(obj) = self.world.borrow_mut().trays.get_mut(&addr(tray)) {
            obj.icon = addr(icon);
        }
    }

    unsafe fn set_tray_tooltip(&self, tray: *mut SDL_Tray, tooltip: Option<&CStr>) {
        if let Some(obj) = self.world.borrow_mut().trays.get_mut(&addr(tray)) {
            obj.tooltip = tooltip.map(|t| t.to_string_lossy().into_owned());
        }
    }

    unsafe fn create_tray_menu(&self, tray: *mut SDL_Tray) -> *mut SDL_TrayMenu {
        let mut world = self.world.borrow_mut();
        if world.injected("SDL_CreateTrayMenu") {
            return std::ptr::null_mut();
        }
        let existing = match world.trays.get(&addr(tray)) {
            Some(obj) => obj.menu,
            None => {
                world.set_error("Parameter 'tray' is invalid");
                return std::ptr::null_mut();
            }
        };
        if let Some(menu) = existing {
            return ptr(menu);
        }
        let menu = world.alloc_addr();
        world.menus.insert(
            menu,
            MenuObj {
                parent: MenuParent::Tray(addr(tray)),
                entries: Vec::new(),
                snapshot: Vec::new(),
            },
        );
        if let Some(obj) = world.trays.get_mut(&addr(tray)) {
            obj.menu = Some(menu);
        }
        ptr(menu)
    }

    unsafe fn create_tray_submenu(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu {
        let mut world = self.world.borrow_mut();
        if world.injected("SDL_CreateTraySubmenu") {
            return std::ptr::null_mut();
        }
        let (flags, existing) = match world.entries.get(&addr(entry)) {
            Some(obj) => (obj.flags, obj.submenu),
            None => {
                world.set_error("Parameter 'entry' is invalid");
                return std::ptr::null_mut();
            }
        };
        if flags & SDL_TRAYENTRY_SUBMENU == 0 {
            world.set_error("Cannot create submenu for entry not created with SDL_TRAYENTRY_SUBMENU");
            return std::ptr::null_mut();
        }
        if let Some(menu) = existing {
            return ptr(menu);
        }
        let menu = world.alloc_addr();
        world.menus.insert(
            menu,
            MenuObj {
                parent: MenuParent::Entry(addr(entry)),
                entries: Vec::new(),
                snapshot: Vec::new(),
            },
        );
        if let Some(obj) = world.entries.get_mut(&addr(entry)) {
            obj.submenu = Some(menu);
        }
        ptr(menu)
    }

    unsafe fn get_tray_menu(&self, tray: *mut SDL_Tray) -> *mut SDL_TrayMenu {
        self.world
            .borrow()
            .trays
            .get(&addr(tray))
            .and_then(|t| t.menu)
            .map_or(std::ptr::null_mut(), ptr)
    }

    unsafe fn get_tray_submenu(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu {
        self.world
            .borrow()
            .entries
            .get(&addr(entry))
            .and_then(|e| e.submenu)
            .map_or(std::ptr::null_mut(), ptr)
    }

    unsafe fn get_tray_entries(&self, menu: *mut SDL_TrayMenu, count: *mut c_int) -> *const *mut SDL_TrayEntry {
        let mut world = self.world.borrow_mut();
        let Some(obj) = world.menus.get_mut(&addr(menu)) else {
            world.set_error("Parameter 'menu' is invalid");
            return std::ptr::null();
        };
        obj.snapshot = obj.entries.iter().map(|e| ptr(*e)).collect();
        obj.snapshot.push(std::ptr::null_mut());
        if !count.is_null() {
            *count = obj.entries.len() as c_int;
        }
        obj.snapshot.as_ptr()
    }

    unsafe fn remove_tray_entry(&self, entry: *mut SDL_TrayEntry) {
        let mut world = self.world.borrow_mut();
        let Some(menu) = world.entries.get(&addr(entry)).map(|e| e.menu) else {
            return;
        };
        if let Some(obj) = world.menus.get_mut(&menu) {
            obj.entries.retain(|e| *e != addr(entry));
        }
        world.remove_entry_tree(addr(entry));
    }

    unsafe fn insert_tray_entry_at(
        &self,
        menu: *mut SDL_TrayMenu,
        pos: c_int,
        label: Option<&CStr>,
        flags: SDL_TrayEntryFlags,
    ) -> *mut SDL_TrayEntry {
        let mut world = self.world.borrow_mut();
        if world.injected("SDL_InsertTrayEntryAt") {
            return std::ptr::null_mut();
        }
        let len = match world.menus.get(&addr(menu)) {
            Some(obj) => obj.entries.len(),
            None => {
                world.set_error("Parameter 'menu' is invalid");
                return std::ptr::null_mut();
            }
        };
        if pos < SDL_TRAY_APPEND || pos > len as c_int {
            world.set_error("Invalid entry position");
            return std::ptr::null_mut();
        }

        let entry = world.alloc_addr();
        world.entries.insert(
            entry,
            EntryObj {
                menu: addr(menu),
                label: label.map(|l| l.to_string_lossy().into_owned()),
                flags,
                checked: flags & SDL_TRAYENTRY_CHECKED != 0,
                enabled: flags & SDL_TRAYENTRY_DISABLED == 0,
                submenu: None,
                callback: None,
            },
        );
        if let Some(obj) = world.menus.get_mut(&addr(menu)) {
            if pos == SDL_TRAY_APPEND {
                obj.entries.push(entry);
            } else {
                obj.entries.insert(pos as usize, entry);
            }
        }
        ptr(entry)
    }

    unsafe fn set_tray_entry_label(&self, entry: *mut SDL_TrayEntry, label: &CStr) {
        if let Some(obj) = self.world.borrow_mut().entries.get_mut(&addr(entry)) {
            // Separators keep no label
            if obj.label.is_some() {
                obj.label = Some(label.to_string_lossy().into_owned());
            }
        }
    }

    unsafe fn get_tray_entry_label(&self, entry: *mut SDL_TrayEntry) -> Option<String> {
        self.world
            .borrow()
            .entries
            .get(&addr(entry))
            .and_then(|e| e.label.clone())
    }

    unsafe fn set_tray_entry_checked(&self, entry: *mut SDL_TrayEntry, checked: bool) {
        if let Some(obj) = self.world.borrow_mut().entries.get_mut(&addr(entry)) {
            if obj.flags & SDL_TRAYENTRY_CHECKBOX != 0 {
                obj.checked = checked;
            }
        }
    }

    unsafe fn get_tray_entry_checked(&self, entry: *mut SDL_TrayEntry) -> bool {
        self.world
            .borrow()
            .entries
            .get(&addr(entry))
            .is_some_and(|e| e.checked)
    }

    unsafe fn set_tray_entry_enabled(&self, entry: *mut SDL_TrayEntry, enabled: bool) {
        if let Some(obj) = self.world.borrow_mut().entries.get_mut(&addr(entry)) {
            obj.enabled = enabled;
        }
    }

    unsafe fn get_tray_entry_enabled(&self, entry: *mut SDL_TrayEntry) -> bool {
        self.world
            .borrow()
            .entries
            .get(&addr(entry))
            .is_some_and(|e| e.enabled)
    }

    unsafe fn set_tray_entry_callback(
        &self,
        entry: *mut SDL_TrayEntry,
        callback: Option<SDL_TrayCallback>,
        userdata: *mut c_void,
    ) {
        if let Some(obj) = self.world.borrow_mut().entries.get_mut(&addr(entry)) {
            obj.callback = callback.map(|f| (f, addr(userdata)));
        }
    }

    unsafe fn click_tray_entry(&self, entry: *mut SDL_TrayEntry) {
        let callback = {
            let mut world = self.world.borrow_mut();
            let Some(obj) = world.entries.get_mut(&addr(entry)) else {
                return;
            };
            if obj.flags & SDL_TRAYENTRY_CHECKBOX != 0 {
                obj.checked = !obj.checked;
            }
            obj.callback
        };
        if let Some((f, userdata)) = callback {
            f(ptr(userdata), entry);
        }
    }

    unsafe fn destroy_tray(&self, tray: *mut SDL_Tray) {
        let mut world = self.world.borrow_mut();
        if let Some(obj) = world.trays.remove(&addr(tray)) {
            if let Some(menu) = obj.menu {
                world.remove_menu_tree(menu);
            }
        }
    }

    unsafe fn get_tray_entry_parent(&self, entry: *mut SDL_TrayEntry) -> *mut SDL_TrayMenu {
        self.world
            .borrow()
            .entries
            .get(&addr(entry))
            .map_or(std::ptr::null_mut(), |e| ptr(e.menu))
    }

    unsafe fn get_tray_menu_parent_entry(&self, menu: *mut SDL_TrayMenu) -> *mut SDL_TrayEntry {
        match self.world.borrow().menus.get(&addr(menu)).map(|m| &m.parent) {
            Some(MenuParent::Entry(entry)) => ptr(*entry),
            _ => std::ptr::null_mut(),
        }
    }

    unsafe fn get_tray_menu_parent_tray(&self, menu: *mut SDL_TrayMenu) -> *mut SDL_Tray {
        match self.world.borrow().menus.get(&addr(menu)).map(|m| &m.parent) {
            Some(MenuParent::Tray(tray)) => ptr(*tray),
            _ => std::ptr::null_mut(),
        }
    }

    unsafe fn update_trays(&self) {}

    unsafe fn create_properties(&self) -> SDL_PropertiesID {
        let mut world = self.world.borrow_mut();
        if world.injected("SDL_CreateProperties") {
            return 0;
        }
        world.next_props += 1;
        let id = world.next_props;
        world.properties.insert(id, BTreeMap::new());
        id
    }

    unsafe fn destroy_properties(&self, props: SDL_PropertiesID) {
        let removed = self.world.borrow_mut().properties.remove(&props);
        if let Some(group) = removed {
            for cleanup in group.into_values().filter_map(PropValue::into_cleanup) {
                cleanup.run();
            }
        }
    }

    unsafe fn set_pointer_property_with_cleanup(
        &self,
        props: SDL_PropertiesID,
        name: &CStr,
        value: *mut c_void,
        cleanup: Option<SDL_CleanupPropertyCallback>,
        userdata: *mut c_void,
    ) -> bool {
        let entry = PropValue::Pointer {
            value: addr(value),
            cleanup: cleanup.map(|f| (f, addr(userdata))),
        };
        let outcome = self
            .world
            .borrow_mut()
            .put_property("SDL_SetPointerPropertyWithCleanup", props, name, entry);
        match outcome {
            Ok(displaced) => {
                if let Some(displaced) = displaced {
                    displaced.run();
                }
                true
            }
            Err(rejected) => {
                // The value is released immediately when it cannot be stored
                if let Some(pending) = rejected.into_cleanup() {
                    pending.run();
                }
                false
            }
        }
    }

    unsafe fn get_pointer_property(&self, props: SDL_PropertiesID, name: &CStr, default: *mut c_void) -> *mut c_void {
        match self.world.borrow().property(props, name) {
            Some(PropValue::Pointer { value, .. }) => ptr(*value),
            _ => default,
        }
    }

    unsafe fn set_string_property(&self, props: SDL_PropertiesID, name: &CStr, value: Option<&CStr>) -> bool {
        let outcome = match value {
            Some(value) => {
                let entry = PropValue::String(value.to_string_lossy().into_owned());
                self.world
                    .borrow_mut()
                    .put_property("SDL_SetStringProperty", props, name, entry)
            }
            None => Ok(self
                .world
                .borrow_mut()
                .take_cleanup(props, name.to_string_lossy().as_ref())),
        };
        match outcome {
            Ok(displaced) => {
                if let Some(displaced) = displaced {
                    displaced.run();
                }
                true
            }
            Err(_) => false,
        }
    }

    unsafe fn get_string_property(&self, props: SDL_PropertiesID, name: &CStr) -> Option<String> {
        match self.world.borrow().property(props, name)? {
            PropValue::String(s) => Some(s.clone()),
            PropValue::Number(n) => Some(n.to_string()),
            PropValue::Float(f) => Some(f.to_string()),
            PropValue::Boolean(b) => Some(if *b { "true" } else { "false" }.to_string()),
            PropValue::Pointer { .. } => None,
        }
    }

    unsafe fn set_number_property(&self, props: SDL_PropertiesID, name: &CStr, value: i64) -> bool {
        let outcome = self
            .world
            .borrow_mut()
            .put_property("SDL_SetNumberProperty", props, name, PropValue::Number(value));
        match outcome {
            Ok(displaced) => {
                if let Some(displaced) = displaced {
                    displaced.run();
                }
                true
            }
            Err(_) => false,
        }
    }

    unsafe fn get_number_property(&self, props: SDL_PropertiesID, name: &CStr, default: i64) -> i64 {
        match self.world.borrow().property(props, name) {
            Some(PropValue::Number(n)) => *n,
            Some(PropValue::Float(f)) => f.round() as i64,
            Some(PropValue::Boolean(b)) => *b as i64,
            Some(PropValue::String(s)) => s.trim().parse().unwrap_or(0),
            _ => default,
        }
    }

    unsafe fn set_float_property(&self, props: SDL_PropertiesID, name: &CStr, value: f32) -> bool {
        let outcome = self
            .world
            .borrow_mut()
            .put_property("SDL_SetFloatProperty", props, name, PropValue::Float(value));
        match outcome {
            Ok(displaced) => {
                if let Some(displaced) = displaced {
                    displaced.run();
                }
                true
            }
            Err(_) => false,
        }
    }

    unsafe fn get_float_property(&self, props: SDL_PropertiesID, name: &CStr, default: f32) -> f32 {
        match self.world.borrow().property(props, name) {
            Some(PropValue::Float(f)) => *f,
            Some(PropValue::Number(n)) => *n as f32,
            Some(PropValue::Boolean(b)) => *b as i32 as f32,
            Some(PropValue::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => default,
        }
    }

    unsafe fn set_boolean_property(&self, props: SDL_PropertiesID, name: &CStr, value: bool) -> bool {
        let outcome = self
            .world
            .borrow_mut()
            .put_property("SDL_SetBooleanProperty", props, name, PropValue::Boolean(value));
        match outcome {
            Ok(displaced) => {
                if let Some(displaced) = displaced {
                    displaced.run();
                }
                true
            }
            Err(_) => false,
        }
    }

    unsafe fn get_boolean_property(&self, props: SDL_PropertiesID, name: &CStr, default: bool) -> bool {
        match self.world.borrow().property(props, name) {
            Some(PropValue::Boolean(b)) => *b,
            Some(PropValue::Number(n)) => *n != 0,
            Some(PropValue::Float(f)) => *f != 0.0,
            Some(PropValue::String(s)) => !matches!(s.as_str(), "" | "0" | "false"),
            _ => default,
        }
    }

    unsafe fn has_property(&self, props: SDL_PropertiesID, name: &CStr) -> bool {
        self.world.borrow().property(props, name).is_some()
    }

    unsafe fn get_property_type(&self, props: SDL_PropertiesID, name: &CStr) -> SDL_PropertyType {
        self.world
            .borrow()
            .property(props, name)
            .map_or(SDL_PROPERTY_TYPE_INVALID, PropValue::type_code)
    }

    unsafe fn clear_property(&self, props: SDL_PropertiesID, name: &CStr) -> bool {
        let cleanup = {
            let mut world = self.world.borrow_mut();
            if !world.properties.contains_key(&props) {
                world.set_error("Parameter 'props' is invalid");
                return false;
            }
            world.take_cleanup(props, name.to_string_lossy().as_ref())
        };
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }
        true
    }

    unsafe fn enumerate_properties(
        &self,
        props: SDL_PropertiesID,
        callback: SDL_EnumeratePropertiesCallback,
        userdata: *mut c_void,
    ) -> bool {
        let names: Vec<CString> = {
            let mut world = self.world.borrow_mut();
            match world.properties.get(&props) {
                Some(group) => group.keys().filter_map(|k| CString::new(k.as_str()).ok()).collect(),
                None => {
                    world.set_error("Parameter 'props' is invalid");
                    return false;
                }
            }
        };
        for name in &names {
            callback(userdata, props, name.as_ptr());
        }
        true
    }

    unsafe fn poll_event(&self, event: *mut SDL_Event) -> bool {
        let mut world = self.world.borrow_mut();
        if event.is_null() {
            return !world.events.is_empty();
        }
        match world.events.pop_front() {
            Some(next) => {
                *event = next;
                true
            }
            None => false,
        }
    }

    unsafe fn push_event(&self, event: *mut SDL_Event) -> bool {
        if event.is_null() {
            self.world.borrow_mut().set_error("Parameter 'event' is invalid");
            return false;
        }
        let watches = {
            let mut world = self.world.borrow_mut();
            if world.injected("SDL_PushEvent") {
                return false;
            }
            world.events.push_back(*event);
            world.watches.clone()
        };
        for (filter, userdata) in watches {
            // A watch removed by an earlier one in this round is skipped
            let installed = self
                .world
                .borrow()
                .watches
                .iter()
                .any(|(f, u)| *f as usize == filter as usize && *u == userdata);
            if installed {
                filter(ptr(userdata), event);
            }
        }
        true
    }

    unsafe fn register_events(&self, count: c_int) -> u32 {
        let mut world = self.world.borrow_mut();
        if count <= 0 {
            return 0;
        }
        let base = SDL_EVENT_USER + world.next_event;
        if base as u64 + count as u64 > SDL_EVENT_LAST as u64 + 1 {
            world.set_error("No more user events available");
            return 0;
        }
        world.next_event += count as u32;
        base
    }

    unsafe fn add_event_watch(&self, filter: SDL_EventFilter, userdata: *mut c_void) -> bool {
        let mut world = self.world.borrow_mut();
        if world.injected("SDL_AddEventWatch") {
            return false;
        }
        world.watches.push((filter, addr(userdata)));
        true
    }

    unsafe fn remove_event_watch(&self, filter: SDL_EventFilter, userdata: *mut c_void) {
        let mut world = self.world.borrow_mut();
        if let Some(index) = world
            .watches
            .iter()
            .position(|(f, u)| *f as usize == filter as usize && *u == addr(userdata))
        {
            world.watches.remove(index);
        }
    }

    unsafe fn ttf_init(&self) -> bool {
        let mut world = self.world.borrow_mut();
        if world.injected("TTF_Init") {
            return false;
        }
        world.ttf_refs += 1;
        true
    }

    unsafe fn ttf_quit(&self) {
        let mut world = self.world.borrow_mut();
        world.ttf_refs = world.ttf_refs.saturating_sub(1);
        if world.ttf_refs == 0 {
            // The font library is gone; every font and text made from it dangles
            world.fonts.clear();
            world.texts.clear();
        }
    }

    unsafe fn open_font(&self, file: &CStr, ptsize: f32) -> *mut TTF_Font {
        let mut world = self.world.borrow_mut();
        if world.injected("TTF_OpenFont") {
            return std::ptr::null_mut();
        }
        if world.ttf_refs == 0 {
            world.set_error("Library not initialized");
            return std::ptr::null_mut();
        }
        let path = file.to_string_lossy().into_owned();
        if !Path::new(&path).is_file() {
            world.set_error(format!("Couldn't open {}", path));
            return std::ptr::null_mut();
        }
        let family = Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let font = world.alloc_addr();
        world.fonts.insert(font, FontObj { size: ptsize, family });
        ptr(font)
    }

    unsafe fn close_font(&self, font: *mut TTF_Font) {
        self.world.borrow_mut().fonts.remove(&addr(font));
    }

    unsafe fn get_font_size(&self, font: *mut TTF_Font) -> f32 {
        self.world.borrow().fonts.get(&addr(font)).map_or(0.0, |f| f.size)
    }

    unsafe fn set_font_size(&self, font: *mut TTF_Font, ptsize: f32) -> bool {
        let mut world = self.world.borrow_mut();
        if ptsize <= 0.0 {
            world.set_error("Parameter 'ptsize' is invalid");
            return false;
        }
        let Some(obj) = world.fonts.get_mut(&addr(font)) else {
            world.set_error("Parameter 'font' is invalid");
            return false;
        };
        obj.size = ptsize;
        true
    }

    unsafe fn get_font_height(&self, font: *mut TTF_Font) -> c_int {
        self.world.borrow().fonts.get(&addr(font)).map_or(0, FontObj::height)
    }

    unsafe fn get_font_family_name(&self, font: *mut TTF_Font) -> Option<String> {
        self.world.borrow().fonts.get(&addr(font)).map(|f| f.family.clone())
    }

    unsafe fn create_surface_text_engine(&self) -> *mut TTF_TextEngine {
        let mut world = self.world.borrow_mut();
        if world.injected("TTF_CreateSurfaceTextEngine") {
            return std::ptr::null_mut();
        }
        let engine = world.alloc_addr();
        world.engines.insert(engine);
        ptr(engine)
    }

    unsafe fn destroy_surface_text_engine(&self, engine: *mut TTF_TextEngine) {
        self.world.borrow_mut().engines.remove(&addr(engine));
    }

    unsafe fn create_text(
        &self,
        engine: *mut TTF_TextEngine,
        font: *mut TTF_Font,
        text: *const c_char,
        length: usize,
    ) -> *mut TTF_Text {
        let mut world = self.world.borrow_mut();
        if world.injected("TTF_CreateText") {
            return std::ptr::null_mut();
        }
        if !world.engines.contains(&addr(engine)) || !world.fonts.contains_key(&addr(font)) {
            world.set_error("Parameter 'engine' or 'font' is invalid");
            return std::ptr::null_mut();
        }
        let bytes = read_text(text, length);
        let handle = world.alloc_addr();
        world.texts.insert(
            handle,
            TextObj {
                font: addr(font),
                bytes,
                color: [255, 255, 255, 255],
                draw: DrawData::default(),
            },
        );
        ptr(handle)
    }

    unsafe fn destroy_text(&self, text: *mut TTF_Text) {
        self.world.borrow_mut().texts.remove(&addr(text));
    }

    unsafe fn set_text_color(&self, text: *mut TTF_Text, r: u8, g: u8, b: u8, a: u8) -> bool {
        let mut world = self.world.borrow_mut();
        match world.texts.get_mut(&addr(text)) {
            Some(obj) => {
                obj.color = [r, g, b, a];
                true
            }
            None => {
                world.set_error("Parameter 'text' is invalid");
                false
            }
        }
    }

    unsafe fn get_text_color(&self, text: *mut TTF_Text, r: *mut u8, g: *mut u8, b: *mut u8, a: *mut u8) -> bool {
        let mut world = self.world.borrow_mut();
        let Some(obj) = world.texts.get(&addr(text)) else {
            world.set_error("Parameter 'text' is invalid");
            return false;
        };
        let [cr, cg, cb, ca] = obj.color;
        for (out, value) in [(r, cr), (g, cg), (b, cb), (a, ca)] {
            if !out.is_null() {
                *out = value;
            }
        }
        true
    }

    unsafe fn set_text_string(&self, text: *mut TTF_Text, string: *const c_char, length: usize) -> bool {
        let mut world = self.world.borrow_mut();
        if world.injected("TTF_SetTextString") {
            return false;
        }
        match world.texts.get_mut(&addr(text)) {
            Some(obj) => {
                obj.bytes = read_text(string, length);
                obj.draw = DrawData::default();
                true
            }
            None => {
                world.set_error("Parameter 'text' is invalid");
                false
            }
        }
    }

    unsafe fn get_text_substring(&self, text: *mut TTF_Text, offset: c_int, substring: *mut RawSubString) -> bool {
        let mut world = self.world.borrow_mut();
        if substring.is_null() {
            world.set_error("Parameter 'substring' is invalid");
            return false;
        }
        let Some((height, clusters)) = world.texts.get(&addr(text)).and_then(|obj| {
            let font = world.fonts.get(&obj.font)?;
            Some((font.height(), layout(&obj.bytes, font.advance(), font.height())))
        }) else {
            world.set_error("Parameter 'text' is invalid");
            return false;
        };

        let offset = offset.max(0) as usize;
        *substring = match clusters.get(offset) {
            Some(cluster) => *cluster,
            None => end_marker(&clusters, height),
        };
        true
    }

    unsafe fn get_text_substrings_for_range(
        &self,
        text: *mut TTF_Text,
        offset: c_int,
        length: c_int,
        count: *mut c_int,
    ) -> *mut *mut RawSubString {
        let mut world = self.world.borrow_mut();
        let Some(clusters) = world.texts.get(&addr(text)).and_then(|obj| {
            let font = world.fonts.get(&obj.font)?;
            Some(layout(&obj.bytes, font.advance(), font.height()))
        }) else {
            world.set_error("Parameter 'text' is invalid");
            return std::ptr::null_mut();
        };

        let start = (offset.max(0) as usize).min(clusters.len());
        let end = if length < 0 {
            clusters.len()
        } else {
            (start + length as usize).min(clusters.len())
        };

        let mut items: Vec<RawSubString> = clusters[start..end].to_vec();
        let mut pointers: Vec<*mut RawSubString> = items.iter_mut().map(|s| s as *mut RawSubString).collect();
        pointers.push(std::ptr::null_mut());
        if !count.is_null() {
            *count = items.len() as c_int;
        }

        let base = pointers.as_mut_ptr();
        world.allocations.insert(
            addr(base),
            SubStringBlock {
                _items: items,
                _pointers: pointers,
            },
        );
        base
    }

    unsafe fn get_gpu_text_draw_data(&self, text: *mut TTF_Text) -> *mut RawGpuAtlasDrawSequence {
        let mut world = self.world.borrow_mut();
        let World { texts, fonts, .. } = &mut *world;
        let Some(obj) = texts.get_mut(&addr(text)) else {
            return std::ptr::null_mut();
        };
        let Some(font) = fonts.get(&obj.font) else {
            return std::ptr::null_mut();
        };
        Self::rebuild_draw_data(obj, font);
        obj.draw
            .sequences
            .first_mut()
            .map_or(std::ptr::null_mut(), |s| s as *mut RawGpuAtlasDrawSequence)
    }
}

/// `length == 0` means NUL-terminated, as in SDL_ttf
unsafe fn read_text(text: *const c_char, length: usize) -> Vec<u8> {
    if text.is_null() {
        Vec::new()
    } else if length == 0 {
        CStr::from_ptr(text).to_bytes().to_vec()
    } else {
        std::slice::from_raw_parts(text as *const u8, length).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_insert_positions() {
        let api = HeadlessApi::new();
        unsafe {
            let tray = api.create_tray(std::ptr::null_mut(), None);
            let menu = api.create_tray_menu(tray);
            let a = api.insert_tray_entry_at(menu, -1, Some(&c("a")), SDL_TRAYENTRY_BUTTON);
            let b = api.insert_tray_entry_at(menu, 0, Some(&c("b")), SDL_TRAYENTRY_BUTTON);
            assert!(api.insert_tray_entry_at(menu, 5, Some(&c("x")), SDL_TRAYENTRY_BUTTON).is_null());
            assert_eq!(api.get_error(), "Invalid entry position");

            let mut count = 0;
            let entries = api.get_tray_entries(menu, &mut count);
            assert_eq!(count, 2);
            assert_eq!(*entries, b);
            assert_eq!(*entries.add(1), a);
            assert!((*entries.add(2)).is_null());
        }
    }

    #[test]
    fn test_submenu_requires_flag() {
        let api = HeadlessApi::new();
        unsafe {
            let tray = api.create_tray(std::ptr::null_mut(), None);
            let menu = api.create_tray_menu(tray);
            let plain = api.insert_tray_entry_at(menu, -1, Some(&c("plain")), SDL_TRAYENTRY_BUTTON);
            assert!(api.create_tray_submenu(plain).is_null());
        }
    }

    #[test]
    fn test_destroy_tray_removes_subtree() {
        let api = HeadlessApi::new();
        unsafe {
            let tray = api.create_tray(std::ptr::null_mut(), None);
            let menu = api.create_tray_menu(tray);
            let holder = api.insert_tray_entry_at(menu, -1, Some(&c("more")), SDL_TRAYENTRY_SUBMENU);
            let sub = api.create_tray_submenu(holder);
            api.insert_tray_entry_at(sub, -1, Some(&c("leaf")), SDL_TRAYENTRY_BUTTON);
            assert_eq!(api.live_objects().entries, 2);

            api.destroy_tray(tray);
        }
        assert_eq!(api.live_objects(), LiveObjects::default());
    }

    #[test]
    fn test_click_toggles_checkbox_before_callback() {
        unsafe extern "C" fn record(userdata: *mut c_void, entry: *mut SDL_TrayEntry) {
            let seen = &*(userdata as *const Cell<usize>);
            seen.set(entry as usize);
        }

        let api = HeadlessApi::new();
        let seen = Cell::new(0usize);
        unsafe {
            let tray = api.create_tray(std::ptr::null_mut(), None);
            let menu = api.create_tray_menu(tray);
            let entry = api.insert_tray_entry_at(menu, -1, Some(&c("toggle")), SDL_TRAYENTRY_CHECKBOX);
            api.set_tray_entry_callback(entry, Some(record), &seen as *const _ as *mut c_void);

            api.click_tray_entry(entry);
            assert!(api.get_tray_entry_checked(entry));
            assert_eq!(seen.get(), entry as usize);
        }
    }

    #[test]
    fn test_failed_pointer_property_runs_cleanup() {
        unsafe extern "C" fn count(userdata: *mut c_void, _value: *mut c_void) {
            let calls = &*(userdata as *const Cell<u32>);
            calls.set(calls.get() + 1);
        }

        let api = HeadlessApi::new();
        let calls = Cell::new(0u32);
        let userdata = &calls as *const _ as *mut c_void;
        unsafe {
            let props = api.create_properties();
            api.fail_next("SDL_SetPointerPropertyWithCleanup");
            assert!(!api.set_pointer_property_with_cleanup(props, &c("p"), 0x10 as *mut c_void, Some(count), userdata));
            assert_eq!(calls.get(), 1);

            assert!(api.set_pointer_property_with_cleanup(props, &c("p"), 0x20 as *mut c_void, Some(count), userdata));
            assert!(api.set_number_property(props, &c("p"), 3));
            assert_eq!(calls.get(), 2);
            api.destroy_properties(props);
        }
        assert_eq!(api.live_objects().properties, 0);
    }

    #[test]
    fn test_layout_flags() {
        let clusters = layout(b"ab\nc", 5, 10);
        let flags = |i: usize| SubStringFlags::from_bits_retain(clusters[i].flags);

        assert!(flags(0).contains(SubStringFlags::TEXT_START | SubStringFlags::LINE_START));
        assert!(flags(1).contains(SubStringFlags::LINE_END));
        assert!(flags(3).contains(SubStringFlags::LINE_START | SubStringFlags::TEXT_END));
        assert_eq!(clusters[3].line_index, 1);
        assert_eq!(clusters[3].rect.y, 10);
        assert_eq!(clusters[1].rect.x, 5);
    }

    #[test]
    fn test_register_events_exhaustion() {
        let api = HeadlessApi::new();
        unsafe {
            assert_eq!(api.register_events(2), SDL_EVENT_USER);
            assert_eq!(api.register_events(1), SDL_EVENT_USER + 2);
            assert_eq!(api.register_events(0x10000), 0);
        }
    }
}

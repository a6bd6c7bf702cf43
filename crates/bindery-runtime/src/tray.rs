//! System tray resource tree
//!
//! A [`Tray`] owns at most one top-level [`TrayMenu`]; a menu owns an ordered
//! list of [`TrayEntry`] values; an entry created with
//! [`EntryFlags::SUBMENU`] may own one child menu, and so on.
//!
//! Every tray carries its own [`CallbackRegistry`] and a mirror of the tree,
//! keyed by serial numbers rather than native addresses. Menu and entry
//! wrappers are cheap aliases into that mirror: once a node is removed (or its
//! tray destroyed) every alias reports dead and panics on use.
//!
//! Tear-down always runs in the same order: the native object goes first, so
//! the library can no longer call into a trampoline, then the registrations of
//! the node and all its descendants are retired.

use crate::context::Context;
use crate::error::BinderyResult;
use crate::ffi::array::NullTerminated;
use crate::ffi::callbacks::{CallbackRegistry, OwnerKey, TrampolineId, TrayAction};
use crate::ffi::handle::{Handle, HandleCell, HandleKind, TrayEntryKind, TrayKind, TrayMenuKind};
use crate::ffi::sys::{self, SDL_TrayEntry};
use crate::native::{c_string, native_error, NativeApi};
use crate::surface::Surface;
use bitflags::bitflags;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

bitflags! {
    /// `SDL_TrayEntryFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntryFlags: u32 {
        const BUTTON = sys::SDL_TRAYENTRY_BUTTON;
        const CHECKBOX = sys::SDL_TRAYENTRY_CHECKBOX;
        const SUBMENU = sys::SDL_TRAYENTRY_SUBMENU;
        const DISABLED = sys::SDL_TRAYENTRY_DISABLED;
        const CHECKED = sys::SDL_TRAYENTRY_CHECKED;
    }
}

impl Default for EntryFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Host action run when an entry is activated
pub type EntryAction = Box<dyn FnMut(&TrayEntry)>;

/// Declarative description of one entry
#[derive(Default)]
pub struct EntryOptions {
    /// Insert position; `None` appends
    pub position: Option<i32>,
    /// `None` makes a separator
    pub label: Option<String>,
    /// Explicit flags, merged with the inferred ones
    pub flags: EntryFlags,
    /// `Some` makes a checkbox in that initial state
    pub checked: Option<bool>,
    pub disabled: bool,
    pub action: Option<EntryAction>,
    /// `Some` makes a submenu holder with these children
    pub submenu: Option<Vec<EntryOptions>>,
}

impl EntryOptions {
    pub fn button(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn checkbox(label: impl Into<String>, checked: bool) -> Self {
        Self {
            label: Some(label.into()),
            checked: Some(checked),
            ..Default::default()
        }
    }

    pub fn separator() -> Self {
        Self::default()
    }

    pub fn submenu(label: impl Into<String>, children: Vec<EntryOptions>) -> Self {
        Self {
            label: Some(label.into()),
            submenu: Some(children),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: impl FnMut(&TrayEntry) + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    pub fn with_flags(mut self, flags: EntryFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn at(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Explicit flags OR inferred flags; nothing explicit is ever cleared
    pub fn resolved_flags(&self) -> EntryFlags {
        let mut inferred = EntryFlags::empty();
        if self.submenu.is_some() {
            inferred |= EntryFlags::SUBMENU;
        }
        if let Some(checked) = self.checked {
            inferred |= EntryFlags::CHECKBOX;
            if checked {
                inferred |= EntryFlags::CHECKED;
            }
        }
        if self.disabled {
            inferred |= EntryFlags::DISABLED;
        }

        let mut flags = self.flags | inferred;
        let kinds = EntryFlags::BUTTON | EntryFlags::CHECKBOX | EntryFlags::SUBMENU;
        if self.label.is_some() && !flags.intersects(kinds) {
            flags |= EntryFlags::BUTTON;
        }
        if (flags & kinds).bits().count_ones() > 1 {
            tracing::debug!(label = ?self.label, ?flags, "entry combines several kind flags; keeping all of them");
        }
        flags
    }
}

impl fmt::Debug for EntryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryOptions")
            .field("position", &self.position)
            .field("label", &self.label)
            .field("flags", &self.flags)
            .field("checked", &self.checked)
            .field("disabled", &self.disabled)
            .field("action", &self.action.is_some())
            .field("submenu", &self.submenu)
            .finish()
    }
}

/// Declarative description of a whole tray
#[derive(Debug, Default)]
pub struct TrayOptions {
    /// BMP file for the icon
    pub icon: Option<PathBuf>,
    pub tooltip: Option<String>,
    /// Top-level menu; no menu is created when empty
    pub entries: Vec<EntryOptions>,
}

// ============================================================================
// Mirror of the native tree
// ============================================================================

type Serial = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuOwner {
    Tray,
    Entry(Serial),
}

struct MenuNode {
    handle: Handle<TrayMenuKind>,
    owner: MenuOwner,
    entries: Vec<Serial>,
}

struct EntryNode {
    handle: Handle<TrayEntryKind>,
    menu: Serial,
    flags: EntryFlags,
    separator: bool,
    submenu: Option<Serial>,
}

#[derive(Default)]
struct NodeTable {
    next_serial: Serial,
    root: Option<Serial>,
    menus: HashMap<Serial, MenuNode>,
    entries: HashMap<Serial, EntryNode>,
}

impl NodeTable {
    fn next_serial(&mut self) -> Serial {
        self.next_serial += 1;
        self.next_serial
    }

    fn add_menu(&mut self, handle: Handle<TrayMenuKind>, owner: MenuOwner) -> Serial {
        let serial = self.next_serial();
        self.menus.insert(
            serial,
            MenuNode {
                handle,
                owner,
                entries: Vec::new(),
            },
        );
        match owner {
            MenuOwner::Tray => self.root = Some(serial),
            MenuOwner::Entry(entry) => {
                if let Some(node) = self.entries.get_mut(&entry) {
                    node.submenu = Some(serial);
                }
            }
        }
        serial
    }

    fn add_entry(
        &mut self,
        menu: Serial,
        position: i32,
        handle: Handle<TrayEntryKind>,
        flags: EntryFlags,
        separator: bool,
    ) -> Serial {
        let serial = self.next_serial();
        self.entries.insert(
            serial,
            EntryNode {
                handle,
                menu,
                flags,
                separator,
                submenu: None,
            },
        );
        if let Some(node) = self.menus.get_mut(&menu) {
            match usize::try_from(position) {
                Ok(index) if index <= node.entries.len() => node.entries.insert(index, serial),
                _ => node.entries.push(serial),
            }
        }
        serial
    }

    fn entry_by_addr(&self, addr: usize) -> Option<(Serial, Handle<TrayEntryKind>)> {
        self.entries
            .iter()
            .find(|(_, node)| node.handle.addr() == addr)
            .map(|(serial, node)| (*serial, node.handle))
    }

    fn menu_by_addr(&self, addr: usize) -> Option<(Serial, Handle<TrayMenuKind>)> {
        self.menus
            .iter()
            .find(|(_, node)| node.handle.addr() == addr)
            .map(|(serial, node)| (*serial, node.handle))
    }

    /// Unlink an entry and drop its subtree; returns every entry dropped
    fn detach_entry(&mut self, serial: Serial) -> Vec<Handle<TrayEntryKind>> {
        if let Some(menu) = self.entries.get(&serial).map(|node| node.menu) {
            if let Some(parent) = self.menus.get_mut(&menu) {
                parent.entries.retain(|s| *s != serial);
            }
        }
        let mut removed = Vec::new();
        self.drop_entry(serial, &mut removed);
        removed
    }

    fn drop_entry(&mut self, serial: Serial, removed: &mut Vec<Handle<TrayEntryKind>>) {
        match self.entries.remove(&serial) {
            Some(node) => {
                removed.push(node.handle);
                if let Some(submenu) = node.submenu {
                    self.drop_menu(submenu, removed);
                }
            }
            None => tracing::warn!(serial, "tray entry already gone during tear-down; skipping"),
        }
    }

    fn drop_menu(&mut self, serial: Serial, removed: &mut Vec<Handle<TrayEntryKind>>) {
        match self.menus.remove(&serial) {
            Some(node) => {
                for entry in node.entries {
                    self.drop_entry(entry, removed);
                }
            }
            None => tracing::warn!(serial, "tray menu already gone during tear-down; skipping"),
        }
    }

    fn clear(&mut self) -> usize {
        let count = self.menus.len() + self.entries.len();
        self.menus.clear();
        self.entries.clear();
        self.root = None;
        count
    }
}

struct TrayShared {
    api: Rc<dyn NativeApi>,
    callbacks: CallbackRegistry,
    nodes: RefCell<NodeTable>,
    tooltip: RefCell<Option<String>>,
}

#[track_caller]
fn used_after_destroy<K: HandleKind>(operation: &str) -> ! {
    panic!("{} used after destroy in `{}`", K::NAME, operation)
}

const ACTION_SLOT: &str = "action";

unsafe fn entry_addr(entry: *mut SDL_TrayEntry) -> usize {
    entry as usize
}

// ============================================================================
// Tray
// ============================================================================

/// Owning handle of a system tray icon and everything below it
pub struct Tray {
    shared: Rc<TrayShared>,
    cell: HandleCell<TrayKind>,
}

impl Tray {
    /// Create a bare tray; the icon file is decoded with the native BMP loader
    pub fn new(ctx: &Context, icon: Option<&Path>, tooltip: Option<&str>) -> BinderyResult<Self> {
        let api = ctx.api().clone();
        let icon = icon.map(|path| Surface::load_bmp(&api, path)).transpose()?;
        let tooltip_c = tooltip.map(|t| c_string("SDL_CreateTray", t)).transpose()?;
        let icon_raw = icon
            .as_ref()
            .map_or(std::ptr::null_mut(), |surface| surface.raw("SDL_CreateTray"));

        let raw = unsafe { api.create_tray(icon_raw, tooltip_c.as_deref()) };
        let handle = Handle::from_raw(raw).ok_or_else(|| native_error(&*api, "SDL_CreateTray"))?;
        tracing::debug!(?handle, "tray created");

        Ok(Self {
            shared: Rc::new(TrayShared {
                api,
                callbacks: CallbackRegistry::new(),
                nodes: RefCell::new(NodeTable::default()),
                tooltip: RefCell::new(tooltip.map(str::to_string)),
            }),
            cell: HandleCell::new(handle),
        })
    }

    /// Build a tray and its whole menu tree, depth-first.
    ///
    /// On failure everything created so far is destroyed again.
    pub fn create(ctx: &Context, options: TrayOptions) -> BinderyResult<Self> {
        let TrayOptions { icon, tooltip, entries } = options;
        let tray = Self::new(ctx, icon.as_deref(), tooltip.as_deref())?;
        if !entries.is_empty() {
            let menu = tray.create_menu()?;
            for entry in entries {
                menu.build(entry)?;
            }
        }
        Ok(tray)
    }

    pub fn handle(&self) -> Option<Handle<TrayKind>> {
        self.cell.get()
    }

    pub fn is_live(&self) -> bool {
        self.cell.is_live()
    }

    /// Create the top-level menu.
    ///
    /// # Panics
    ///
    /// Panics if the tray already has a menu.
    pub fn create_menu(&self) -> BinderyResult<TrayMenu> {
        let raw = self.cell.live("create_menu");
        if self.shared.nodes.borrow().root.is_some() {
            panic!("SDL_Tray already has a menu; `create_menu` may only be called once per tray");
        }

        let api = &self.shared.api;
        let menu = Handle::from_raw(unsafe { api.create_tray_menu(raw) })
            .ok_or_else(|| native_error(&**api, "SDL_CreateTrayMenu"))?;
        let serial = self.shared.nodes.borrow_mut().add_menu(menu, MenuOwner::Tray);
        tracing::debug!(?menu, "tray menu created");
        Ok(TrayMenu::attach(&self.shared, serial, menu))
    }

    /// The top-level menu, if created
    pub fn menu(&self) -> Option<TrayMenu> {
        self.cell.live("menu");
        let nodes = self.shared.nodes.borrow();
        let serial = nodes.root?;
        let handle = nodes.menus.get(&serial)?.handle;
        Some(TrayMenu::attach(&self.shared, serial, handle))
    }

    pub fn tooltip(&self) -> Option<String> {
        self.cell.live("tooltip");
        self.shared.tooltip.borrow().clone()
    }

    pub fn set_tooltip(&self, tooltip: Option<&str>) -> BinderyResult<()> {
        let raw = self.cell.live("set_tooltip");
        let tooltip_c = tooltip.map(|t| c_string("SDL_SetTrayTooltip", t)).transpose()?;
        unsafe { self.shared.api.set_tray_tooltip(raw, tooltip_c.as_deref()) };
        *self.shared.tooltip.borrow_mut() = tooltip.map(str::to_string);
        Ok(())
    }

    /// Replace the icon with a BMP file, or clear it with `None`
    pub fn set_icon(&self, icon: Option<&Path>) -> BinderyResult<()> {
        let raw = self.cell.live("set_icon");
        let surface = icon.map(|path| Surface::load_bmp(&self.shared.api, path)).transpose()?;
        let icon_raw = surface
            .as_ref()
            .map_or(std::ptr::null_mut(), |surface| surface.raw("SDL_SetTrayIcon"));
        unsafe { self.shared.api.set_tray_icon(raw, icon_raw) };
        Ok(())
    }

    /// Live callback registrations across the whole tree
    pub fn registrations(&self) -> usize {
        self.cell.live("registrations");
        self.shared.callbacks.len()
    }

    /// Destroy the tray, its menus and entries, and retire every callback.
    ///
    /// Returns `false` (and does nothing) if already destroyed.
    pub fn destroy(&self) -> bool {
        let shared = &self.shared;
        self.cell.destroy_with(|raw| {
            unsafe { shared.api.destroy_tray(raw) };
            let nodes = shared.nodes.borrow_mut().clear();
            let retired = shared.callbacks.clear();
            tracing::debug!(nodes, retired, "tray torn down");
        })
    }

    /// Indented rendering of the live tree
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if !self.is_live() {
            out.push_str("tray (destroyed)\n");
            return out;
        }
        match self.tooltip() {
            Some(tooltip) => out.push_str(&format!("tray {:?}\n", tooltip)),
            None => out.push_str("tray\n"),
        }
        if let Some(menu) = self.menu() {
            menu.dump_into(&mut out, 1);
        }
        out
    }
}

impl Drop for Tray {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Tray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tray")
            .field("handle", &self.cell)
            .field("registrations", &self.shared.callbacks.len())
            .finish()
    }
}

// ============================================================================
// Menus
// ============================================================================

/// Alias of a menu inside a tray
#[derive(Clone)]
pub struct TrayMenu {
    shared: Rc<TrayShared>,
    serial: Serial,
    handle: Handle<TrayMenuKind>,
}

impl TrayMenu {
    fn attach(shared: &Rc<TrayShared>, serial: Serial, handle: Handle<TrayMenuKind>) -> Self {
        Self {
            shared: shared.clone(),
            serial,
            handle,
        }
    }

    pub fn handle(&self) -> Handle<TrayMenuKind> {
        self.handle
    }

    pub fn is_live(&self) -> bool {
        self.shared.nodes.borrow().menus.contains_key(&self.serial)
    }

    #[track_caller]
    fn live(&self, operation: &str) -> *mut sys::SDL_TrayMenu {
        if !self.is_live() {
            used_after_destroy::<TrayMenuKind>(operation);
        }
        self.handle.raw()
    }

    /// Insert an entry at `position` (`-1` appends); `None` label makes a separator
    pub fn insert_entry(&self, position: i32, label: Option<&str>, flags: EntryFlags) -> BinderyResult<TrayEntry> {
        let raw = self.live("insert_entry");
        let label_c = label.map(|l| c_string("SDL_InsertTrayEntryAt", l)).transpose()?;

        let api = &self.shared.api;
        let entry = Handle::from_raw(unsafe { api.insert_tray_entry_at(raw, position, label_c.as_deref(), flags.bits()) })
            .ok_or_else(|| native_error(&**api, "SDL_InsertTrayEntryAt"))?;
        let serial = self
            .shared
            .nodes
            .borrow_mut()
            .add_entry(self.serial, position, entry, flags, label.is_none());
        tracing::debug!(?entry, ?flags, position, "tray entry inserted");

        Ok(TrayEntry {
            shared: self.shared.clone(),
            serial,
            handle: entry,
        })
    }

    pub fn append_entry(&self, label: Option<&str>, flags: EntryFlags) -> BinderyResult<TrayEntry> {
        self.insert_entry(sys::SDL_TRAY_APPEND, label, flags)
    }

    /// Create an entry from `options`, register its action, then build its
    /// submenu children
    pub fn build(&self, options: EntryOptions) -> BinderyResult<TrayEntry> {
        let flags = options.resolved_flags();
        let EntryOptions {
            position,
            label,
            action,
            submenu,
            ..
        } = options;

        let entry = self.insert_entry(position.unwrap_or(sys::SDL_TRAY_APPEND), label.as_deref(), flags)?;
        if let Some(action) = action {
            entry.set_boxed_action(action)?;
        }
        if let Some(children) = submenu {
            let menu = entry.create_submenu()?;
            for child in children {
                menu.build(child)?;
            }
        }
        Ok(entry)
    }

    /// Entries in display order, as the native library reports them
    pub fn entries(&self) -> Vec<TrayEntry> {
        let raw = self.live("entries");
        let mut count = 0;
        let base = unsafe { self.shared.api.get_tray_entries(raw, &mut count) };
        let addrs: Vec<usize> = unsafe { NullTerminated::borrowed(base, entry_addr) }.collect();

        let nodes = self.shared.nodes.borrow();
        addrs
            .into_iter()
            .filter_map(|addr| match nodes.entry_by_addr(addr) {
                Some((serial, handle)) => Some(TrayEntry {
                    shared: self.shared.clone(),
                    serial,
                    handle,
                }),
                None => {
                    tracing::warn!(addr, "native menu lists an entry this tray does not know");
                    None
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live("len");
        self.shared
            .nodes
            .borrow()
            .menus
            .get(&self.serial)
            .map_or(0, |node| node.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entry holding this menu; `None` for a top-level menu
    pub fn parent_entry(&self) -> Option<TrayEntry> {
        let raw = self.live("parent_entry");
        let parent = unsafe { self.shared.api.get_tray_menu_parent_entry(raw) };
        if parent.is_null() {
            return None;
        }
        let (serial, handle) = self.shared.nodes.borrow().entry_by_addr(parent as usize)?;
        Some(TrayEntry {
            shared: self.shared.clone(),
            serial,
            handle,
        })
    }

    /// The tray holding this menu; `None` for a submenu
    pub fn parent_tray(&self) -> Option<Handle<TrayKind>> {
        let raw = self.live("parent_tray");
        Handle::from_raw(unsafe { self.shared.api.get_tray_menu_parent_tray(raw) })
    }

    /// Whether the tray itself holds this menu
    pub fn is_top_level(&self) -> bool {
        self.shared
            .nodes
            .borrow()
            .menus
            .get(&self.serial)
            .is_some_and(|node| node.owner == MenuOwner::Tray)
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        for entry in self.entries() {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&entry.describe());
            out.push('\n');
            if let Some(submenu) = entry.submenu() {
                submenu.dump_into(out, depth + 1);
            }
        }
    }
}

impl fmt::Debug for TrayMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrayMenu")
            .field("handle", &self.handle)
            .field("live", &self.is_live())
            .finish()
    }
}

// ============================================================================
// Entries
// ============================================================================

/// Alias of an entry inside a tray
#[derive(Clone)]
pub struct TrayEntry {
    shared: Rc<TrayShared>,
    serial: Serial,
    handle: Handle<TrayEntryKind>,
}

impl TrayEntry {
    pub fn handle(&self) -> Handle<TrayEntryKind> {
        self.handle
    }

    pub fn is_live(&self) -> bool {
        self.shared.nodes.borrow().entries.contains_key(&self.serial)
    }

    #[track_caller]
    fn live(&self, operation: &str) -> *mut SDL_TrayEntry {
        if !self.is_live() {
            used_after_destroy::<TrayEntryKind>(operation);
        }
        self.handle.raw()
    }

    #[track_caller]
    fn node<R>(&self, operation: &str, read: impl FnOnce(&EntryNode) -> R) -> R {
        match self.shared.nodes.borrow().entries.get(&self.serial) {
            Some(node) => read(node),
            None => used_after_destroy::<TrayEntryKind>(operation),
        }
    }

    #[track_caller]
    fn reject_separator(&self, operation: &str) {
        if self.is_separator() {
            panic!("`{}` is not defined for separator entries", operation);
        }
    }

    fn owner(&self) -> OwnerKey {
        OwnerKey::of(self.handle)
    }

    /// Flags the entry was created with
    pub fn flags(&self) -> EntryFlags {
        self.node("flags", |node| node.flags)
    }

    pub fn is_separator(&self) -> bool {
        self.node("is_separator", |node| node.separator)
    }

    /// `None` for separators
    pub fn label(&self) -> Option<String> {
        let raw = self.live("label");
        unsafe { self.shared.api.get_tray_entry_label(raw) }
    }

    /// Ignored for separators
    pub fn set_label(&self, label: &str) -> BinderyResult<()> {
        let raw = self.live("set_label");
        if self.is_separator() {
            tracing::debug!(entry = ?self.handle, "ignoring label change on a separator");
            return Ok(());
        }
        let label_c = c_string("SDL_SetTrayEntryLabel", label)?;
        unsafe { self.shared.api.set_tray_entry_label(raw, &label_c) };
        Ok(())
    }

    pub fn checked(&self) -> bool {
        let raw = self.live("checked");
        self.reject_separator("checked");
        unsafe { self.shared.api.get_tray_entry_checked(raw) }
    }

    pub fn set_checked(&self, checked: bool) {
        let raw = self.live("set_checked");
        self.reject_separator("set_checked");
        unsafe { self.shared.api.set_tray_entry_checked(raw, checked) }
    }

    pub fn enabled(&self) -> bool {
        let raw = self.live("enabled");
        unsafe { self.shared.api.get_tray_entry_enabled(raw) }
    }

    pub fn set_enabled(&self, enabled: bool) {
        let raw = self.live("set_enabled");
        unsafe { self.shared.api.set_tray_entry_enabled(raw, enabled) }
    }

    /// Run `action` whenever the entry is activated, replacing any previous one
    pub fn set_action(&self, action: impl FnMut(&TrayEntry) + 'static) -> BinderyResult<TrampolineId> {
        self.set_boxed_action(Box::new(action))
    }

    fn set_boxed_action(&self, mut action: EntryAction) -> BinderyResult<TrampolineId> {
        let raw = self.live("set_action");
        self.reject_separator("set_action");

        let api = self.shared.api.clone();
        let this = self.clone();
        self.shared.callbacks.register::<TrayAction>(
            self.owner(),
            ACTION_SLOT,
            Box::new(move |_entry: *mut SDL_TrayEntry| action(&this)),
            |callback, userdata| {
                unsafe { api.set_tray_entry_callback(raw, Some(callback), userdata) };
                Ok(())
            },
        )
    }

    /// Detach the action; `false` when there was none
    pub fn clear_action(&self) -> bool {
        let raw = self.live("clear_action");
        self.reject_separator("clear_action");
        unsafe {
            self.shared
                .api
                .set_tray_entry_callback(raw, None, std::ptr::null_mut())
        };
        self.shared.callbacks.retire(self.owner(), ACTION_SLOT)
    }

    pub fn has_action(&self) -> bool {
        self.is_live() && self.shared.callbacks.contains(self.owner(), ACTION_SLOT)
    }

    /// Activate the entry through the native library, as a user click would
    pub fn click(&self) {
        let raw = self.live("click");
        unsafe { self.shared.api.click_tray_entry(raw) }
    }

    /// Create the child menu of a submenu holder.
    ///
    /// # Panics
    ///
    /// Panics unless the entry was created with [`EntryFlags::SUBMENU`] and has
    /// no submenu yet.
    pub fn create_submenu(&self) -> BinderyResult<TrayMenu> {
        let raw = self.live("create_submenu");
        let (flags, existing) = self.node("create_submenu", |node| (node.flags, node.submenu));
        if !flags.contains(EntryFlags::SUBMENU) {
            panic!("SDL_TrayEntry was created without EntryFlags::SUBMENU; `create_submenu` is not allowed");
        }
        if existing.is_some() {
            panic!("SDL_TrayEntry already has a submenu; `create_submenu` may only be called once per entry");
        }

        let api = &self.shared.api;
        let menu = Handle::from_raw(unsafe { api.create_tray_submenu(raw) })
            .ok_or_else(|| native_error(&**api, "SDL_CreateTraySubmenu"))?;
        let serial = self
            .shared
            .nodes
            .borrow_mut()
            .add_menu(menu, MenuOwner::Entry(self.serial));
        tracing::debug!(?menu, entry = ?self.handle, "tray submenu created");
        Ok(TrayMenu::attach(&self.shared, serial, menu))
    }

    pub fn submenu(&self) -> Option<TrayMenu> {
        let serial = self.node("submenu", |node| node.submenu)?;
        let handle = self.shared.nodes.borrow().menus.get(&serial)?.handle;
        Some(TrayMenu::attach(&self.shared, serial, handle))
    }

    /// The menu this entry sits in
    pub fn parent(&self) -> TrayMenu {
        let raw = self.live("parent");
        let native = unsafe { self.shared.api.get_tray_entry_parent(raw) } as usize;
        let found = {
            let nodes = self.shared.nodes.borrow();
            nodes.menu_by_addr(native).or_else(|| {
                let menu = nodes.entries.get(&self.serial)?.menu;
                nodes.menus.get(&menu).map(|node| (menu, node.handle))
            })
        };
        match found {
            Some((serial, handle)) => TrayMenu::attach(&self.shared, serial, handle),
            None => used_after_destroy::<TrayMenuKind>("parent"),
        }
    }

    /// Remove the entry and its submenu tree, retiring every callback below
    /// it. Removing an already removed entry does nothing.
    pub fn remove(&self) {
        if !self.is_live() {
            tracing::debug!(entry = ?self.handle, "tray entry already removed");
            return;
        }
        unsafe { self.shared.api.remove_tray_entry(self.handle.raw()) };

        let removed = self.shared.nodes.borrow_mut().detach_entry(self.serial);
        let retired: usize = removed
            .iter()
            .map(|handle| self.shared.callbacks.retire_all(OwnerKey::of(*handle)))
            .sum();
        tracing::debug!(entry = ?self.handle, nodes = removed.len(), retired, "tray entry removed");
    }

    fn describe(&self) -> String {
        if self.is_separator() {
            return "---".to_string();
        }
        let flags = self.flags();
        let label = self.label().unwrap_or_default();
        let mut line = if flags.contains(EntryFlags::CHECKBOX) {
            format!("[{}] {}", if self.checked() { 'x' } else { ' ' }, label)
        } else {
            label
        };
        if flags.contains(EntryFlags::SUBMENU) {
            line.push_str(" >");
        }
        if !self.enabled() {
            line.push_str(" (disabled)");
        }
        if self.has_action() {
            line.push_str(" *");
        }
        line
    }
}

impl fmt::Debug for TrayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrayEntry")
            .field("handle", &self.handle)
            .field("live", &self.is_live())
            .finish()
    }
}

impl PartialEq for TrayEntry {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared) && self.serial == other.serial
    }
}

impl Eq for TrayEntry {}

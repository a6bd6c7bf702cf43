//! Raw SDL3 / SDL3_ttf declarations
//!
//! Opaque object types, flag constants and callback signatures exactly as the
//! C headers declare them. Nothing here owns anything.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int, c_void};

macro_rules! opaque {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            pub struct $name {
                _data: [u8; 0],
                _marker: core::marker::PhantomData<(*mut u8, core::marker::PhantomPinned)>,
            }
        )*
    };
}

opaque! {
    /// `SDL_Tray`
    SDL_Tray;
    /// `SDL_TrayMenu`
    SDL_TrayMenu;
    /// `SDL_TrayEntry`
    SDL_TrayEntry;
    /// `SDL_Surface`
    SDL_Surface;
    /// `SDL_GPUTexture`
    SDL_GPUTexture;
    /// `TTF_Font`
    TTF_Font;
    /// `TTF_Text`
    TTF_Text;
    /// `TTF_TextEngine`
    TTF_TextEngine;
}

/// `SDL_PropertiesID`; 0 is the invalid id
pub type SDL_PropertiesID = u32;

/// `SDL_TrayEntryFlags`
pub type SDL_TrayEntryFlags = u32;

pub const SDL_TRAYENTRY_BUTTON: SDL_TrayEntryFlags = 0x0000_0001;
pub const SDL_TRAYENTRY_CHECKBOX: SDL_TrayEntryFlags = 0x0000_0002;
pub const SDL_TRAYENTRY_SUBMENU: SDL_TrayEntryFlags = 0x0000_0004;
pub const SDL_TRAYENTRY_DISABLED: SDL_TrayEntryFlags = 0x8000_0000;
pub const SDL_TRAYENTRY_CHECKED: SDL_TrayEntryFlags = 0x4000_0000;

/// Position value meaning "append at the end of the menu"
pub const SDL_TRAY_APPEND: c_int = -1;

/// `SDL_PropertyType`
pub type SDL_PropertyType = c_int;

pub const SDL_PROPERTY_TYPE_INVALID: SDL_PropertyType = 0;
pub const SDL_PROPERTY_TYPE_POINTER: SDL_PropertyType = 1;
pub const SDL_PROPERTY_TYPE_STRING: SDL_PropertyType = 2;
pub const SDL_PROPERTY_TYPE_NUMBER: SDL_PropertyType = 3;
pub const SDL_PROPERTY_TYPE_FLOAT: SDL_PropertyType = 4;
pub const SDL_PROPERTY_TYPE_BOOLEAN: SDL_PropertyType = 5;

/// Size of the `SDL_Event` union in bytes
pub const SDL_EVENT_SIZE: usize = 128;

/// `SDL_Event`, kept as raw bytes; only the leading `Uint32 type` is decoded
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct SDL_Event {
    pub bytes: [u8; SDL_EVENT_SIZE],
}

impl SDL_Event {
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; SDL_EVENT_SIZE],
        }
    }

    /// The `type` field shared by every event variant
    pub fn event_type(&self) -> u32 {
        u32::from_ne_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    pub fn set_event_type(&mut self, kind: u32) {
        self.bytes[..4].copy_from_slice(&kind.to_ne_bytes());
    }
}

pub const SDL_EVENT_QUIT: u32 = 0x100;
pub const SDL_EVENT_WINDOW_CLOSE_REQUESTED: u32 = 0x210;
pub const SDL_EVENT_KEY_DOWN: u32 = 0x300;
pub const SDL_EVENT_KEY_UP: u32 = 0x301;
pub const SDL_EVENT_MOUSE_MOTION: u32 = 0x400;
pub const SDL_EVENT_MOUSE_BUTTON_DOWN: u32 = 0x401;
pub const SDL_EVENT_MOUSE_BUTTON_UP: u32 = 0x402;
pub const SDL_EVENT_USER: u32 = 0x8000;
pub const SDL_EVENT_LAST: u32 = 0xFFFF;

/// `SDL_TrayCallback`
pub type SDL_TrayCallback = unsafe extern "C" fn(userdata: *mut c_void, entry: *mut SDL_TrayEntry);

/// `SDL_CleanupPropertyCallback`
pub type SDL_CleanupPropertyCallback = unsafe extern "C" fn(userdata: *mut c_void, value: *mut c_void);

/// `SDL_EnumeratePropertiesCallback`
pub type SDL_EnumeratePropertiesCallback =
    unsafe extern "C" fn(userdata: *mut c_void, props: SDL_PropertiesID, name: *const c_char);

/// `SDL_EventFilter`
pub type SDL_EventFilter = unsafe extern "C" fn(userdata: *mut c_void, event: *mut SDL_Event) -> bool;

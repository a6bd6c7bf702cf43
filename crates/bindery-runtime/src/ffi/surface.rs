//! Native call surface - descriptor tables for the SDL3 C ABI
//!
//! Each native function the runtime calls is described by its symbol name,
//! parameter kinds and result kind, grouped by subsystem. The tables are pure
//! data: `DynamicApi` resolves symbols by these names and the tests check the
//! resolved signatures against them.
//!
//! Kind mapping:
//! - ValueKind::Pointer → `T*` of any opaque object type
//! - ValueKind::CString → `const char*` (null-terminated, borrowed)
//! - ValueKind::I32 / U32 / I64 / U8 / Usize → integers
//! - ValueKind::F32 → `float`
//! - ValueKind::Bool → C99 `bool`
//! - ValueKind::Struct → fixed-layout record passed by pointer
//! - ValueKind::FnPtr → callback function pointer
//! - ValueKind::Void → no value

use serde::Serialize;

/// C-compatible value kinds crossing the native boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    /// Opaque object pointer
    Pointer,
    /// `const char*`
    CString,
    /// `Uint8`
    U8,
    /// `int` / `Sint32`
    I32,
    /// `Uint32`
    U32,
    /// `Sint64`
    I64,
    /// `size_t`
    Usize,
    /// `float`
    F32,
    /// `bool`
    Bool,
    /// Pointer to a fixed-layout record with the given C type name and byte size
    Struct(&'static str, usize),
    /// Callback function pointer with the given callback type name
    FnPtr(&'static str),
    /// No value
    Void,
}

impl ValueKind {
    /// Get a display name for this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            ValueKind::Pointer => "pointer",
            ValueKind::CString => "c_string",
            ValueKind::U8 => "u8",
            ValueKind::I32 => "i32",
            ValueKind::U32 => "u32",
            ValueKind::I64 => "i64",
            ValueKind::Usize => "usize",
            ValueKind::F32 => "f32",
            ValueKind::Bool => "bool",
            ValueKind::Struct(name, _) => *name,
            ValueKind::FnPtr(name) => *name,
            ValueKind::Void => "void",
        }
    }
}

/// One native function: name and shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FnDescriptor {
    pub name: &'static str,
    pub params: &'static [ValueKind],
    pub result: ValueKind,
}

/// One callback type the native library invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallbackDescriptor {
    pub name: &'static str,
    pub params: &'static [ValueKind],
    pub result: ValueKind,
}

/// A named group of descriptors
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Subsystem {
    pub name: &'static str,
    pub library: Library,
    pub functions: &'static [FnDescriptor],
}

/// Which shared library provides a subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Library {
    Sdl,
    Ttf,
}

use ValueKind::*;

const fn f(name: &'static str, params: &'static [ValueKind], result: ValueKind) -> FnDescriptor {
    FnDescriptor {
        name,
        params,
        result,
    }
}

const SUBSTRING: ValueKind = Struct("TTF_SubString", 36);

pub const CORE: &[FnDescriptor] = &[
    f("SDL_GetError", &[], CString),
    f("SDL_free", &[Pointer], Void),
    f("SDL_LoadBMP", &[CString], Pointer),
    f("SDL_DestroySurface", &[Pointer], Void),
];

pub const TRAY: &[FnDescriptor] = &[
    f("SDL_CreateTray", &[Pointer, CString], Pointer),
    f("SDL_SetTrayIcon", &[Pointer, Pointer], Void),
    f("SDL_SetTrayTooltip", &[Pointer, CString], Void),
    f("SDL_CreateTrayMenu", &[Pointer], Pointer),
    f("SDL_CreateTraySubmenu", &[Pointer], Pointer),
    f("SDL_GetTrayMenu", &[Pointer], Pointer),
    f("SDL_GetTraySubmenu", &[Pointer], Pointer),
    f("SDL_GetTrayEntries", &[Pointer, Pointer], Pointer),
    f("SDL_RemoveTrayEntry", &[Pointer], Void),
    f("SDL_InsertTrayEntryAt", &[Pointer, I32, CString, U32], Pointer),
    f("SDL_SetTrayEntryLabel", &[Pointer, CString], Void),
    f("SDL_GetTrayEntryLabel", &[Pointer], CString),
    f("SDL_SetTrayEntryChecked", &[Pointer, Bool], Void),
    f("SDL_GetTrayEntryChecked", &[Pointer], Bool),
    f("SDL_SetTrayEntryEnabled", &[Pointer, Bool], Void),
    f("SDL_GetTrayEntryEnabled", &[Pointer], Bool),
    f(
        "SDL_SetTrayEntryCallback",
        &[Pointer, FnPtr("SDL_TrayCallback"), Pointer],
        Void,
    ),
    f("SDL_ClickTrayEntry", &[Pointer], Void),
    f("SDL_DestroyTray", &[Pointer], Void),
    f("SDL_GetTrayEntryParent", &[Pointer], Pointer),
    f("SDL_GetTrayMenuParentEntry", &[Pointer], Pointer),
    f("SDL_GetTrayMenuParentTray", &[Pointer], Pointer),
    f("SDL_UpdateTrays", &[], Void),
];

pub const PROPERTIES: &[FnDescriptor] = &[
    f("SDL_CreateProperties", &[], U32),
    f("SDL_DestroyProperties", &[U32], Void),
    f(
        "SDL_SetPointerPropertyWithCleanup",
        &[U32, CString, Pointer, FnPtr("SDL_CleanupPropertyCallback"), Pointer],
        Bool,
    ),
    f("SDL_GetPointerProperty", &[U32, CString, Pointer], Pointer),
    f("SDL_SetStringProperty", &[U32, CString, CString], Bool),
    f("SDL_GetStringProperty", &[U32, CString, CString], CString),
    f("SDL_SetNumberProperty", &[U32, CString, I64], Bool),
    f("SDL_GetNumberProperty", &[U32, CString, I64], I64),
    f("SDL_SetFloatProperty", &[U32, CString, F32], Bool),
    f("SDL_GetFloatProperty", &[U32, CString, F32], F32),
    f("SDL_SetBooleanProperty", &[U32, CString, Bool], Bool),
    f("SDL_GetBooleanProperty", &[U32, CString, Bool], Bool),
    f("SDL_HasProperty", &[U32, CString], Bool),
    f("SDL_GetPropertyType", &[U32, CString], I32),
    f("SDL_ClearProperty", &[U32, CString], Bool),
    f(
        "SDL_EnumerateProperties",
        &[U32, FnPtr("SDL_EnumeratePropertiesCallback"), Pointer],
        Bool,
    ),
];

pub const EVENTS: &[FnDescriptor] = &[
    f("SDL_PollEvent", &[Struct("SDL_Event", 128)], Bool),
    f("SDL_PushEvent", &[Struct("SDL_Event", 128)], Bool),
    f("SDL_RegisterEvents", &[I32], U32),
    f(
        "SDL_AddEventWatch",
        &[FnPtr("SDL_EventFilter"), Pointer],
        Bool,
    ),
    f(
        "SDL_RemoveEventWatch",
        &[FnPtr("SDL_EventFilter"), Pointer],
        Void,
    ),
];

pub const TTF: &[FnDescriptor] = &[
    f("TTF_Init", &[], Bool),
    f("TTF_Quit", &[], Void),
    f("TTF_OpenFont", &[CString, F32], Pointer),
    f("TTF_CloseFont", &[Pointer], Void),
    f("TTF_GetFontSize", &[Pointer], F32),
    f("TTF_SetFontSize", &[Pointer, F32], Bool),
    f("TTF_GetFontHeight", &[Pointer], I32),
    f("TTF_GetFontFamilyName", &[Pointer], CString),
    f("TTF_CreateSurfaceTextEngine", &[], Pointer),
    f("TTF_DestroySurfaceTextEngine", &[Pointer], Void),
    f("TTF_CreateText", &[Pointer, Pointer, CString, Usize], Pointer),
    f("TTF_DestroyText", &[Pointer], Void),
    f("TTF_SetTextColor", &[Pointer, U8, U8, U8, U8], Bool),
    f("TTF_GetTextColor", &[Pointer, Pointer, Pointer, Pointer, Pointer], Bool),
    f("TTF_SetTextString", &[Pointer, CString, Usize], Bool),
    f("TTF_GetTextSubString", &[Pointer, I32, SUBSTRING], Bool),
    f(
        "TTF_GetTextSubStringsForRange",
        &[Pointer, I32, I32, Pointer],
        Pointer,
    ),
    f("TTF_GetGPUTextDrawData", &[Pointer], Pointer),
];

/// Every subsystem table
pub const SUBSYSTEMS: &[Subsystem] = &[
    Subsystem {
        name: "core",
        library: Library::Sdl,
        functions: CORE,
    },
    Subsystem {
        name: "tray",
        library: Library::Sdl,
        functions: TRAY,
    },
    Subsystem {
        name: "properties",
        library: Library::Sdl,
        functions: PROPERTIES,
    },
    Subsystem {
        name: "events",
        library: Library::Sdl,
        functions: EVENTS,
    },
    Subsystem {
        name: "ttf",
        library: Library::Ttf,
        functions: TTF,
    },
];

/// Callback shapes the native library invokes
pub const CALLBACKS: &[CallbackDescriptor] = &[
    CallbackDescriptor {
        name: "SDL_TrayCallback",
        params: &[Pointer, Pointer],
        result: Void,
    },
    CallbackDescriptor {
        name: "SDL_CleanupPropertyCallback",
        params: &[Pointer, Pointer],
        result: Void,
    },
    CallbackDescriptor {
        name: "SDL_EnumeratePropertiesCallback",
        params: &[Pointer, U32, CString],
        result: Void,
    },
    CallbackDescriptor {
        name: "SDL_EventFilter",
        params: &[Pointer, Struct("SDL_Event", 128)],
        result: Bool,
    },
];

/// Find a function descriptor by symbol name
pub fn lookup(name: &str) -> Option<(&'static Subsystem, &'static FnDescriptor)> {
    SUBSYSTEMS.iter().find_map(|subsystem| {
        subsystem
            .functions
            .iter()
            .find(|d| d.name == name)
            .map(|d| (subsystem, d))
    })
}

/// Find a callback descriptor by type name
pub fn lookup_callback(name: &str) -> Option<&'static CallbackDescriptor> {
    CALLBACKS.iter().find(|d| d.name == name)
}

/// Export the descriptor tables as JSON for external tooling
pub fn to_json() -> String {
    #[derive(Serialize)]
    struct Manifest {
        subsystems: &'static [Subsystem],
        callbacks: &'static [CallbackDescriptor],
    }

    serde_json::to_string_pretty(&Manifest {
        subsystems: SUBSYSTEMS,
        callbacks: CALLBACKS,
    })
    .unwrap_or_default()
}

//! Property groups (`SDL_PropertiesID`)
//!
//! Typed setters and getters plus pointer properties whose host value is
//! released by a cleanup trampoline. The native library decides when a
//! cleanup runs (replace, clear, group destroyed, or a failed set); each
//! cleanup drops its boxed value and retires its own registration.

use crate::context::Context;
use crate::error::BinderyResult;
use crate::ffi::callbacks::{CallbackRegistry, OwnerKey, PropertyCleanup, TrampolineId};
use crate::ffi::handle::{Handle, HandleCell, HandleKind, PropertiesKind};
use crate::ffi::sys::{self, SDL_PropertiesID};
use crate::native::{c_string, check, native_error, NativeApi};
use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::{c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// `SDL_PropertyType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Invalid,
    Pointer,
    String,
    Number,
    Float,
    Boolean,
}

impl From<sys::SDL_PropertyType> for PropertyType {
    fn from(raw: sys::SDL_PropertyType) -> Self {
        match raw {
            sys::SDL_PROPERTY_TYPE_POINTER => PropertyType::Pointer,
            sys::SDL_PROPERTY_TYPE_STRING => PropertyType::String,
            sys::SDL_PROPERTY_TYPE_NUMBER => PropertyType::Number,
            sys::SDL_PROPERTY_TYPE_FLOAT => PropertyType::Float,
            sys::SDL_PROPERTY_TYPE_BOOLEAN => PropertyType::Boolean,
            _ => PropertyType::Invalid,
        }
    }
}

type Visitor<'a> = &'a mut dyn FnMut(&str);

unsafe extern "C" fn enumerate_trampoline(userdata: *mut c_void, _props: SDL_PropertiesID, name: *const c_char) {
    if userdata.is_null() || name.is_null() {
        return;
    }
    let visit = &mut *(userdata as *mut Visitor<'_>);
    let name = CStr::from_ptr(name).to_string_lossy();
    if panic::catch_unwind(AssertUnwindSafe(|| visit(&name))).is_err() {
        tracing::error!(%name, "property visitor panicked; unwinding stopped at the native boundary");
    }
}

/// Owning handle of a property group
pub struct Properties {
    api: Rc<dyn NativeApi>,
    cell: HandleCell<PropertiesKind>,
    id: SDL_PropertiesID,
    cleanups: Rc<CallbackRegistry>,
}

impl Properties {
    pub fn create(ctx: &Context) -> BinderyResult<Self> {
        let api = ctx.api().clone();
        let id = unsafe { api.create_properties() };
        let handle = Handle::from_raw(id).ok_or_else(|| native_error(&*api, "SDL_CreateProperties"))?;
        tracing::debug!(?handle, "property group created");
        Ok(Self {
            api,
            cell: HandleCell::new(handle),
            id,
            cleanups: Rc::new(CallbackRegistry::new()),
        })
    }

    pub fn handle(&self) -> Option<Handle<PropertiesKind>> {
        self.cell.get()
    }

    pub fn is_live(&self) -> bool {
        self.cell.is_live()
    }

    fn owner(&self) -> OwnerKey {
        OwnerKey::new(PropertiesKind::NAME, self.id as usize)
    }

    fn store(
        &self,
        operation: &'static str,
        name: &str,
        write: impl FnOnce(SDL_PropertiesID, &CStr) -> bool,
    ) -> BinderyResult<()> {
        let props = self.cell.live(operation);
        let name = c_string(operation, name)?;
        check(&*self.api, operation, write(props, &name))
    }

    // A name with an interior NUL can never have been stored
    fn lookup<R>(&self, operation: &str, name: &str, missing: R, read: impl FnOnce(SDL_PropertiesID, &CStr) -> R) -> R {
        let props = self.cell.live(operation);
        match CString::new(name) {
            Ok(name) => read(props, &name),
            Err(_) => missing,
        }
    }

    pub fn set_string(&self, name: &str, value: &str) -> BinderyResult<()> {
        let value = c_string("SDL_SetStringProperty", value)?;
        let api = &self.api;
        self.store("SDL_SetStringProperty", name, |props, name| unsafe {
            api.set_string_property(props, name, Some(&value))
        })
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        let api = &self.api;
        self.lookup("get_string", name, None, |props, name| unsafe { api.get_string_property(props, name) })
    }

    pub fn set_number(&self, name: &str, value: i64) -> BinderyResult<()> {
        let api = &self.api;
        self.store("SDL_SetNumberProperty", name, |props, name| unsafe {
            api.set_number_property(props, name, value)
        })
    }

    pub fn get_number(&self, name: &str, default: i64) -> i64 {
        let api = &self.api;
        self.lookup("get_number", name, default, |props, name| unsafe {
            api.get_number_property(props, name, default)
        })
    }

    pub fn set_float(&self, name: &str, value: f32) -> BinderyResult<()> {
        let api = &self.api;
        self.store("SDL_SetFloatProperty", name, |props, name| unsafe {
            api.set_float_property(props, name, value)
        })
    }

    pub fn get_float(&self, name: &str, default: f32) -> f32 {
        let api = &self.api;
        self.lookup("get_float", name, default, |props, name| unsafe {
            api.get_float_property(props, name, default)
        })
    }

    pub fn set_boolean(&self, name: &str, value: bool) -> BinderyResult<()> {
        let api = &self.api;
        self.store("SDL_SetBooleanProperty", name, |props, name| unsafe {
            api.set_boolean_property(props, name, value)
        })
    }

    pub fn get_boolean(&self, name: &str, default: bool) -> bool {
        let api = &self.api;
        self.lookup("get_boolean", name, default, |props, name| unsafe {
            api.get_boolean_property(props, name, default)
        })
    }

    pub fn has(&self, name: &str) -> bool {
        let api = &self.api;
        self.lookup("has", name, false, |props, name| unsafe { api.has_property(props, name) })
    }

    pub fn property_type(&self, name: &str) -> PropertyType {
        let api = &self.api;
        self.lookup("property_type", name, PropertyType::Invalid, |props, name| {
            unsafe { api.get_property_type(props, name) }.into()
        })
    }

    /// Remove a property, running its cleanup if it has one
    pub fn clear(&self, name: &str) -> BinderyResult<()> {
        let api = &self.api;
        self.store("SDL_ClearProperty", name, |props, name| unsafe { api.clear_property(props, name) })
    }

    /// Visit every property name. `visit` only lives for this call.
    pub fn enumerate(&self, mut visit: impl FnMut(&str)) -> BinderyResult<()> {
        let props = self.cell.live("enumerate");
        let mut visitor: Visitor<'_> = &mut visit;
        let userdata = &mut visitor as *mut Visitor<'_> as *mut c_void;
        let ok = unsafe { self.api.enumerate_properties(props, enumerate_trampoline, userdata) };
        check(&*self.api, "SDL_EnumerateProperties", ok)
    }

    pub fn names(&self) -> BinderyResult<Vec<String>> {
        let mut names = Vec::new();
        self.enumerate(|name| names.push(name.to_string()))?;
        Ok(names)
    }

    /// Hand `value` to the group; it is dropped when the native library runs
    /// the cleanup (property replaced or cleared, group destroyed).
    ///
    /// If the native set fails the value has already been dropped when the
    /// error is returned.
    pub fn set_pointer_with_cleanup<T: 'static>(&self, name: &str, value: Box<T>) -> BinderyResult<()> {
        let props = self.cell.live("set_pointer_with_cleanup");
        let name_c = c_string("SDL_SetPointerPropertyWithCleanup", name)?;
        let value = Box::into_raw(value) as *mut c_void;

        let owner = self.owner();
        let slot = name.to_string();
        let registry = Rc::downgrade(&self.cleanups);
        let own_id: Rc<Cell<Option<TrampolineId>>> = Rc::default();
        let cleanup = {
            let own_id = own_id.clone();
            let slot = slot.clone();
            let mut released = false;
            move |ptr: *mut c_void| {
                if !released && !ptr.is_null() {
                    released = true;
                    drop(unsafe { Box::from_raw(ptr as *mut T) });
                }
                if let (Some(registry), Some(id)) = (registry.upgrade(), own_id.get()) {
                    registry.retire_exact(owner, &slot, id);
                }
            }
        };

        let api = &self.api;
        let id = self
            .cleanups
            .register::<PropertyCleanup>(owner, slot, Box::new(cleanup), |callback, userdata| {
                let ok = unsafe { api.set_pointer_property_with_cleanup(props, &name_c, value, Some(callback), userdata) };
                check(&**api, "SDL_SetPointerPropertyWithCleanup", ok)
            })?;
        own_id.set(Some(id));
        Ok(())
    }

    /// Borrowed pointer value; null when absent or not a pointer
    pub fn get_pointer(&self, name: &str) -> *mut c_void {
        let api = &self.api;
        self.lookup("get_pointer", name, std::ptr::null_mut(), |props, name| unsafe {
            api.get_pointer_property(props, name, std::ptr::null_mut())
        })
    }

    /// Pointer values whose cleanup has not run yet
    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.count_for(self.owner())
    }

    /// Destroy the group; the native library runs every pending cleanup
    pub fn destroy(&self) -> bool {
        let api = &self.api;
        let destroyed = self.cell.destroy_with(|raw| unsafe { api.destroy_properties(raw) });
        if destroyed {
            let leftover = self.cleanups.retire_all(self.owner());
            if leftover > 0 {
                tracing::warn!(leftover, "cleanups still registered after the group was destroyed");
            }
        }
        destroyed
    }
}

impl Drop for Properties {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Properties")
            .field("handle", &self.cell)
            .field("pending_cleanups", &self.cleanups.len())
            .finish()
    }
}

//! Owned `SDL_Surface`, only as far as tray icons need it

use crate::error::BinderyResult;
use crate::ffi::handle::{Handle, HandleCell, SurfaceKind};
use crate::ffi::sys::SDL_Surface;
use crate::native::{c_string, native_error, NativeApi};
use std::path::Path;
use std::rc::Rc;

pub struct Surface {
    api: Rc<dyn NativeApi>,
    cell: HandleCell<SurfaceKind>,
}

impl Surface {
    /// Decode a BMP file through the native loader
    pub fn load_bmp(api: &Rc<dyn NativeApi>, path: &Path) -> BinderyResult<Self> {
        let file = c_string("SDL_LoadBMP", &path.to_string_lossy())?;
        let raw = unsafe { api.load_bmp(&file) };
        let handle = Handle::from_raw(raw).ok_or_else(|| native_error(&**api, "SDL_LoadBMP"))?;
        tracing::debug!(path = %path.display(), ?handle, "surface loaded");
        Ok(Self {
            api: api.clone(),
            cell: HandleCell::new(handle),
        })
    }

    /// `None` once destroyed
    pub fn handle(&self) -> Option<Handle<SurfaceKind>> {
        self.cell.get()
    }

    #[track_caller]
    pub(crate) fn raw(&self, operation: &str) -> *mut SDL_Surface {
        self.cell.live(operation)
    }

    pub fn destroy(&self) -> bool {
        let api = &self.api;
        self.cell.destroy_with(|raw| unsafe { api.destroy_surface(raw) })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::HeadlessApi;

    #[test]
    fn test_load_and_destroy() {
        let headless = Rc::new(HeadlessApi::new());
        let api: Rc<dyn NativeApi> = headless.clone();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("icon.bmp");
        std::fs::write(&path, b"BM\0\0\0\0").unwrap();

        let surface = Surface::load_bmp(&api, &path).unwrap();
        assert_eq!(headless.live_objects().surfaces, 1);
        assert!(surface.destroy());
        assert!(!surface.destroy());
        assert_eq!(headless.live_objects().surfaces, 0);
    }

    #[test]
    fn test_missing_file_is_native_error() {
        let api: Rc<dyn NativeApi> = Rc::new(HeadlessApi::new());
        let err = Surface::load_bmp(&api, Path::new("/nonexistent/icon.bmp")).err().unwrap();
        assert_eq!(err.operation(), Some("SDL_LoadBMP"));
    }
}

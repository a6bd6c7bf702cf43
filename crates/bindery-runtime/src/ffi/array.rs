//! Null-terminated native pointer arrays
//!
//! Several native calls return `T **` blocks ending in a null pointer. They
//! are exposed as [`NullTerminated`]: a lazy, finite, non-restartable
//! iterator that reads one element per step and releases the native block
//! exactly once, after the terminator is reached or when the iterator is
//! dropped, whichever happens first.

use std::iter::FusedIterator;
use std::os::raw::c_void;

type Release<'a> = Box<dyn FnOnce(*mut c_void) + 'a>;

pub struct NullTerminated<'a, E, T> {
    base: *const *mut E,
    index: usize,
    finished: bool,
    read: unsafe fn(*mut E) -> T,
    release: Option<Release<'a>>,
}

impl<'a, E, T> NullTerminated<'a, E, T> {
    /// Walk `base`, releasing it through `release` once done.
    ///
    /// # Safety
    ///
    /// `base` must be null or point at a readable array of `*mut E` that ends
    /// in a null entry and stays valid until `release` runs. Each non-null
    /// element must be valid for `read`.
    pub unsafe fn owned(
        base: *const *mut E,
        read: unsafe fn(*mut E) -> T,
        release: impl FnOnce(*mut c_void) + 'a,
    ) -> Self {
        Self {
            base,
            index: 0,
            finished: base.is_null(),
            read,
            release: (!base.is_null()).then(|| Box::new(release) as Release<'a>),
        }
    }

    /// Walk `base` without releasing it (the native side keeps ownership).
    ///
    /// # Safety
    ///
    /// As for [`owned`](Self::owned), minus the release.
    pub unsafe fn borrowed(base: *const *mut E, read: unsafe fn(*mut E) -> T) -> Self {
        Self {
            base,
            index: 0,
            finished: base.is_null(),
            read,
            release: None,
        }
    }

    /// Elements yielded so far
    pub fn position(&self) -> usize {
        self.index
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(release) = self.release.take() {
            tracing::trace!(addr = self.base as usize, "releasing native array");
            release(self.base as *mut c_void);
        }
    }
}

impl<E, T> Iterator for NullTerminated<'_, E, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.finished {
            return None;
        }

        // SAFETY: the constructor contract guarantees every slot up to and
        // including the terminator is readable.
        let element = unsafe { *self.base.add(self.index) };
        if element.is_null() {
            self.finish();
            return None;
        }

        self.index += 1;
        Some(unsafe { (self.read)(element) })
    }
}

impl<E, T> FusedIterator for NullTerminated<'_, E, T> {}

impl<E, T> Drop for NullTerminated<'_, E, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish();
        }
    }
}

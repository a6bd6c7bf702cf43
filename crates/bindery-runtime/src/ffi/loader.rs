//! Dynamic library loading for the SDL3 family
//!
//! Resolves `SDL3` / `SDL3_ttf` (or explicit paths) across platform search
//! paths and naming conventions using `libloading`, caches what it loads and
//! hands out symbols.

use libloading::{Library, Symbol};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Library loading errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// Library file not found in search paths
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    /// Symbol not found in library
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    /// The dynamic linker rejected the file
    #[error("Failed to load library: {0}")]
    LoadFailed(String),
}

/// Dynamic library loader with caching and platform-specific path resolution
///
/// # Safety
///
/// Loading a dynamic library runs its initializers in this process. Symbols
/// handed out are only valid while the loader that produced them is alive.
pub struct LibraryLoader {
    /// Loaded libraries keyed by the name they were requested under
    loaded: HashMap<String, (PathBuf, Library)>,
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    pub fn new() -> Self {
        Self {
            loaded: HashMap::new(),
            search_paths: Self::default_search_paths(),
        }
    }

    /// Loader whose search list starts with `extra`, then the platform defaults
    pub fn with_search_paths(extra: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut loader = Self::new();
        let mut paths: Vec<PathBuf> = extra.into_iter().collect();
        paths.append(&mut loader.search_paths);
        loader.search_paths = paths;
        loader
    }

    /// Platform library directories, current directory first
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));
            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/usr/lib/x86_64-linux-gnu"));
                paths.push(PathBuf::from("/usr/lib/aarch64-linux-gnu"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
            paths.push(PathBuf::from("/Library/Frameworks"));
        }

        #[cfg(target_os = "windows")]
        {
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// File names a library called `name` may have on this platform
    ///
    /// SDL3 ships with a major-version suffix on Unix (`libSDL3.so.0`,
    /// `libSDL3.0.dylib`), so those are tried alongside the plain names.
    pub fn candidate_file_names(name: &str) -> Vec<String> {
        if cfg!(target_os = "windows") {
            vec![format!("{}.dll", name), format!("lib{}.dll", name)]
        } else if cfg!(target_os = "macos") {
            vec![
                format!("lib{}.dylib", name),
                format!("lib{}.0.dylib", name),
                format!("lib{}.so", name),
            ]
        } else {
            vec![
                format!("lib{}.so", name),
                format!("lib{}.so.0", name),
                format!("{}.so", name),
            ]
        }
    }

    fn resolve_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.components().count() > 1 || path.is_absolute() {
            return path.exists().then(|| path.to_path_buf());
        }

        let candidates = Self::candidate_file_names(name);
        self.search_paths
            .iter()
            .flat_map(|dir| candidates.iter().map(move |file| dir.join(file)))
            .find(|full| full.exists())
    }

    /// Load a library by short name (`"SDL3"`) or path, returning the cached
    /// instance on repeat calls.
    ///
    /// When no file matches in the search paths, the platform's own loader is
    /// asked for each candidate name before giving up.
    pub fn load(&mut self, name: &str) -> Result<&Library, LoadError> {
        if !self.loaded.contains_key(name) {
            let (path, library) = self.open(name)?;
            tracing::debug!(library = name, path = %path.display(), "loaded native library");
            self.loaded.insert(name.to_string(), (path, library));
        }
        self.loaded
            .get(name)
            .map(|(_, library)| library)
            .ok_or_else(|| LoadError::LibraryNotFound(name.to_string()))
    }

    fn open(&self, name: &str) -> Result<(PathBuf, Library), LoadError> {
        if let Some(path) = self.resolve_library_path(name) {
            let library = unsafe { Library::new(&path) }.map_err(|e| LoadError::LoadFailed(e.to_string()))?;
            return Ok((path, library));
        }

        if Path::new(name).components().count() > 1 {
            return Err(LoadError::LibraryNotFound(name.to_string()));
        }

        for file in Self::candidate_file_names(name) {
            if let Ok(library) = unsafe { Library::new(&file) } {
                return Ok((PathBuf::from(file), library));
            }
        }

        Err(LoadError::LibraryNotFound(name.to_string()))
    }

    /// Look up a symbol in a library previously passed to [`load`](Self::load)
    ///
    /// # Safety
    ///
    /// `T` must match the symbol's real type.
    pub unsafe fn lookup_symbol<T>(&self, library_name: &str, symbol_name: &str) -> Result<Symbol<'_, T>, LoadError> {
        let (_, library) = self.loaded.get(library_name).ok_or_else(|| {
            LoadError::LibraryNotFound(format!("{} (not loaded - call load() first)", library_name))
        })?;

        library
            .get(symbol_name.as_bytes())
            .map_err(|_| LoadError::SymbolNotFound {
                library: library_name.to_string(),
                symbol: symbol_name.to_string(),
            })
    }

    /// Path a loaded library was resolved to
    pub fn resolved_path(&self, library_name: &str) -> Option<&Path> {
        self.loaded.get(library_name).map(|(path, _)| path.as_path())
    }

    /// Prepend a search path
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_paths_start_with_cwd() {
        let paths = LibraryLoader::default_search_paths();
        if let Ok(cwd) = std::env::current_dir() {
            assert_eq!(paths[0], cwd);
        }
    }

    #[test]
    fn test_candidate_names_include_versioned_soname() {
        let names = LibraryLoader::candidate_file_names("SDL3");

        #[cfg(target_os = "linux")]
        assert_eq!(names, vec!["libSDL3.so", "libSDL3.so.0", "SDL3.so"]);

        #[cfg(target_os = "macos")]
        assert!(names.contains(&"libSDL3.0.dylib".to_string()));

        #[cfg(target_os = "windows")]
        assert_eq!(names[0], "SDL3.dll");
    }

    #[test]
    fn test_library_not_found() {
        let mut loader = LibraryLoader::new();
        let result = loader.load("bindery_nonexistent_library_xyz");
        assert!(matches!(result, Err(LoadError::LibraryNotFound(_))));
    }

    #[test]
    fn test_missing_explicit_path() {
        let mut loader = LibraryLoader::new();
        let result = loader.load("/nonexistent/dir/libSDL3.so");
        assert!(matches!(result, Err(LoadError::LibraryNotFound(_))));
    }

    #[test]
    fn test_lookup_before_load() {
        let loader = LibraryLoader::new();
        let result = unsafe { loader.lookup_symbol::<unsafe extern "C" fn()>("SDL3", "SDL_GetError") };
        assert!(matches!(result, Err(LoadError::LibraryNotFound(_))));
    }

    #[test]
    fn test_extra_search_paths_come_first() {
        let loader = LibraryLoader::with_search_paths(vec![PathBuf::from("/opt/sdl/lib")]);
        assert_eq!(loader.search_paths()[0], PathBuf::from("/opt/sdl/lib"));
        assert_eq!(loader.loaded_count(), 0);
    }

    #[test]
    fn test_garbage_file_fails_to_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("libbroken.so");
        std::fs::write(&path, b"not a shared object").unwrap();

        let mut loader = LibraryLoader::new();
        let result = loader.load(path.to_str().unwrap());
        assert!(matches!(result, Err(LoadError::LoadFailed(_))));
    }
}

//! Fonts and text objects (SDL3_ttf)
//!
//! A [`Text`] borrows the [`TextEngine`] and [`Font`] it was created from, so
//! neither can be dropped while the text is alive. Fonts and engines each hold
//! a share of the [`TtfLibrary`] guard, so SDL_ttf stays initialized until the
//! last of them is closed, even when the [`Context`] is dropped first.

use crate::context::Context;
use crate::error::BinderyResult;
use crate::ffi::array::NullTerminated;
use crate::ffi::codec::BinaryRecord;
use crate::ffi::handle::{FontKind, Handle, HandleCell, TextEngineKind, TextKind};
use crate::ffi::records::{Color, GpuAtlasDrawSequence, RawGpuAtlasDrawSequence, RawSubString, SubString};
use crate::ffi::sys::TTF_Text;
use crate::native::{c_string, check, native_error, NativeApi};
use std::fmt;
use std::os::raw::c_char;
use std::path::Path;
use std::rc::Rc;

/// Substrings read lazily out of a native block that is freed once
pub type SubStrings = NullTerminated<'static, RawSubString, SubString>;

unsafe fn read_substring(raw: *mut RawSubString) -> SubString {
    SubString::read_from(raw)
}

/// One `TTF_Init`, balanced by `TTF_Quit` when the last share drops
pub(crate) struct TtfLibrary {
    api: Rc<dyn NativeApi>,
}

impl TtfLibrary {
    pub(crate) fn init(api: Rc<dyn NativeApi>) -> BinderyResult<Rc<Self>> {
        check(&*api, "TTF_Init", unsafe { api.ttf_init() })?;
        tracing::debug!("SDL_ttf initialized");
        Ok(Rc::new(Self { api }))
    }
}

impl Drop for TtfLibrary {
    fn drop(&mut self) {
        unsafe { self.api.ttf_quit() };
        tracing::debug!("SDL_ttf shut down");
    }
}

/// An opened font file
pub struct Font {
    api: Rc<dyn NativeApi>,
    cell: HandleCell<FontKind>,
    // Declared last: the font is closed before the library can quit
    _ttf: Rc<TtfLibrary>,
}

impl Font {
    /// Open `path` at `ptsize` points, initializing SDL_ttf on first use
    pub fn open(ctx: &Context, path: impl AsRef<Path>, ptsize: f32) -> BinderyResult<Self> {
        let ttf = ctx.ensure_ttf()?;
        let path = path.as_ref();
        let api = ctx.api().clone();
        let file = c_string("TTF_OpenFont", &path.to_string_lossy())?;
        let handle = Handle::from_raw(unsafe { api.open_font(&file, ptsize) })
            .ok_or_else(|| native_error(&*api, "TTF_OpenFont"))?;
        tracing::debug!(?handle, path = %path.display(), ptsize, "font opened");
        Ok(Self {
            api,
            cell: HandleCell::new(handle),
            _ttf: ttf,
        })
    }

    pub fn handle(&self) -> Option<Handle<FontKind>> {
        self.cell.get()
    }

    pub fn size(&self) -> f32 {
        let raw = self.cell.live("size");
        unsafe { self.api.get_font_size(raw) }
    }

    pub fn set_size(&self, ptsize: f32) -> BinderyResult<()> {
        let raw = self.cell.live("set_size");
        check(&*self.api, "TTF_SetFontSize", unsafe { self.api.set_font_size(raw, ptsize) })
    }

    /// Line height in pixels
    pub fn height(&self) -> i32 {
        let raw = self.cell.live("height");
        unsafe { self.api.get_font_height(raw) }
    }

    pub fn family_name(&self) -> Option<String> {
        let raw = self.cell.live("family_name");
        unsafe { self.api.get_font_family_name(raw) }
    }

    pub fn close(&self) -> bool {
        let api = &self.api;
        self.cell.destroy_with(|raw| unsafe { api.close_font(raw) })
    }
}

impl Drop for Font {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Font").field(&self.cell).finish()
    }
}

/// Text engine that renders into surfaces
pub struct TextEngine {
    api: Rc<dyn NativeApi>,
    cell: HandleCell<TextEngineKind>,
    _ttf: Rc<TtfLibrary>,
}

impl TextEngine {
    pub fn create_surface(ctx: &Context) -> BinderyResult<Self> {
        let ttf = ctx.ensure_ttf()?;
        let api = ctx.api().clone();
        let handle = Handle::from_raw(unsafe { api.create_surface_text_engine() })
            .ok_or_else(|| native_error(&*api, "TTF_CreateSurfaceTextEngine"))?;
        tracing::debug!(?handle, "text engine created");
        Ok(Self {
            api,
            cell: HandleCell::new(handle),
            _ttf: ttf,
        })
    }

    pub fn handle(&self) -> Option<Handle<TextEngineKind>> {
        self.cell.get()
    }

    pub fn destroy(&self) -> bool {
        let api = &self.api;
        self.cell
            .destroy_with(|raw| unsafe { api.destroy_surface_text_engine(raw) })
    }
}

impl Drop for TextEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for TextEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextEngine").field(&self.cell).finish()
    }
}

// SDL_ttf reads a zero length as "NUL-terminated"
fn text_arg(text: &str) -> (*const c_char, usize) {
    if text.is_empty() {
        (b"\0".as_ptr() as *const c_char, 0)
    } else {
        (text.as_ptr() as *const c_char, text.len())
    }
}

/// Laid-out text bound to an engine and a font
pub struct Text<'a> {
    api: Rc<dyn NativeApi>,
    cell: HandleCell<TextKind>,
    _engine: &'a TextEngine,
    _font: &'a Font,
}

impl<'a> Text<'a> {
    pub fn create(engine: &'a TextEngine, font: &'a Font, text: &str) -> BinderyResult<Self> {
        let engine_raw = engine.cell.live("Text::create");
        let font_raw = font.cell.live("Text::create");
        let api = engine.api.clone();
        let (ptr, len) = text_arg(text);
        let handle = Handle::from_raw(unsafe { api.create_text(engine_raw, font_raw, ptr, len) })
            .ok_or_else(|| native_error(&*api, "TTF_CreateText"))?;
        tracing::debug!(?handle, bytes = text.len(), "text created");
        Ok(Self {
            api,
            cell: HandleCell::new(handle),
            _engine: engine,
            _font: font,
        })
    }

    pub fn handle(&self) -> Option<Handle<TextKind>> {
        self.cell.get()
    }

    #[track_caller]
    fn raw(&self, operation: &str) -> *mut TTF_Text {
        self.cell.live(operation)
    }

    pub fn set_color(&self, color: Color) -> BinderyResult<()> {
        let raw = self.raw("set_color");
        let ok = unsafe { self.api.set_text_color(raw, color.r, color.g, color.b, color.a) };
        check(&*self.api, "TTF_SetTextColor", ok)
    }

    pub fn color(&self) -> BinderyResult<Color> {
        let raw = self.raw("color");
        let (mut r, mut g, mut b, mut a) = (0u8, 0u8, 0u8, 0u8);
        let ok = unsafe { self.api.get_text_color(raw, &mut r, &mut g, &mut b, &mut a) };
        check(&*self.api, "TTF_GetTextColor", ok)?;
        Ok(Color::rgba(r, g, b, a))
    }

    pub fn set_string(&self, text: &str) -> BinderyResult<()> {
        let raw = self.raw("set_string");
        let (ptr, len) = text_arg(text);
        check(&*self.api, "TTF_SetTextString", unsafe { self.api.set_text_string(raw, ptr, len) })
    }

    /// The substring containing byte `offset`; past the end yields the
    /// zero-length end marker
    pub fn substring(&self, offset: i32) -> BinderyResult<SubString> {
        let raw = self.raw("substring");
        let mut out: RawSubString = bytemuck::Zeroable::zeroed();
        let ok = unsafe { self.api.get_text_substring(raw, offset, &mut out) };
        check(&*self.api, "TTF_GetTextSubString", ok)?;
        Ok(SubString::from_raw(&out))
    }

    /// Substrings covering `length` bytes from `offset` (`-1` for the rest)
    pub fn substrings_for_range(&self, offset: i32, length: i32) -> BinderyResult<SubStrings> {
        let raw = self.raw("substrings_for_range");
        let mut count = 0;
        let base = unsafe { self.api.get_text_substrings_for_range(raw, offset, length, &mut count) };
        if base.is_null() {
            return Err(native_error(&*self.api, "TTF_GetTextSubStringsForRange"));
        }
        tracing::trace!(count, "substring block received");
        let api = self.api.clone();
        Ok(unsafe {
            NullTerminated::owned(base as *const *mut RawSubString, read_substring, move |block| {
                api.free(block)
            })
        })
    }

    /// Draw sequences for the GPU engine, following the native `next` chain.
    ///
    /// Empty when there is nothing to draw.
    pub fn gpu_draw_data(&self) -> Vec<GpuAtlasDrawSequence> {
        let raw = self.raw("gpu_draw_data");
        let mut sequences = Vec::new();
        let mut cursor = unsafe { self.api.get_gpu_text_draw_data(raw) } as *const RawGpuAtlasDrawSequence;
        while !cursor.is_null() {
            let sequence = unsafe { GpuAtlasDrawSequence::read_from(cursor) };
            cursor = sequence.next.as_ptr();
            sequences.push(sequence);
        }
        sequences
    }

    pub fn destroy(&self) -> bool {
        let api = &self.api;
        self.cell.destroy_with(|raw| unsafe { api.destroy_text(raw) })
    }
}

impl Drop for Text<'_> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Text").field(&self.cell).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::records::SubStringFlags;
    use crate::native::HeadlessApi;
    use tempfile::TempDir;

    struct Fixture {
        api: Rc<HeadlessApi>,
        ctx: Context,
        _dir: TempDir,
        font_path: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let api = Rc::new(HeadlessApi::new());
        let ctx = Context::new(api.clone());
        let dir = TempDir::new().unwrap();
        let font_path = dir.path().join("DejaVuSans.ttf");
        std::fs::write(&font_path, b"\0\x01\0\0").unwrap();
        Fixture {
            api,
            ctx,
            _dir: dir,
            font_path,
        }
    }

    #[test]
    fn test_font_metrics() {
        let fx = fixture();
        let font = Font::open(&fx.ctx, &fx.font_path, 16.0).unwrap();
        assert_eq!(font.size(), 16.0);
        assert_eq!(font.height(), 20);
        assert_eq!(font.family_name().as_deref(), Some("DejaVuSans"));
        font.set_size(8.0).unwrap();
        assert_eq!(font.height(), 10);
        assert!(font.set_size(0.0).is_err());
    }

    #[test]
    fn test_missing_font_file() {
        let fx = fixture();
        let err = Font::open(&fx.ctx, fx.font_path.with_file_name("nope.ttf"), 12.0).unwrap_err();
        assert_eq!(err.operation(), Some("TTF_OpenFont"));
    }

    #[test]
    fn test_text_color_and_string() {
        let fx = fixture();
        let engine = TextEngine::create_surface(&fx.ctx).unwrap();
        let font = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap();
        let text = Text::create(&engine, &font, "hi").unwrap();

        assert_eq!(text.color().unwrap(), Color::WHITE);
        text.set_color(Color::rgba(1, 2, 3, 4)).unwrap();
        assert_eq!(text.color().unwrap(), Color::rgba(1, 2, 3, 4));

        text.set_string("").unwrap();
        assert!(text.gpu_draw_data().is_empty());
    }

    #[test]
    fn test_substring_lookup() {
        let fx = fixture();
        let engine = TextEngine::create_surface(&fx.ctx).unwrap();
        let font = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap();
        let text = Text::create(&engine, &font, "abc").unwrap();

        let first = text.substring(0).unwrap();
        assert!(first.flags.contains(SubStringFlags::TEXT_START | SubStringFlags::LINE_START));
        assert_eq!(text.substring(1).unwrap().rect.x, 6);

        let end = text.substring(10).unwrap();
        assert_eq!(end.length, 0);
        assert!(end.flags.contains(SubStringFlags::TEXT_END));
    }

    #[test]
    fn test_substring_block_freed_once() {
        let fx = fixture();
        let engine = TextEngine::create_surface(&fx.ctx).unwrap();
        let font = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap();
        let text = Text::create(&engine, &font, "hello").unwrap();

        let mut subs = text.substrings_for_range(1, 3).unwrap();
        assert_eq!(fx.api.live_objects().allocations, 1);
        assert_eq!(subs.next().map(|s| s.offset), Some(1));
        drop(subs);
        assert_eq!(fx.api.live_objects().allocations, 0);

        let offsets: Vec<i32> = text.substrings_for_range(0, -1).unwrap().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3, 4]);
        assert_eq!(fx.api.live_objects().allocations, 0);
    }

    #[test]
    fn test_gpu_draw_data_walks_lines() {
        let fx = fixture();
        let engine = TextEngine::create_surface(&fx.ctx).unwrap();
        let font = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap();
        let text = Text::create(&engine, &font, "ab\ncde").unwrap();

        let sequences = text.gpu_draw_data();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].num_vertices, 8);
        assert_eq!(sequences[1].num_indices, 18);
        assert!(sequences[1].next.is_null());
    }

    #[test]
    fn test_fonts_keep_library_alive_past_context() {
        let Fixture { api, ctx, _dir, font_path } = fixture();
        let engine = TextEngine::create_surface(&ctx).unwrap();
        let font = Font::open(&ctx, &font_path, 16.0).unwrap();
        assert_eq!(api.ttf_init_count(), 1);

        drop(ctx);
        assert_eq!(api.ttf_init_count(), 1);
        assert_eq!(font.height(), 20);
        let text = Text::create(&engine, &font, "still here").unwrap();
        assert_eq!(text.gpu_draw_data().len(), 1);
        drop(text);

        drop(font);
        assert_eq!(api.ttf_init_count(), 1);
        drop(engine);
        assert_eq!(api.ttf_init_count(), 0);
        assert_eq!(api.live_objects().total(), 0);
    }

    #[test]
    fn test_library_initialized_once_per_context() {
        let fx = fixture();
        let first = Font::open(&fx.ctx, &fx.font_path, 10.0).unwrap();
        let second = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap();
        let _engine = TextEngine::create_surface(&fx.ctx).unwrap();
        drop(first);
        drop(second);
        assert_eq!(fx.api.ttf_init_count(), 1);
    }

    #[test]
    fn test_failed_init_opens_nothing() {
        let fx = fixture();
        fx.api.fail_next("TTF_Init");
        let err = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap_err();
        assert_eq!(err.operation(), Some("TTF_Init"));
        assert_eq!(fx.api.ttf_init_count(), 0);

        let font = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap();
        assert_eq!(font.size(), 12.0);
        assert_eq!(fx.api.ttf_init_count(), 1);
    }

    #[test]
    fn test_drop_order_releases_everything() {
        let fx = fixture();
        {
            let engine = TextEngine::create_surface(&fx.ctx).unwrap();
            let font = Font::open(&fx.ctx, &fx.font_path, 12.0).unwrap();
            let _text = Text::create(&engine, &font, "x").unwrap();
            let live = fx.api.live_objects();
            assert_eq!((live.fonts, live.text_engines, live.texts), (1, 1, 1));
        }
        assert_eq!(fx.api.live_objects().total(), 0);
    }
}

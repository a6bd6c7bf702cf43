//! Native record layouts
//!
//! Host values for the fixed-layout structs the binding reads and writes:
//! `SDL_Color`, `SDL_FColor`, `SDL_Rect`, `SDL_FPoint`, `TTF_SubString`,
//! `SDL_PixelFormatDetails` and `TTF_GPUAtlasDrawSequence`.

use crate::ffi::codec::{component_u8, BinaryRecord, CodecResult, ForeignPtr};
use crate::ffi::sys;
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

// ============================================================================
// Raw layouts
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct RawColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct RawFColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct RawRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct RawFPoint {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct RawSubString {
    pub flags: u32,
    pub offset: i32,
    pub length: i32,
    pub line_index: i32,
    pub cluster_index: i32,
    pub rect: RawRect,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct RawPixelFormatDetails {
    pub format: u32,
    pub bits_per_pixel: u8,
    pub bytes_per_pixel: u8,
    pub _padding: [u8; 2],
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
    pub r_bits: u8,
    pub g_bits: u8,
    pub b_bits: u8,
    pub a_bits: u8,
    pub r_shift: u8,
    pub g_shift: u8,
    pub b_shift: u8,
    pub a_shift: u8,
}

/// Gap after a 32-bit field that precedes a pointer
const PTR_GAP: usize = std::mem::size_of::<usize>() - 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct RawGpuAtlasDrawSequence {
    pub atlas_texture: usize,
    pub xy: usize,
    pub uv: usize,
    pub num_vertices: i32,
    pub _gap: [u8; PTR_GAP],
    pub indices: usize,
    pub num_indices: i32,
    pub image_type: i32,
    pub next: usize,
}

// ============================================================================
// Color
// ============================================================================

/// `SDL_Color`: 8-bit RGBA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build from wide components, rejecting anything outside `0..=255`
    pub fn try_from_components(r: i64, g: i64, b: i64, a: i64) -> CodecResult<Self> {
        Ok(Self {
            r: component_u8(<Self as BinaryRecord>::NAME, "r", r)?,
            g: component_u8(<Self as BinaryRecord>::NAME, "g", g)?,
            b: component_u8(<Self as BinaryRecord>::NAME, "b", b)?,
            a: component_u8(<Self as BinaryRecord>::NAME, "a", a)?,
        })
    }
}

impl TryFrom<[i64; 4]> for Color {
    type Error = crate::ffi::codec::CodecError;

    fn try_from([r, g, b, a]: [i64; 4]) -> CodecResult<Self> {
        Self::try_from_components(r, g, b, a)
    }
}

impl BinaryRecord for Color {
    type Raw = RawColor;
    const NAME: &'static str = "SDL_Color";

    fn from_raw(raw: &RawColor) -> Self {
        Self::rgba(raw.r, raw.g, raw.b, raw.a)
    }

    fn to_raw(&self) -> RawColor {
        RawColor {
            r: self.r,
            g: self.g,
            b: self.b,
            a: self.a,
        }
    }
}

/// `SDL_FColor`: float RGBA, nominally in `0.0..=1.0` but not clamped
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl From<Color> for FColor {
    fn from(c: Color) -> Self {
        Self {
            r: c.r as f32 / 255.0,
            g: c.g as f32 / 255.0,
            b: c.b as f32 / 255.0,
            a: c.a as f32 / 255.0,
        }
    }
}

impl BinaryRecord for FColor {
    type Raw = RawFColor;
    const NAME: &'static str = "SDL_FColor";

    fn from_raw(raw: &RawFColor) -> Self {
        Self {
            r: raw.r,
            g: raw.g,
            b: raw.b,
            a: raw.a,
        }
    }

    fn to_raw(&self) -> RawFColor {
        RawFColor {
            r: self.r,
            g: self.g,
            b: self.b,
            a: self.a,
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// `SDL_Rect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

impl From<RawRect> for Rect {
    fn from(raw: RawRect) -> Self {
        Self::new(raw.x, raw.y, raw.w, raw.h)
    }
}

impl From<Rect> for RawRect {
    fn from(r: Rect) -> Self {
        RawRect {
            x: r.x,
            y: r.y,
            w: r.w,
            h: r.h,
        }
    }
}

impl BinaryRecord for Rect {
    type Raw = RawRect;
    const NAME: &'static str = "SDL_Rect";

    fn from_raw(raw: &RawRect) -> Self {
        (*raw).into()
    }

    fn to_raw(&self) -> RawRect {
        (*self).into()
    }
}

/// `SDL_FPoint`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FPoint {
    pub x: f32,
    pub y: f32,
}

impl BinaryRecord for FPoint {
    type Raw = RawFPoint;
    const NAME: &'static str = "SDL_FPoint";

    fn from_raw(raw: &RawFPoint) -> Self {
        Self { x: raw.x, y: raw.y }
    }

    fn to_raw(&self) -> RawFPoint {
        RawFPoint {
            x: self.x,
            y: self.y,
        }
    }
}

// ============================================================================
// Text records
// ============================================================================

bitflags! {
    /// `TTF_SubStringFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SubStringFlags: u32 {
        /// Low byte holds the text direction
        const DIRECTION_MASK = 0x0000_00FF;
        const TEXT_START = 0x0000_0100;
        const LINE_START = 0x0000_0200;
        const LINE_END = 0x0000_0400;
        const TEXT_END = 0x0000_0800;
    }
}

impl Default for SubStringFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// `TTF_SubString`: one laid-out run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubString {
    pub flags: SubStringFlags,
    /// Byte offset from the start of the text
    pub offset: i32,
    /// Byte length
    pub length: i32,
    pub line_index: i32,
    pub cluster_index: i32,
    pub rect: Rect,
}

impl SubString {
    /// Text direction from the low byte of the flags
    pub fn direction(&self) -> u32 {
        self.flags.bits() & SubStringFlags::DIRECTION_MASK.bits()
    }
}

impl BinaryRecord for SubString {
    type Raw = RawSubString;
    const NAME: &'static str = "TTF_SubString";

    fn from_raw(raw: &RawSubString) -> Self {
        Self {
            flags: SubStringFlags::from_bits_retain(raw.flags),
            offset: raw.offset,
            length: raw.length,
            line_index: raw.line_index,
            cluster_index: raw.cluster_index,
            rect: raw.rect.into(),
        }
    }

    fn to_raw(&self) -> RawSubString {
        RawSubString {
            flags: self.flags.bits(),
            offset: self.offset,
            length: self.length,
            line_index: self.line_index,
            cluster_index: self.cluster_index,
            rect: self.rect.into(),
        }
    }
}

/// `TTF_ImageType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Invalid,
    Alpha,
    Color,
    Sdf,
    /// A value this binding does not know, kept verbatim
    Other(i32),
}

impl From<i32> for ImageType {
    fn from(value: i32) -> Self {
        match value {
            0 => ImageType::Invalid,
            1 => ImageType::Alpha,
            2 => ImageType::Color,
            3 => ImageType::Sdf,
            other => ImageType::Other(other),
        }
    }
}

impl From<ImageType> for i32 {
    fn from(kind: ImageType) -> Self {
        match kind {
            ImageType::Invalid => 0,
            ImageType::Alpha => 1,
            ImageType::Color => 2,
            ImageType::Sdf => 3,
            ImageType::Other(other) => other,
        }
    }
}

/// `TTF_GPUAtlasDrawSequence`
///
/// All pointers are owned by the text object that produced the sequence and
/// are invalidated when it changes or is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuAtlasDrawSequence {
    pub atlas_texture: ForeignPtr<sys::SDL_GPUTexture>,
    pub xy: ForeignPtr<RawFPoint>,
    pub uv: ForeignPtr<RawFPoint>,
    pub num_vertices: i32,
    pub indices: ForeignPtr<i32>,
    pub num_indices: i32,
    pub image_type: ImageType,
    pub next: ForeignPtr<RawGpuAtlasDrawSequence>,
}

impl BinaryRecord for GpuAtlasDrawSequence {
    type Raw = RawGpuAtlasDrawSequence;
    const NAME: &'static str = "TTF_GPUAtlasDrawSequence";

    fn from_raw(raw: &RawGpuAtlasDrawSequence) -> Self {
        Self {
            atlas_texture: ForeignPtr::foreign(raw.atlas_texture),
            xy: ForeignPtr::foreign(raw.xy),
            uv: ForeignPtr::foreign(raw.uv),
            num_vertices: raw.num_vertices,
            indices: ForeignPtr::foreign(raw.indices),
            num_indices: raw.num_indices,
            image_type: raw.image_type.into(),
            next: ForeignPtr::foreign(raw.next),
        }
    }

    fn to_raw(&self) -> RawGpuAtlasDrawSequence {
        RawGpuAtlasDrawSequence {
            atlas_texture: self.atlas_texture.addr(),
            xy: self.xy.addr(),
            uv: self.uv.addr(),
            num_vertices: self.num_vertices,
            _gap: [0; PTR_GAP],
            indices: self.indices.addr(),
            num_indices: self.num_indices,
            image_type: self.image_type.into(),
            next: self.next.addr(),
        }
    }
}

// ============================================================================
// Pixel formats
// ============================================================================

/// `SDL_PixelFormatDetails`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelFormatDetails {
    pub format: u32,
    pub bits_per_pixel: u8,
    pub bytes_per_pixel: u8,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
    pub r_bits: u8,
    pub g_bits: u8,
    pub b_bits: u8,
    pub a_bits: u8,
    pub r_shift: u8,
    pub g_shift: u8,
    pub b_shift: u8,
    pub a_shift: u8,
}

impl PixelFormatDetails {
    /// Pack a color into a pixel value of this format
    pub fn map_rgba(&self, color: Color) -> u32 {
        fn channel(value: u8, bits: u8, shift: u8, mask: u32) -> u32 {
            if bits == 0 {
                return 0;
            }
            let scaled = (value as u32) >> (8 - bits.min(8) as u32);
            // Shifts past the pixel width come from corrupt details
            scaled.checked_shl(u32::from(shift)).unwrap_or(0) & mask
        }

        channel(color.r, self.r_bits, self.r_shift, self.r_mask)
            | channel(color.g, self.g_bits, self.g_shift, self.g_mask)
            | channel(color.b, self.b_bits, self.b_shift, self.b_mask)
            | channel(color.a, self.a_bits, self.a_shift, self.a_mask)
    }
}

impl BinaryRecord for PixelFormatDetails {
    type Raw = RawPixelFormatDetails;
    const NAME: &'static str = "SDL_PixelFormatDetails";

    fn from_raw(raw: &RawPixelFormatDetails) -> Self {
        Self {
            format: raw.format,
            bits_per_pixel: raw.bits_per_pixel,
            bytes_per_pixel: raw.bytes_per_pixel,
            r_mask: raw.r_mask,
            g_mask: raw.g_mask,
            b_mask: raw.b_mask,
            a_mask: raw.a_mask,
            r_bits: raw.r_bits,
            g_bits: raw.g_bits,
            b_bits: raw.b_bits,
            a_bits: raw.a_bits,
            r_shift: raw.r_shift,
            g_shift: raw.g_shift,
            b_shift: raw.b_shift,
            a_shift: raw.a_shift,
        }
    }

    fn to_raw(&self) -> RawPixelFormatDetails {
        RawPixelFormatDetails {
            format: self.format,
            bits_per_pixel: self.bits_per_pixel,
            bytes_per_pixel: self.bytes_per_pixel,
            _padding: [0; 2],
            r_mask: self.r_mask,
            g_mask: self.g_mask,
            b_mask: self.b_mask,
            a_mask: self.a_mask,
            r_bits: self.r_bits,
            g_bits: self.g_bits,
            b_bits: self.b_bits,
            a_bits: self.a_bits,
            r_shift: self.r_shift,
            g_shift: self.g_shift,
            b_shift: self.b_shift,
            a_shift: self.a_shift,
        }
    }
}

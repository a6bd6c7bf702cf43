//! Record codec tests
//!
//! Property tests over the fixed-layout records, plus the range checks on
//! host-side construction.

mod common;

use bindery_runtime::ffi::CodecError;
use bindery_runtime::{
    BinaryRecord, Color, FColor, FPoint, ForeignPtr, GpuAtlasDrawSequence, ImageType, Ownership, PixelFormatDetails,
    Rect, SubString, SubStringFlags,
};
use common::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn rect() -> impl Strategy<Value = Rect> {
    (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

proptest! {
    #[test]
    fn prop_color_survives_native_layout(r: u8, g: u8, b: u8, a: u8) {
        let color = Color::rgba(r, g, b, a);
        let bytes = color.encode();
        prop_assert_eq!(&bytes, &vec![r, g, b, a]);
        prop_assert_eq!(Color::decode(&bytes), color);
    }

    #[test]
    fn prop_rect_survives_native_layout(rect in rect()) {
        prop_assert_eq!(Rect::decode(&rect.encode()), rect);
    }

    #[test]
    fn prop_fpoint_keeps_bit_patterns(x: u32, y: u32) {
        let point = FPoint { x: f32::from_bits(x), y: f32::from_bits(y) };
        let back = FPoint::decode(&point.encode());
        prop_assert_eq!(back.x.to_bits(), x);
        prop_assert_eq!(back.y.to_bits(), y);
    }

    #[test]
    fn prop_substring_keeps_unknown_flag_bits(
        flags: u32,
        offset: i32,
        length: i32,
        line_index: i32,
        cluster_index: i32,
        rect in rect(),
    ) {
        let sub = SubString {
            flags: SubStringFlags::from_bits_retain(flags),
            offset,
            length,
            line_index,
            cluster_index,
            rect,
        };
        let back = SubString::decode(&sub.encode());
        prop_assert_eq!(back, sub);
        prop_assert_eq!(back.flags.bits(), flags);
        prop_assert_eq!(back.direction(), flags & 0xFF);
    }

    #[test]
    fn prop_decode_ignores_trailing_bytes(rect in rect(), tail in proptest::collection::vec(any::<u8>(), 0..32)) {
        let mut bytes = rect.encode();
        bytes.extend_from_slice(&tail);
        prop_assert_eq!(Rect::decode(&bytes), rect);
    }

    #[test]
    fn prop_draw_sequence_addresses_pass_through(
        texture: usize,
        xy: usize,
        next: usize,
        num_vertices: i32,
        image_type: i32,
    ) {
        let seq = GpuAtlasDrawSequence {
            atlas_texture: ForeignPtr::foreign(texture),
            xy: ForeignPtr::foreign(xy),
            uv: ForeignPtr::null(),
            num_vertices,
            indices: ForeignPtr::null(),
            num_indices: 0,
            image_type: ImageType::from(image_type),
            next: ForeignPtr::foreign(next),
        };
        let back = GpuAtlasDrawSequence::decode(&seq.encode());
        prop_assert_eq!(back.atlas_texture.addr(), texture);
        prop_assert_eq!(back.next.addr(), next);
        prop_assert_eq!(back.next.ownership(), Ownership::Foreign);
        prop_assert_eq!(i32::from(back.image_type), image_type);
    }
}

#[rstest]
#[case::negative([-1, 0, 0, 0], "r", -1)]
#[case::too_large([0, 256, 0, 0], "g", 256)]
#[case::alpha([0, 0, 0, 1000], "a", 1000)]
fn test_color_components_out_of_range(#[case] components: [i64; 4], #[case] field: &str, #[case] value: i64) {
    match Color::try_from(components) {
        Err(CodecError::OutOfRange {
            record,
            field: got,
            value: got_value,
            min,
            max,
        }) => {
            assert_eq!(record, "SDL_Color");
            assert_eq!(got, field);
            assert_eq!(got_value, value);
            assert_eq!((min, max), (0, 255));
        }
        other => panic!("expected OutOfRange, got {:?}", other),
    }
}

#[test]
fn test_color_components_at_bounds() {
    assert_eq!(Color::try_from([0, 255, 0, 255]).unwrap(), Color::rgba(0, 255, 0, 255));
}

#[test]
fn test_fcolor_from_color_scales_to_unit() {
    let f = FColor::from(Color::rgba(255, 0, 51, 255));
    assert_eq!((f.r, f.g, f.a), (1.0, 0.0, 1.0));
    assert!((f.b - 0.2).abs() < 1e-6);
}

#[test]
#[should_panic(expected = "shorter than the 16-byte layout")]
fn test_short_rect_buffer_panics() {
    Rect::decode(&[0u8; 15]);
}

#[test]
fn test_pointer_ownership_is_recorded() {
    let owned: ForeignPtr<u8> = ForeignPtr::new(0x40, Ownership::Caller);
    assert_eq!(owned.ownership(), Ownership::Caller);
    assert!(ForeignPtr::<u8>::null().is_null());
    assert_eq!(PixelFormatDetails::default().map_rgba(Color::WHITE), 0);
}

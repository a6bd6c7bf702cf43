//! Foreign function interface layer
//!
//! Everything that touches the C ABI directly:
//! - Raw declarations (`sys`) and the call-surface tables (`surface`)
//! - Typed handles with liveness tracking (`handle`)
//! - Fixed-layout record codec (`codec`, `records`)
//! - Callback trampolines and their registry (`callbacks`)
//! - Null-terminated native arrays (`array`)
//! - Shared library loading (`loader`)
//!
//! # Safety
//!
//! Raw pointers stop here and in `native`. The wrappers above only pass
//! handles they know to be live, and expose safe APIs.

pub mod array;
pub mod callbacks;
pub mod codec;
pub mod handle;
pub mod loader;
pub mod records;
pub mod surface;
pub mod sys;

pub use callbacks::{CallbackRegistry, CallbackShape, OwnerKey, Slot, TrampolineId};
pub use codec::{BinaryRecord, CodecError, CodecResult, ForeignPtr, Ownership};
pub use handle::{Handle, HandleCell, HandleKind};
pub use loader::{LibraryLoader, LoadError};
pub use records::{Color, FColor, FPoint, GpuAtlasDrawSequence, ImageType, PixelFormatDetails, Rect, SubString, SubStringFlags};

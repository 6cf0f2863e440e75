//! Field values and the per-type coercion registry

pub mod registry;
pub mod temporal;
pub mod value;

pub use registry::{Coerced, FieldStrategy, PendingLookup, RenderHint, resolve};
pub use value::{FieldValue, RecordValue, RelationRef};

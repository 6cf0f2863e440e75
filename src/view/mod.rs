//! Server-supplied view descriptions: field metadata and layout trees

pub mod architecture;
pub mod layout;

pub use architecture::{FieldDefinition, FieldKind, SelectionOption, SelectionSource, ViewArchitecture, ViewType};
pub use layout::{Layout, SectionKind, SectionNode, parse_layout};

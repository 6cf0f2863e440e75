pub mod hydrate;
pub mod session;

pub use session::{FormErrors, FormSession};

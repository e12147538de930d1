pub mod types;
pub mod classification;

pub use types::{TransportError, TransportErrorKind, VerifyError};
pub use classification::{ErrorClassification, ErrorStage};

pub mod payload;
pub mod prompt;
pub mod session;
pub mod styles;

pub use payload::{validate_image, ImagePayload};
pub use session::{HeadshotSession, Screen, SessionError, SessionStore, TransformOutcome};
pub use styles::{BackgroundStyle, SuitStyle};

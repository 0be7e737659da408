pub mod content;
pub mod identifiers;
pub mod progress;

pub use content::{ContentDescriptor, ContentSource};
pub use identifiers::{ContentId, ContentKey, CourseId, ModuleId};
pub use progress::{CourseProgress, ModuleProgress};

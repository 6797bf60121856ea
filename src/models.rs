pub mod item;
pub mod location;
pub mod scan;
pub mod upload;

pub use item::{ItemId, ItemStatus, ItemSummary, PocketEntry};
pub use location::LocationRef;
pub use scan::{NoticeLevel, ScanEvent, ScanMode, ScanOutcome, UiEvent};
pub use upload::{ImagePayload, UploadEntry, UploadStatus};

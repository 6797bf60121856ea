pub mod dispatcher;
pub use dispatcher::{FlowEnd, ScanDispatcher, ScanFlow, UiBus, log_ui_events};
pub mod pocket;
pub use pocket::{PocketService, PocketSource, PocketStore};
pub mod relocation;
pub use relocation::RelocationSession;
pub mod retry;
pub use retry::RetryScheduler;
pub mod scanner;
pub use scanner::{ContinuousScanSource, ScanState};
pub mod upload_queue;
pub use upload_queue::{DrainStep, UploadQueue, UploadWorker, UploadWorkerHandle};

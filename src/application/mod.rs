pub mod download_queue;
pub mod export_manager;
pub mod ports;
#[cfg(test)]
pub mod testing;
pub mod transport;

pub use download_queue::DownloadQueue;
pub use export_manager::{ExportFormat, ExportManager};

pub mod book;
pub mod error;
pub mod model;

pub use book::{Book, BookStatistics};
pub use error::{AppError, JobError, SaveError, TransferError};
pub use model::{DownloadJob, ExpectedSize, Progress, Severity};

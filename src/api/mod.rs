pub mod client;
pub mod models;
pub mod transport;

pub use client::ApiClient;
pub use models::{response_text, ApiConfig, ServerExport};
pub use transport::ReqwestTransport;

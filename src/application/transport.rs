use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::domain::{DownloadJob, TransferError};

pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_LENGTH: &str = "content-length";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Fully resolved request for one transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransferRequest {
    /// Serializes the job body and adds a JSON content type unless the caller
    /// already set one.
    pub fn from_job(job: &DownloadJob) -> Self {
        let mut headers: Vec<(String, String)> = job
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let body = job.payload();

        if body.is_some()
            && !headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE))
        {
            headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }

        Self {
            url: job.target.clone(),
            headers,
            body,
        }
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type ChunkStream = BoxStream<'static, Result<Bytes, TransferError>>;

pub enum ResponseBody {
    /// Incremental reader over the body.
    Stream(ChunkStream),
    /// Whole payload fetched at once.
    Buffered(BoxFuture<'static, Result<Bytes, TransferError>>),
}

impl ResponseBody {
    #[cfg(test)]
    pub fn buffered(bytes: Bytes) -> Self {
        use futures::FutureExt;

        ResponseBody::Buffered(futures::future::ready(Ok(bytes)).boxed())
    }
}

pub struct TransportResponse {
    pub status: u16,
    /// Keys are lowercase.
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransferRequest) -> Result<TransportResponse, TransferError>;
}

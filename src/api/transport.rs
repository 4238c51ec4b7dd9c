use async_trait::async_trait;
use futures::{FutureExt, StreamExt, TryStreamExt};
use reqwest::Client;
use tracing::debug;

use crate::application::transport::{
    ResponseBody, TransferRequest, Transport, TransportResponse,
};
use crate::domain::TransferError;

/// Download transport over reqwest. Export endpoints are always POSTed.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    streaming: bool,
}

impl ReqwestTransport {
    pub fn new(streaming: bool) -> Self {
        Self {
            client: Client::new(),
            streaming,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransferRequest) -> Result<TransportResponse, TransferError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        debug!(url = %request.url, status, streaming = self.streaming, "Transport response");

        let body = if self.streaming {
            ResponseBody::Stream(
                response
                    .bytes_stream()
                    .map_err(|e| TransferError::StreamRead(e.to_string()))
                    .boxed(),
            )
        } else {
            ResponseBody::Buffered(
                async move {
                    response
                        .bytes()
                        .await
                        .map_err(|e| TransferError::StreamRead(e.to_string()))
                }
                .boxed(),
            )
        };

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DownloadJob;
    use mockito::Matcher;
    use serde_json::json;

    async fn collect(body: ResponseBody) -> Vec<u8> {
        match body {
            ResponseBody::Stream(chunks) => {
                let chunks: Vec<_> = chunks.try_collect().await.unwrap();
                chunks.concat()
            }
            ResponseBody::Buffered(whole) => whole.await.unwrap().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_posts_json_and_streams_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/export-pdf")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "title": "Dune" })))
            .with_status(200)
            .with_body("%PDF-1.7")
            .create_async()
            .await;

        let job = DownloadJob::new(format!("{}/api/export-pdf", server.url()), "book.pdf")
            .unwrap()
            .with_body(json!({ "title": "Dune" }));
        let response = ReqwestTransport::new(true)
            .send(TransferRequest::from_job(&job))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(collect(response.body).await, b"%PDF-1.7");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_buffered_mode_reads_whole_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/export-epub")
            .with_status(200)
            .with_body("epub-bytes")
            .create_async()
            .await;

        let job = DownloadJob::new(format!("{}/api/export-epub", server.url()), "book.epub")
            .unwrap();
        let response = ReqwestTransport::new(false)
            .send(TransferRequest::from_job(&job))
            .await
            .unwrap();

        assert!(matches!(response.body, ResponseBody::Buffered(_)));
        assert_eq!(collect(response.body).await, b"epub-bytes");
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/export-docx")
            .with_status(404)
            .create_async()
            .await;

        let job = DownloadJob::new(format!("{}/api/export-docx", server.url()), "book.docx")
            .unwrap();
        let response = ReqwestTransport::new(true)
            .send(TransferRequest::from_job(&job))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let job = DownloadJob::new("http://127.0.0.1:1/api/export-pdf", "book.pdf").unwrap();
        let err = match ReqwestTransport::new(true)
            .send(TransferRequest::from_job(&job))
            .await
        {
            Ok(_) => panic!("expected a transport error"),
            Err(e) => e,
        };

        assert!(matches!(err, TransferError::Transport(_)));
    }
}

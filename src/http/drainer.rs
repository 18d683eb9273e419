//! Background body draining for streams abandoned mid-body.
//!
//! Based on Chromium's `HttpResponseBodyDrainer`: read and discard what is
//! left of a response so its keep-alive connection can be reused.

use std::time::Duration;

use super::session::HttpNetworkSessionParams;
use super::stream::HttpStream;
use crate::base::neterror::NetError;

pub struct HttpResponseBodyDrainer {
    stream: Box<dyn HttpStream>,
    buffer_size: usize,
    max_body_bytes: u64,
    timeout: Duration,
}

impl HttpResponseBodyDrainer {
    pub fn new(stream: Box<dyn HttpStream>, params: &HttpNetworkSessionParams) -> Self {
        Self {
            stream,
            buffer_size: params.drainer_buffer_size.max(1),
            max_body_bytes: params.drainer_max_body_bytes,
            timeout: params.drainer_timeout,
        }
    }

    /// Drain to completion. The stream is closed either way: reusably if the
    /// body was fully read, non-reusably on error, timeout or overflow.
    pub async fn drain(mut self) -> Result<u64, NetError> {
        let result = tokio::time::timeout(self.timeout, self.read_to_end())
            .await
            .unwrap_or(Err(NetError::TimedOut));

        match result {
            Ok(total) => {
                let not_reusable = !self.stream.can_reuse_connection();
                self.stream.close(not_reusable);
                Ok(total)
            }
            Err(e) => {
                tracing::debug!(error = %e, "response body drain failed");
                self.stream.close(true);
                Err(e)
            }
        }
    }

    async fn read_to_end(&mut self) -> Result<u64, NetError> {
        let mut buf = vec![0u8; self.buffer_size];
        let mut total = 0u64;
        while !self.stream.is_response_body_complete() {
            let n = self.stream.read_response_body(&mut buf).await?;
            if n == 0 {
                // The peer closed before the end of the body was found.
                return Err(NetError::ConnectionClosed);
            }
            total += n as u64;
            if total > self.max_body_bytes {
                return Err(NetError::ResponseBodyTooBigToDrain);
            }
        }
        Ok(total)
    }

    /// Spawn the drain on the current tokio runtime. Without a runtime the
    /// connection cannot be salvaged and is closed.
    pub fn start(self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = self.drain().await;
                });
            }
            Err(_) => {
                let mut stream = self.stream;
                stream.close(true);
            }
        }
    }
}

use crate::cancel::CancelToken;
use crate::config::ClientConfig;
use crate::error_handling::build_request;
use crate::transport::{HttpTransport, ReqwestTransport};
use netcache_core::{decode_body, ClassifiedError, ErrorClassifier, RequestDescriptor, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use url::Url;

/// Issues described requests and resolves each to a typed value or a
/// [`ClassifiedError`].
///
/// Invocations share nothing but the transport, so any number may run
/// concurrently on one executor.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    classifier: ErrorClassifier,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: Url) -> Self {
        Self {
            transport,
            base_url,
            classifier: ErrorClassifier::new(),
        }
    }

    /// Create an executor on a reqwest transport built from `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.base_url.clone()))
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Execute `descriptor` and decode the JSON body into `T`
    pub async fn execute<T>(&self, descriptor: &RequestDescriptor) -> Result<T, ClassifiedError>
    where
        T: DeserializeOwned,
    {
        let body = self.execute_raw(descriptor).await?;
        decode_body(&body).map_err(|failure| {
            warn!(
                path = %descriptor.path(),
                tag = descriptor.response_tag().unwrap_or("-"),
                error = %failure,
                "Failed to decode response body"
            );
            self.classifier.classify_decode(&failure)
        })
    }

    /// Execute `descriptor` and return the body as UTF-8 text
    pub async fn execute_text(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<String, ClassifiedError> {
        let body = self.execute_raw(descriptor).await?;
        if body.is_empty() {
            return Err(ClassifiedError::NoData);
        }
        String::from_utf8(body).map_err(|_| ClassifiedError::DecodingFailed)
    }

    /// Like [`RequestExecutor::execute`], but gives up as soon as `cancel` fires.
    ///
    /// Returns `None` when cancelled; the in-flight request is dropped.
    pub async fn execute_cancellable<T>(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancelToken,
    ) -> Option<Result<T, ClassifiedError>>
    where
        T: DeserializeOwned,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path = %descriptor.path(), "Request cancelled");
                None
            }
            result = self.execute(descriptor) => Some(result),
        }
    }

    async fn execute_raw(&self, descriptor: &RequestDescriptor) -> Result<Vec<u8>, ClassifiedError> {
        descriptor.validate()?;
        let request = build_request(&self.base_url, descriptor)?;
        let method = request.method;
        let url = request.url.clone();

        let started = Instant::now();
        let outcome = self.transport.issue(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) if ErrorClassifier::is_success(response.status) => {
                trace!(
                    method = %method,
                    url = %url,
                    status = response.status,
                    bytes = response.body.len(),
                    elapsed_ms,
                    "Request succeeded"
                );
                Ok(response.body)
            }
            Ok(response) => {
                let error = self
                    .classifier
                    .classify_status(response.status, Some(&response.body));
                warn!(
                    method = %method,
                    url = %url,
                    status = response.status,
                    elapsed_ms,
                    error = %error,
                    "HTTP request failed"
                );
                Err(error)
            }
            Err(failure) => {
                let error = self.classifier.classify_failure(&failure);
                warn!(
                    method = %method,
                    url = %url,
                    elapsed_ms,
                    failure = %failure,
                    error = %error,
                    "Transport failure"
                );
                Err(error)
            }
        }
    }
}

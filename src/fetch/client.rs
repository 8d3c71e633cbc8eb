use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Lets dataset loading be driven by any
/// transport, including test doubles.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

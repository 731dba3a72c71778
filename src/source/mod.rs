use crate::error::Result;
use crate::types::ClusterResponse;
use async_trait::async_trait;

pub mod http;
pub use http::HttpClusterSource;

#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Fetch the latest cluster description.
    async fn fetch(&self) -> Result<ClusterResponse>;

    /// Discard the staged plan on the server.
    async fn clear_plan(&self) -> Result<()>;
}

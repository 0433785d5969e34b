//! File repository
//!
//! Piece processors write the files they produce through a [`FileRepository`]
//! and record the returned URI in a `ComponentLocation`.

pub mod local;

pub use local::LocalFileRepository;

use crate::domain::Result;
use async_trait::async_trait;
use tokio::io::AsyncRead;

/// Storage for files produced and consumed by piece processors
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Store the content of `stream` and return its URI
    ///
    /// `extension` is appended to the generated file name, without a dot.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the content could not be written.
    async fn save(
        &self,
        stream: &mut (dyn AsyncRead + Unpin + Send),
        extension: &str,
    ) -> Result<String>;

    /// Read back a stored file
    ///
    /// # Errors
    ///
    /// Returns a storage error if no file exists at `uri`.
    async fn get(&self, uri: &str) -> Result<Vec<u8>>;
}

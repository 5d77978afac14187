// Staged writes - Encode into a hidden file, then rename it into place

use std::future::Future;

use crate::domain::errors::*;
use crate::domain::model::EncodedSegment;
use crate::ports::{FsPort, LogPort};

/// Run `encode` against a fresh staging file in `directory` and commit the
/// result to `target`.
///
/// Staging and commit failures are mapped through `write_failure`. On any
/// failure the staging file is removed, so `target` only ever names a
/// complete file.
pub async fn write_staged<F, Fut>(
    fs_port: &dyn FsPort,
    log_port: &dyn LogPort,
    directory: &str,
    target: &str,
    write_failure: impl Fn(String) -> DomainError,
    encode: F,
) -> Result<EncodedSegment, DomainError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<EncodedSegment, DomainError>>,
{
    let staged = fs_port
        .create_staging_file(directory)
        .await
        .map_err(|e| write_failure(e.to_string()))?;

    let result = match encode(staged.clone()).await {
        Ok(encoded) => fs_port
            .commit_file(&staged, target)
            .await
            .map(|()| encoded)
            .map_err(|e| write_failure(e.to_string())),
        Err(e) => Err(e),
    };

    if result.is_err() && fs_port.file_exists(&staged).await.unwrap_or(false) {
        if let Err(e) = fs_port.delete_file(&staged).await {
            log_port
                .warn(&format!("Could not remove staging file {}: {}", staged, e))
                .await;
        }
    }

    result
}

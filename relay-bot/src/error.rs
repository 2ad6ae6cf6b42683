use relay_blob::BlobError;
use relay_telegram::TelegramError;
use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

/// Why a single update was not fully processed
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("chat API: {0}")]
    Chat(#[from] TelegramError),

    #[error("blob sink: {0}")]
    Blob(#[from] BlobError),
}

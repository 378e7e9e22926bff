pub mod password;

pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Stored password hash is malformed")]
    MalformedHash,
}

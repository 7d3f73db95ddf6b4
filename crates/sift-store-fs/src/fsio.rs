//! Small JSON-on-disk helpers shared by the stores.

use std::{io::ErrorKind, path::Path};

use serde::{Serialize, de::DeserializeOwned};
use sift_core::{Error, Result};
use tokio::fs;

/// Read and deserialise a JSON file. `None` if the file does not exist.
pub(crate) async fn read_json_opt<T: DeserializeOwned>(
  path: &Path,
) -> Result<Option<T>> {
  match fs::read(path).await {
    Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e.into()),
  }
}

/// Serialise `value` to `path`, creating parent directories as needed.
/// Overwrites any existing file.
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).await?;
  }
  let json = serde_json::to_vec(value)?;
  fs::write(path, json).await?;
  Ok(())
}

/// Error for an index entry whose payload file has gone missing.
pub(crate) fn corrupt(path: &Path, detail: &str) -> Error {
  Error::Corrupt { path: path.display().to_string(), detail: detail.into() }
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence for the remembered access token.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use phoenix_core::StoredToken;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

/// Storage for the single remembered token record.
///
/// A load that finds a malformed record reports `None` rather than an
/// error: a record we cannot read is the same as no record, and the user
/// will simply have to authenticate again.
#[async_trait]
pub trait TokenStore: Send + Sync {
	/// Loads the remembered token, if any.
	async fn load(&self) -> Result<Option<StoredToken>, StoreError>;

	/// Persists the token, replacing any previous record.
	async fn save(&self, token: &StoredToken) -> Result<(), StoreError>;

	/// Removes the remembered token.
	async fn clear(&self) -> Result<(), StoreError>;
}

/// Token store backed by a JSON file, owner-readable only where the
/// platform supports it.
#[derive(Debug)]
pub struct FileTokenStore {
	path: PathBuf,
}

impl FileTokenStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Default location: `~/.phoenix/<access_token_key>.json`.
	pub fn default_path(access_token_key: &str) -> Option<PathBuf> {
		dirs::home_dir().map(|home| home.join(".phoenix").join(format!("{access_token_key}.json")))
	}

	async fn write_private(path: &Path, content: &str) -> Result<(), StoreError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await?;
		}

		#[cfg(unix)]
		{
			use tokio::io::AsyncWriteExt;

			let mut file = fs::OpenOptions::new()
				.write(true)
				.create(true)
				.truncate(true)
				.mode(0o600)
				.open(path)
				.await?;
			file.write_all(content.as_bytes()).await?;
		}

		#[cfg(not(unix))]
		{
			fs::write(path, content).await?;
		}

		Ok(())
	}
}

#[async_trait]
impl TokenStore for FileTokenStore {
	async fn load(&self) -> Result<Option<StoredToken>, StoreError> {
		let raw = match fs::read_to_string(&self.path).await {
			Ok(raw) => raw,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err.into()),
		};

		match serde_json::from_str(&raw) {
			Ok(token) => Ok(Some(token)),
			Err(err) => {
				debug!(error = %err, "token record unreadable; treating as absent");
				Ok(None)
			}
		}
	}

	async fn save(&self, token: &StoredToken) -> Result<(), StoreError> {
		let content = serde_json::to_string(token)?;
		Self::write_private(&self.path, &content).await
	}

	async fn clear(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.path).await {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

/// In-memory token store for tests and hosts that manage persistence
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
	token: Mutex<Option<StoredToken>>,
}

impl MemoryTokenStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_token(token: StoredToken) -> Self {
		Self {
			token: Mutex::new(Some(token)),
		}
	}
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
	async fn load(&self) -> Result<Option<StoredToken>, StoreError> {
		Ok(self.token.lock().expect("store lock poisoned").clone())
	}

	async fn save(&self, token: &StoredToken) -> Result<(), StoreError> {
		*self.token.lock().expect("store lock poisoned") = Some(token.clone());
		Ok(())
	}

	async fn clear(&self) -> Result<(), StoreError> {
		*self.token.lock().expect("store lock poisoned") = None;
		Ok(())
	}
}

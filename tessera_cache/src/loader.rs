// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The loader contract.

use std::error::Error;

use thiserror::Error;

/// Why a tile payload could not be produced.
///
/// Failures stay inside the cache: they are logged and the key becomes
/// eligible for another attempt, but they never reach the renderer.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source has no data for this key.
    #[error("no data for tile")]
    NotFound,
    /// Reading the payload failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Any other failure, described in text.
    #[error("{0}")]
    Message(String),
    /// Any other failure, wrapping its source error.
    #[error(transparent)]
    Source(Box<dyn Error + Send + Sync + 'static>),
    /// The loader panicked; the payload's message is kept.
    #[error("loader panicked: {0}")]
    Panicked(String),
}

impl LoadError {
    /// A failure described by `message`.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// A failure caused by `error`.
    pub fn other(error: impl Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(error))
    }
}

/// Produces the payload for a key.
///
/// A loader is shared by every worker of the pool, so it may be called
/// concurrently for different keys. The cache never calls it twice at once for
/// the same key.
///
/// Closures taking `&K` implement this trait:
///
/// ```rust
/// use tessera_cache::{LoadError, Loader};
///
/// fn assert_loader<L: Loader<u32, String>>(_: &L) {}
///
/// let loader = |key: &u32| -> Result<String, LoadError> {
///     if *key == 0 { Err(LoadError::NotFound) } else { Ok(key.to_string()) }
/// };
/// assert_loader(&loader);
/// ```
pub trait Loader<K, V>: Send + Sync + 'static {
    /// Produce the payload for `key`.
    fn load(&self, key: &K) -> Result<V, LoadError>;
}

impl<K, V, F> Loader<K, V> for F
where
    F: Fn(&K) -> Result<V, LoadError> + Send + Sync + 'static,
{
    fn load(&self, key: &K) -> Result<V, LoadError> {
        self(key)
    }
}

// Copyright (C) Microsoft Corporation. All rights reserved.

//! Symmetric cipher contexts over a native crypto library.
//!
//! A [`CipherContext`] wraps one native cipher context and drives it through
//! `initialize`, any number of `update` calls and `finalize`. Padding, key
//! length and algorithm-specific controls are exposed on the context;
//! native failures surface as [`CipherError`] values that keep the native
//! error code.
//!
//! ```no_run
//! use azcipher::*;
//!
//! # fn main() -> Result<(), CipherError> {
//! let algorithm = CipherAlgorithm::from_name("AES-128-CBC")?;
//! let mut ctx = CipherContext::<DefaultNative>::new()?;
//! ctx.initialize(&algorithm, Direction::Encrypt, &[0u8; 16], Some(&[0u8; 16]), None)?;
//! let ciphertext = ctx.crypt_vec(b"attack at dawn")?;
//! assert_eq!(ciphertext.len(), 16);
//! # Ok(())
//! # }
//! ```

mod algorithm;
mod context;
mod error;
mod native;

use std::sync::Once;

pub use algorithm::*;
pub use context::*;
pub use error::*;
pub use native::*;

static INIT: Once = Once::new();

/// Initializes the native library once per process.
///
/// [`CipherContext::new`] calls this on first use; calling it again is a
/// no-op.
pub fn init() {
    INIT.call_once(|| {
        DefaultNative::init_library();
        tracing::debug!("native cipher library initialized");
    });
}

/// Human-readable text for a native error code taken from
/// [`CipherError::Crypto`].
pub fn error_string(code: u64) -> String {
    init();
    DefaultNative::error_string(code)
}

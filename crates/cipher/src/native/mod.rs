// Copyright (C) Microsoft Corporation. All rights reserved.

//! Capability interface to the native cipher library.
//!
//! [`NativeCipher`] lists everything a [`CipherContext`] needs from the
//! library that performs the actual cryptography: algorithm lookup, context
//! allocation (release is the implementor's `Drop`), binding and keying,
//! padding and key-length control, AEAD IV length and tags, the generic
//! control call, update and finalize, and error code lookup.
//!
//! # Backends
//!
//! - **`use-openssl`** (default): [`OsslCipherCtx`] over OpenSSL 3 EVP cipher
//!   contexts.

use std::ffi::c_void;

use super::*;

cfg_if::cfg_if! {
    if #[cfg(feature = "use-openssl")] {
        mod ossl;

        pub use ossl::*;

        /// Backend used by [`CipherContext`] and [`CipherAlgorithm`] lookups
        /// when none is named explicitly.
        pub type DefaultNative = OsslCipherCtx;
    } else {
        compile_error!("No native cipher backend selected; enable the `use-openssl` feature");
    }
}

/// Operations a native cipher context must provide.
///
/// Implementors own exactly one native context handle and release it when
/// dropped. Methods map one-to-one onto native calls; lifecycle checks are
/// done by [`CipherContext`], not here.
pub trait NativeCipher: Sized {
    /// Optional pluggable implementation source passed to [`bind`](Self::bind).
    type Engine;

    /// Performs the process-wide library initialization. Idempotent.
    fn init_library();

    /// Allocates an unbound native context.
    fn new() -> Result<Self, CipherError>;

    /// Resolves an algorithm by name, optionally from a specific engine.
    fn lookup(name: &str, engine: Option<&Self::Engine>) -> Result<CipherAlgorithm, CipherError>;

    /// Resolves an algorithm by native numeric identifier.
    fn lookup_nid(nid: i32) -> Result<CipherAlgorithm, CipherError>;

    /// Binds the context to `algorithm` without keying it.
    ///
    /// Binding resets key length to the algorithm default and re-enables
    /// padding.
    fn bind(
        &mut self,
        algorithm: &CipherAlgorithm,
        direction: Direction,
        engine: Option<&Self::Engine>,
    ) -> Result<(), CipherError>;

    /// Keys the bound context and resets its streaming state.
    ///
    /// `key` has the context key length and `iv`, when present, the context IV
    /// length; callers validate both.
    fn init(&mut self, direction: Direction, key: &[u8], iv: Option<&[u8]>)
        -> Result<(), CipherError>;

    /// Enables or disables PKCS#7 padding.
    fn set_padding(&mut self, enabled: bool);

    /// Current key length in bytes.
    fn key_length(&self) -> usize;

    /// Sets the key length used by the next keying call.
    fn set_key_length(&mut self, len: usize) -> Result<(), CipherError>;

    /// Current IV length in bytes.
    fn iv_length(&self) -> usize;

    /// Block size in bytes of the bound algorithm.
    fn block_size(&self) -> usize;

    /// Sets the IV length of a bound AEAD algorithm.
    fn set_iv_length(&mut self, len: usize) -> Result<(), CipherError>;

    /// Copies the authentication tag of a finished encryption into `tag`.
    fn tag(&self, tag: &mut [u8]) -> Result<(), CipherError>;

    /// Sets the tag the next decrypt `finalize` verifies against.
    fn set_tag(&mut self, tag: &[u8]) -> Result<(), CipherError>;

    /// Generic algorithm-specific control call.
    ///
    /// # Safety
    ///
    /// `ptr` is handed to the native library as is. It must be null or valid
    /// for whatever reads or writes the native implementation performs for
    /// `ctrl` with argument `arg`.
    unsafe fn ctrl(&mut self, ctrl: i32, arg: i32, ptr: *mut c_void) -> Result<(), CipherError>;

    /// Processes `input`, writing into `output` and returning the byte count.
    ///
    /// # Safety
    ///
    /// `output` must be at least [`CipherContext::update_capacity`] bytes for
    /// `input.len()`; the native call does not check it.
    unsafe fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CipherError>;

    /// Flushes the final block into `output` and returns the byte count.
    ///
    /// A decrypt-side padding or tag verification failure is reported as
    /// [`CipherError::Padding`]; every other failure as
    /// [`CipherError::Crypto`].
    fn finalize(&mut self, output: &mut [u8]) -> Result<usize, CipherError>;

    /// Human-readable text for a native error code.
    fn error_string(code: u64) -> String;
}

// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL backend for cipher contexts.
//!
//! Wraps one `EVP_CIPHER_CTX` per [`OsslCipherCtx`]. Algorithms are fetched
//! from the OpenSSL 3 provider registry by name each time a context binds
//! one; an [`OsslEngine`] narrows the fetch to a single loaded provider.
//!
//! # Error mapping
//!
//! Every `ErrorStack` is logged with `tracing::error!` before it is turned
//! into a [`CipherError`]. The first queued error code is kept, so
//! [`crate::error_string`] can render it later.

use std::ffi::c_char;
use std::ffi::c_ulong;
use std::ffi::c_void;
use std::ffi::CStr;
use std::fmt;

use foreign_types::ForeignTypeRef;
use openssl::cipher::Cipher;
use openssl::cipher::CipherRef;
use openssl::cipher_ctx::CipherCtx;
use openssl::cipher_ctx::CipherCtxRef;
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::provider::Provider;
use openssl_sys as ffi;

use super::*;

/// `EVP_CIPH_FLAG_AEAD_CIPHER`: cipher produces an authentication tag.
const EVP_CIPH_FLAG_AEAD_CIPHER: c_ulong = 0x0020_0000;

/// `EVP_CIPH_MODE`: mask selecting the mode bits of the cipher flags.
const EVP_CIPH_MODE: c_ulong = 0x000F_0007;

/// `EVP_CIPH_WRAP_MODE`: RFC 3394 / RFC 5649 key wrap.
const EVP_CIPH_WRAP_MODE: c_ulong = 0x0001_0002;

/// Converts an OpenSSL error stack into [`CipherError::Crypto`].
fn native_error(openssl_error_stack: ErrorStack) -> CipherError {
    tracing::error!(?openssl_error_stack);
    match openssl_error_stack.errors().first() {
        Some(error) => CipherError::Crypto {
            code: u64::from(error.code()),
            reason: error.reason().unwrap_or("unspecified").to_string(),
        },
        None => CipherError::Crypto {
            code: 0,
            reason: "no native error queued".to_string(),
        },
    }
}

/// Copies a static OpenSSL string table entry.
///
/// # Safety
///
/// `text` must be null or point to a NUL-terminated string that outlives the
/// call.
unsafe fn table_text(text: *const c_char) -> Option<String> {
    if text.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    let text = unsafe { CStr::from_ptr(text) };
    Some(text.to_string_lossy().into_owned())
}

/// A loaded OpenSSL provider used as the implementation source for fetched
/// algorithms.
///
/// The provider stays loaded for as long as the engine is alive. Contexts
/// only need the engine while binding; the fetched implementation keeps its
/// own reference afterwards.
pub struct OsslEngine {
    name: String,
    properties: String,
    _provider: Provider,
}

impl OsslEngine {
    /// Loads the provider `name` (e.g. `default`, `legacy`, `fips`).
    ///
    /// Fallback providers stay available, so loading an engine never hides
    /// algorithms from contexts that do not name it.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EngineUnavailable`] if the provider module cannot
    /// be found or activated.
    pub fn load(name: &str) -> Result<Self, CipherError> {
        let provider = Provider::try_load(None, name, true).map_err(|openssl_error_stack| {
            tracing::error!(?openssl_error_stack, name, "provider load failed");
            CipherError::EngineUnavailable(name.to_string())
        })?;
        tracing::debug!(name, "provider loaded");
        Ok(Self {
            name: name.to_string(),
            properties: format!("provider={name}"),
            _provider: provider,
        })
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property query used when fetching algorithms from this engine.
    pub fn properties(&self) -> &str {
        &self.properties
    }

    /// Resolves `name` from this engine only.
    pub fn algorithm(&self, name: &str) -> Result<CipherAlgorithm, CipherError> {
        OsslCipherCtx::lookup(name, Some(self))
    }
}

impl fmt::Debug for OsslEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsslEngine")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Owner of one OpenSSL `EVP_CIPHER_CTX`.
///
/// The context is freed when this value is dropped.
pub struct OsslCipherCtx {
    ctx: CipherCtx,
    cipher: Option<Cipher>,
    direction: Direction,
    padding: bool,
    aead: bool,
}

impl OsslCipherCtx {
    /// Underlying OpenSSL context.
    ///
    /// Changes made through the returned reference are not tracked by the
    /// owning [`CipherContext`].
    pub fn as_cipher_ctx(&self) -> &CipherCtxRef {
        &self.ctx
    }

    /// Mutable access to the underlying OpenSSL context.
    pub fn as_cipher_ctx_mut(&mut self) -> &mut CipherCtxRef {
        &mut self.ctx
    }

    /// Implementation the context is currently bound to.
    pub fn cipher(&self) -> Option<&CipherRef> {
        self.cipher.as_deref()
    }

    fn fetch(name: &str, engine: Option<&OsslEngine>) -> Result<Cipher, CipherError> {
        Cipher::fetch(None, name, engine.map(OsslEngine::properties)).map_err(
            |openssl_error_stack| {
                tracing::error!(?openssl_error_stack, name, "cipher fetch failed");
                CipherError::UnknownAlgorithm(name.to_string())
            },
        )
    }

    /// Provider ciphers do not report a variable-length flag, so try a
    /// different key length on a scratch context.
    fn accepts_other_key_length(cipher: &CipherRef) -> bool {
        let Ok(mut scratch) = CipherCtx::new() else {
            return false;
        };
        scratch.encrypt_init(Some(cipher), None, None).is_ok()
            && scratch.set_key_length(cipher.key_length() + 1).is_ok()
    }

    fn describe(name: &str, cipher: &CipherRef) -> CipherAlgorithm {
        // SAFETY: `cipher` refers to a live EVP_CIPHER for the whole call.
        let flags = unsafe { ffi::EVP_CIPHER_get_flags(cipher.as_ptr()) };
        CipherAlgorithm::new(
            name,
            cipher.nid().as_raw(),
            cipher.key_length(),
            cipher.iv_length(),
            cipher.block_size(),
        )
        .with_variable_key_length(Self::accepts_other_key_length(cipher))
        .with_aead(flags & EVP_CIPH_FLAG_AEAD_CIPHER != 0)
        .with_wrap(flags & EVP_CIPH_MODE == EVP_CIPH_WRAP_MODE)
    }
}

impl fmt::Debug for OsslCipherCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsslCipherCtx")
            .field("bound", &self.cipher.is_some())
            .field("direction", &self.direction)
            .field("padding", &self.padding)
            .finish()
    }
}

impl NativeCipher for OsslCipherCtx {
    type Engine = OsslEngine;

    fn init_library() {
        openssl::init();
    }

    fn new() -> Result<Self, CipherError> {
        let ctx = CipherCtx::new().map_err(native_error)?;
        Ok(Self {
            ctx,
            cipher: None,
            direction: Direction::Encrypt,
            padding: true,
            aead: false,
        })
    }

    fn lookup(name: &str, engine: Option<&OsslEngine>) -> Result<CipherAlgorithm, CipherError> {
        let cipher = Self::fetch(name, engine)?;
        Ok(Self::describe(name, &cipher))
    }

    fn lookup_nid(nid: i32) -> Result<CipherAlgorithm, CipherError> {
        let name = Nid::from_raw(nid)
            .short_name()
            .map_err(|openssl_error_stack| {
                tracing::error!(?openssl_error_stack, nid, "unknown nid");
                CipherError::UnknownAlgorithm(format!("nid {nid}"))
            })?;
        Self::lookup(name, None)
    }

    fn bind(
        &mut self,
        algorithm: &CipherAlgorithm,
        direction: Direction,
        engine: Option<&OsslEngine>,
    ) -> Result<(), CipherError> {
        let cipher = Self::fetch(algorithm.name(), engine)?;
        match direction {
            Direction::Encrypt => self.ctx.encrypt_init(Some(&*cipher), None, None),
            Direction::Decrypt => self.ctx.decrypt_init(Some(&*cipher), None, None),
        }
        .map_err(native_error)?;
        self.ctx.set_padding(true);

        self.cipher = Some(cipher);
        self.direction = direction;
        self.padding = true;
        self.aead = algorithm.is_aead();
        Ok(())
    }

    fn init(
        &mut self,
        direction: Direction,
        key: &[u8],
        iv: Option<&[u8]>,
    ) -> Result<(), CipherError> {
        match direction {
            Direction::Encrypt => self.ctx.encrypt_init(None, Some(key), iv),
            Direction::Decrypt => self.ctx.decrypt_init(None, Some(key), iv),
        }
        .map_err(native_error)?;
        self.direction = direction;
        Ok(())
    }

    fn set_padding(&mut self, enabled: bool) {
        // The native call always succeeds.
        self.ctx.set_padding(enabled);
        self.padding = enabled;
    }

    fn key_length(&self) -> usize {
        self.ctx.key_length()
    }

    fn set_key_length(&mut self, len: usize) -> Result<(), CipherError> {
        self.ctx.set_key_length(len).map_err(native_error)
    }

    fn iv_length(&self) -> usize {
        self.ctx.iv_length()
    }

    fn block_size(&self) -> usize {
        self.ctx.block_size()
    }

    fn set_iv_length(&mut self, len: usize) -> Result<(), CipherError> {
        self.ctx.set_iv_length(len).map_err(native_error)
    }

    fn tag(&self, tag: &mut [u8]) -> Result<(), CipherError> {
        self.ctx.tag(tag).map_err(native_error)
    }

    fn set_tag(&mut self, tag: &[u8]) -> Result<(), CipherError> {
        self.ctx.set_tag(tag).map_err(native_error)
    }

    unsafe fn ctrl(&mut self, ctrl: i32, arg: i32, ptr: *mut c_void) -> Result<(), CipherError> {
        // SAFETY: the context pointer is live for the call; the caller
        // vouches for `ptr`.
        let rc = unsafe { ffi::EVP_CIPHER_CTX_ctrl(self.ctx.as_ptr(), ctrl, arg, ptr) };
        if rc <= 0 {
            Err(native_error(ErrorStack::get()))
        } else {
            Ok(())
        }
    }

    unsafe fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CipherError> {
        // SAFETY: the caller guarantees `output` covers everything the native
        // update may write for `input`.
        unsafe { self.ctx.cipher_update_unchecked(input, Some(output)) }.map_err(native_error)
    }

    fn finalize(&mut self, output: &mut [u8]) -> Result<usize, CipherError> {
        self.ctx.cipher_final(output).map_err(|openssl_error_stack| {
            if self.direction == Direction::Decrypt && (self.padding || self.aead) {
                tracing::warn!(?openssl_error_stack, "decrypt verification failed");
                CipherError::Padding
            } else {
                native_error(openssl_error_stack)
            }
        })
    }

    fn error_string(code: u64) -> String {
        let packed = code as c_ulong;
        // SAFETY: both lookups return null or an entry of OpenSSL's static
        // string tables.
        let (library, reason) = unsafe {
            (
                table_text(ffi::ERR_lib_error_string(packed)),
                table_text(ffi::ERR_reason_error_string(packed)),
            )
        };
        // Same layout as ERR_error_string_n: error:<code>:<lib>:<func>:<reason>
        format!(
            "error:{packed:08X}:{}::{}",
            library.as_deref().unwrap_or("unknown library"),
            reason.as_deref().unwrap_or("unspecified"),
        )
    }
}

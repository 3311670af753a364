// Copyright (C) Microsoft Corporation. All rights reserved.

//! Streaming cipher context.
//!
//! [`CipherContext`] owns one native cipher context and enforces its
//! lifecycle:
//!
//! ```text
//! Empty --initialize--> Initialized --update--> Streaming --finalize--> Finalized
//!                        |   ^                   |  (update)*              |
//!                        |   +---- initialize ---+-------------------------+
//!                        +--finalize--> Finalized
//!
//! Initialized|Finalized|Failed --set_key_length--> Unkeyed --initialize--> Initialized
//! ```
//!
//! Changing the key length discards the native key, so the context waits in
//! [`ContextStage::Unkeyed`] until it is keyed again.
//!
//! A native failure during `initialize`, `update` or `finalize` moves the
//! context to [`ContextStage::Failed`]; only `initialize` is accepted from
//! there. Calls that break these rules return
//! [`CipherError::ContractViolation`] without touching the native context.
//!
//! # Buffers
//!
//! The context never allocates output for `update`/`finalize`. Use
//! [`CipherContext::update_capacity`] and [`CipherContext::final_capacity`]
//! to size buffers, or [`CipherContext::crypt_vec`] to get an owned vector.
//!
//! # Thread Safety
//!
//! A context has a single owner and no internal locking. It may be moved to
//! another thread but must not be shared.

use std::ffi::c_int;
use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::ptr;

use super::*;

/// Direction of a cipher stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext in, ciphertext out.
    Encrypt,
    /// Ciphertext in, plaintext out.
    Decrypt,
}

/// Direction argument of [`CipherContext::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitDirection {
    /// Start an encryption stream.
    Encrypt,
    /// Start a decryption stream.
    Decrypt,
    /// Reuse the direction of the last successful `initialize`.
    KeepPrevious,
}

impl From<Direction> for InitDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Encrypt => InitDirection::Encrypt,
            Direction::Decrypt => InitDirection::Decrypt,
        }
    }
}

/// Lifecycle stage of a [`CipherContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStage {
    /// Native context allocated, no algorithm bound.
    Empty,
    /// Keyed and ready; no data processed yet.
    Initialized,
    /// At least one `update` succeeded.
    Streaming,
    /// `finalize` succeeded; re-initialize to start another stream.
    Finalized,
    /// Algorithm bound but its key was dropped by a key-length change;
    /// re-initialize with a key of the new length.
    Unkeyed,
    /// A native call failed mid-stream; re-initialize to recover.
    Failed,
}

/// Owned, single-stream cipher context over a native backend.
///
/// The native context is allocated by [`CipherContext::new`] and released
/// when the value is dropped, on every exit path. The type is move-only.
pub struct CipherContext<B: NativeCipher = DefaultNative> {
    native: B,
    algorithm: Option<CipherAlgorithm>,
    direction: Option<Direction>,
    padding: bool,
    stage: ContextStage,
}

impl<B: NativeCipher> CipherContext<B> {
    /// Allocates an empty context.
    ///
    /// Performs the process-wide library initialization on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Crypto`] if the native allocation fails.
    pub fn new() -> Result<Self, CipherError> {
        B::init_library();
        let native = B::new()?;
        Ok(Self {
            native,
            algorithm: None,
            direction: None,
            padding: true,
            stage: ContextStage::Empty,
        })
    }

    /// Binds the context to `algorithm`, keys it and resets streaming state.
    ///
    /// The algorithm is bound again only if it differs from the one already
    /// bound or an `engine` is given. Re-initializing with the same algorithm
    /// keeps the key length set by [`set_key_length`](Self::set_key_length)
    /// and the current padding setting; binding a new algorithm restores its
    /// default key length and enables padding.
    ///
    /// # Arguments
    ///
    /// * `algorithm` - Algorithm to run.
    /// * `direction` - Stream direction, or [`InitDirection::KeepPrevious`].
    /// * `key` - Exactly [`key_length`](Self::key_length) bytes.
    /// * `iv` - Exactly the IV length when the algorithm uses one; ignored
    ///   otherwise.
    /// * `engine` - Optional implementation source for the algorithm.
    ///
    /// # Errors
    ///
    /// - [`CipherError::ContractViolation`] for `KeepPrevious` on a context
    ///   that was never initialized.
    /// - [`CipherError::InvalidKeyLength`] / [`CipherError::InvalidIvLength`]
    ///   when the inputs do not match; the context is left unchanged.
    /// - [`CipherError::Crypto`] or [`CipherError::UnknownAlgorithm`] when the
    ///   native layer rejects the binding or the key.
    pub fn initialize(
        &mut self,
        algorithm: &CipherAlgorithm,
        direction: impl Into<InitDirection>,
        key: &[u8],
        iv: Option<&[u8]>,
        engine: Option<&B::Engine>,
    ) -> Result<(), CipherError> {
        let direction = match direction.into() {
            InitDirection::Encrypt => Direction::Encrypt,
            InitDirection::Decrypt => Direction::Decrypt,
            InitDirection::KeepPrevious => self.direction.ok_or(CipherError::ContractViolation(
                "KeepPrevious direction on a context that was never initialized",
            ))?,
        };

        let rebind = engine.is_some()
            || !self
                .algorithm
                .as_ref()
                .is_some_and(|bound| bound.same_algorithm(algorithm));

        let (key_length, iv_length) = if rebind {
            (algorithm.key_length(), algorithm.iv_length())
        } else {
            (self.native.key_length(), self.native.iv_length())
        };

        if key.len() != key_length {
            Err(CipherError::InvalidKeyLength {
                expected: key_length,
                actual: key.len(),
            })?;
        }
        let iv = if iv_length == 0 {
            None
        } else {
            match iv {
                Some(iv) if iv.len() == iv_length => Some(iv),
                _ => Err(CipherError::InvalidIvLength {
                    expected: iv_length,
                    actual: iv.map_or(0, <[u8]>::len),
                })?,
            }
        };

        if rebind {
            if let Err(err) = self.native.bind(algorithm, direction, engine) {
                self.algorithm = None;
                self.stage = ContextStage::Empty;
                return Err(err);
            }
            self.algorithm = Some(algorithm.clone());
            self.padding = true;
            tracing::debug!(algorithm = %algorithm, ?direction, "cipher bound");
        }

        if let Err(err) = self.native.init(direction, key, iv) {
            self.stage = ContextStage::Failed;
            return Err(err);
        }

        self.direction = Some(direction);
        self.stage = ContextStage::Initialized;
        tracing::debug!(algorithm = %algorithm, ?direction, "cipher initialized");
        Ok(())
    }

    /// Enables or disables PKCS#7 padding for the current and later streams.
    ///
    /// With padding disabled, the total input of a stream must be a multiple
    /// of [`block_size`](Self::block_size) or `finalize` fails.
    pub fn set_padding(&mut self, enabled: bool) -> Result<(), CipherError> {
        self.bound()?;
        self.native.set_padding(enabled);
        self.padding = enabled;
        Ok(())
    }

    /// Whether PKCS#7 padding is enabled.
    pub fn padding(&self) -> bool {
        self.padding
    }

    /// Key length the next `initialize` expects.
    ///
    /// For fixed-length algorithms this equals the algorithm key length.
    pub fn key_length(&self) -> Result<usize, CipherError> {
        self.bound()?;
        Ok(self.native.key_length())
    }

    /// Changes the key length of a variable-key-length algorithm.
    ///
    /// The native key is discarded, so the context moves to
    /// [`ContextStage::Unkeyed`] and `update`/`finalize` are rejected until the
    /// next `initialize`.
    ///
    /// # Errors
    ///
    /// - [`CipherError::ContractViolation`] if the bound algorithm has a fixed
    ///   key length or a stream is in progress.
    /// - [`CipherError::Crypto`] if the native layer rejects `len`.
    pub fn set_key_length(&mut self, len: usize) -> Result<(), CipherError> {
        let algorithm = self.bound()?;
        if !algorithm.variable_key_length() {
            Err(CipherError::ContractViolation(
                "key length is fixed for this algorithm",
            ))?;
        }
        if self.stage == ContextStage::Streaming {
            Err(CipherError::ContractViolation(
                "key length cannot change while a stream is in progress",
            ))?;
        }
        self.native.set_key_length(len)?;
        self.stage = ContextStage::Unkeyed;
        tracing::debug!(len, "key length set");
        Ok(())
    }

    /// IV length the next `initialize` expects.
    pub fn iv_length(&self) -> Result<usize, CipherError> {
        self.bound()?;
        Ok(self.native.iv_length())
    }

    /// Block size of the bound algorithm.
    pub fn block_size(&self) -> Result<usize, CipherError> {
        self.bound()?;
        Ok(self.native.block_size())
    }

    /// Sets an algorithm-specific integer parameter.
    ///
    /// # Safety
    ///
    /// The native control is called with a null pointer argument. `ctrl` must
    /// be a control that does not dereference its pointer argument.
    pub unsafe fn ctrl_set(&mut self, ctrl: i32, value: i32) -> Result<(), CipherError> {
        self.bound()?;
        // SAFETY: forwarded to the caller.
        unsafe { self.native.ctrl(ctrl, value, ptr::null_mut()) }
    }

    /// Reads an algorithm-specific parameter into a value of type `T`.
    ///
    /// The native control receives `size_of::<T>()` as its integer argument
    /// and a pointer to a default-initialized `T`.
    ///
    /// # Safety
    ///
    /// `T` must be exactly the type the native implementation writes for
    /// `ctrl` (e.g. `[u8; 16]` for a 16-byte AEAD tag). The size is not
    /// validated here.
    pub unsafe fn ctrl_get<T: Copy + Default>(&mut self, ctrl: i32) -> Result<T, CipherError> {
        self.bound()?;
        let mut value = T::default();
        let arg = c_int::try_from(mem::size_of::<T>())
            .map_err(|_| CipherError::ContractViolation("control output type too large"))?;
        // SAFETY: `value` is a live, writable `T`; the caller guarantees the
        // native side writes no more than `size_of::<T>()` bytes.
        unsafe {
            self.native
                .ctrl(ctrl, arg, (&mut value as *mut T).cast::<c_void>())?
        };
        Ok(value)
    }

    /// Sets the IV length of an AEAD algorithm.
    ///
    /// Takes effect on the next `initialize` with the same algorithm.
    pub fn set_iv_length(&mut self, len: usize) -> Result<(), CipherError> {
        self.aead()?;
        if c_int::try_from(len).is_err() {
            Err(CipherError::ContractViolation("IV length out of range"))?;
        }
        self.native.set_iv_length(len)
    }

    /// Copies the authentication tag of a finished encryption into `tag`.
    ///
    /// The tag length is `tag.len()`.
    pub fn aead_tag(&mut self, tag: &mut [u8]) -> Result<(), CipherError> {
        self.aead()?;
        if self.stage != ContextStage::Finalized || self.direction != Some(Direction::Encrypt) {
            Err(CipherError::ContractViolation(
                "tag is only available after finalizing an encryption",
            ))?;
        }
        if c_int::try_from(tag.len()).is_err() {
            Err(CipherError::ContractViolation("tag length out of range"))?;
        }
        self.native.tag(tag)
    }

    /// Sets the tag a decryption is verified against in `finalize`.
    pub fn set_aead_tag(&mut self, tag: &[u8]) -> Result<(), CipherError> {
        self.aead()?;
        if !matches!(
            self.stage,
            ContextStage::Initialized | ContextStage::Streaming
        ) || self.direction != Some(Direction::Decrypt)
        {
            Err(CipherError::ContractViolation(
                "tag can only be set on a decryption stream before finalize",
            ))?;
        }
        if c_int::try_from(tag.len()).is_err() {
            Err(CipherError::ContractViolation("tag length out of range"))?;
        }
        self.native.set_tag(tag)
    }

    /// Output capacity `update` needs for `input_len` bytes of input.
    ///
    /// `input_len + block_size - 1` when encrypting and
    /// `input_len + block_size` when decrypting with a block cipher;
    /// `input_len` for stream and AEAD modes. Key-wrap modes get
    /// `input_len + 2 * block_size`, enough for the integrity block plus the
    /// RFC 5649 padding.
    pub fn update_capacity(&self, input_len: usize) -> Result<usize, CipherError> {
        let algorithm = self.bound()?;
        let block_size = self.native.block_size();
        if algorithm.is_wrap() {
            return Ok(input_len + 2 * block_size);
        }
        if block_size <= 1 {
            return Ok(input_len);
        }
        Ok(match self.direction {
            Some(Direction::Decrypt) => input_len + block_size,
            _ => input_len + block_size - 1,
        })
    }

    /// Output capacity `finalize` needs.
    pub fn final_capacity(&self) -> Result<usize, CipherError> {
        self.bound()?;
        let block_size = self.native.block_size();
        Ok(if block_size <= 1 { 0 } else { block_size })
    }

    /// Processes `input` and writes the produced bytes to the front of
    /// `output`.
    ///
    /// # Returns
    ///
    /// Number of bytes written. It may be smaller than `input.len()` while a
    /// partial block is buffered.
    ///
    /// # Errors
    ///
    /// - [`CipherError::ContractViolation`] outside an initialized stream.
    /// - [`CipherError::OutputTooSmall`] if `output` is shorter than
    ///   [`update_capacity`](Self::update_capacity); nothing is processed.
    /// - [`CipherError::Crypto`] on native failure; the stream becomes
    ///   unusable until re-initialized.
    pub fn update(&mut self, output: &mut [u8], input: &[u8]) -> Result<usize, CipherError> {
        if !matches!(
            self.stage,
            ContextStage::Initialized | ContextStage::Streaming
        ) {
            Err(CipherError::ContractViolation(
                "update called outside an initialized stream",
            ))?;
        }
        let required = self.update_capacity(input.len())?;
        if output.len() < required {
            Err(CipherError::OutputTooSmall {
                required,
                available: output.len(),
            })?;
        }

        // SAFETY: `output` holds at least `update_capacity(input.len())` bytes.
        let result = unsafe { self.native.update(input, output) };
        match result {
            Ok(written) => {
                self.stage = ContextStage::Streaming;
                tracing::trace!(input = input.len(), written, "cipher update");
                Ok(written)
            }
            Err(err) => {
                self.stage = ContextStage::Failed;
                Err(err)
            }
        }
    }

    /// Flushes the stream, applying or verifying padding.
    ///
    /// # Returns
    ///
    /// Number of bytes written; `0` is a valid count. Failures are never
    /// reported through the count.
    ///
    /// # Errors
    ///
    /// - [`CipherError::ContractViolation`] outside an initialized stream,
    ///   including a second `finalize` without `initialize` in between.
    /// - [`CipherError::OutputTooSmall`] if `output` is shorter than
    ///   [`final_capacity`](Self::final_capacity).
    /// - [`CipherError::Padding`] when decryption padding or the AEAD tag does
    ///   not verify. With padding on, a truncated ciphertext (not a multiple of
    ///   the block size) also lands here.
    /// - [`CipherError::Crypto`] for any other native failure, such as
    ///   unpadded input that is not a multiple of the block size.
    pub fn finalize(&mut self, output: &mut [u8]) -> Result<usize, CipherError> {
        match self.stage {
            ContextStage::Initialized | ContextStage::Streaming => {}
            ContextStage::Finalized => Err(CipherError::ContractViolation(
                "finalize called twice without initialize",
            ))?,
            _ => Err(CipherError::ContractViolation(
                "finalize called outside an initialized stream",
            ))?,
        }
        let required = self.final_capacity()?;
        if output.len() < required {
            Err(CipherError::OutputTooSmall {
                required,
                available: output.len(),
            })?;
        }

        match self.native.finalize(output) {
            Ok(written) => {
                self.stage = ContextStage::Finalized;
                tracing::trace!(written, "cipher finalized");
                Ok(written)
            }
            Err(err) => {
                self.stage = ContextStage::Failed;
                Err(err)
            }
        }
    }

    /// Runs `input` through `update` and `finalize` and returns the output.
    pub fn crypt_vec(&mut self, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut output = vec![0u8; self.update_capacity(input.len())? + self.final_capacity()?];
        let mut count = self.update(&mut output, input)?;
        count += self.finalize(&mut output[count..])?;
        output.truncate(count);
        Ok(output)
    }

    /// Algorithm bound by the last `initialize`.
    pub fn algorithm(&self) -> Result<&CipherAlgorithm, CipherError> {
        self.bound()
    }

    /// Direction of the last successful `initialize`.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> ContextStage {
        self.stage
    }

    /// Native backend object.
    pub fn native(&self) -> &B {
        &self.native
    }

    /// Mutable native backend object.
    ///
    /// Changes made through it bypass the lifecycle tracking of this context.
    pub fn native_mut(&mut self) -> &mut B {
        &mut self.native
    }

    fn bound(&self) -> Result<&CipherAlgorithm, CipherError> {
        self.algorithm.as_ref().ok_or(CipherError::ContractViolation(
            "no algorithm bound; call initialize first",
        ))
    }

    fn aead(&self) -> Result<&CipherAlgorithm, CipherError> {
        let algorithm = self.bound()?;
        if !algorithm.is_aead() {
            Err(CipherError::ContractViolation(
                "bound algorithm is not an AEAD cipher",
            ))?;
        }
        Ok(algorithm)
    }
}

impl<B: NativeCipher> fmt::Debug for CipherContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherContext")
            .field("algorithm", &self.algorithm.as_ref().map(CipherAlgorithm::name))
            .field("direction", &self.direction)
            .field("padding", &self.padding)
            .field("stage", &self.stage)
            .finish()
    }
}

#[cfg(test)]
mod tests;

// Copyright (C) Microsoft Corporation. All rights reserved.

use thiserror::Error;

/// Errors returned by cipher contexts and algorithm lookups.
///
/// Native failures keep the code reported by the native library so it can be
/// turned into a readable message with [`crate::error_string`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The native library reported a failure.
    ///
    /// `code` is the first error queued by the native library, or `0` when
    /// the call failed without queueing one.
    #[error("native cipher operation failed (code {code:#x}): {reason}")]
    Crypto {
        /// Native error code.
        code: u64,
        /// Reason string reported alongside the code.
        reason: String,
    },

    /// Padding or authentication tag verification failed while finalizing a
    /// decryption. The input is corrupt or was produced with a different key.
    #[error("padding or tag verification failed")]
    Padding,

    /// A method was called in a state that the context lifecycle forbids.
    #[error("contract violation: {0}")]
    ContractViolation(&'static str),

    /// No native implementation is registered under the requested name.
    #[error("unknown cipher algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The key does not have the length the context is configured for.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Length the context expects.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// The IV does not have the length the context is configured for.
    #[error("invalid IV length: expected {expected} bytes, got {actual}")]
    InvalidIvLength {
        /// Length the context expects.
        expected: usize,
        /// Length that was supplied (`0` when no IV was given).
        actual: usize,
    },

    /// The output buffer cannot hold what the native call may write.
    #[error("output buffer too small: {required} bytes required, {available} available")]
    OutputTooSmall {
        /// Capacity the native call may use.
        required: usize,
        /// Capacity that was supplied.
        available: usize,
    },

    /// The requested engine could not be loaded.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),
}

// Copyright (C) Microsoft Corporation. All rights reserved.

//! Read-only description of a native cipher algorithm.

use std::fmt;

use super::*;

/// Immutable descriptor of a cipher algorithm resolved from the native
/// algorithm registry.
///
/// The descriptor carries no native handle. Contexts resolve the
/// implementation again when they bind it, so a descriptor may be cloned and
/// shared freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherAlgorithm {
    name: String,
    nid: i32,
    key_length: usize,
    iv_length: usize,
    block_size: usize,
    variable_key_length: bool,
    aead: bool,
    wrap: bool,
}

impl CipherAlgorithm {
    /// Builds a descriptor from values reported by a native backend.
    ///
    /// # Arguments
    ///
    /// * `name` - Name the backend can resolve the algorithm by.
    /// * `nid` - Native numeric identifier, `0` when the backend has none.
    /// * `key_length` - Default key length in bytes.
    /// * `iv_length` - IV length in bytes, `0` when no IV is used.
    /// * `block_size` - Block size in bytes, `1` for stream modes.
    pub fn new(
        name: impl Into<String>,
        nid: i32,
        key_length: usize,
        iv_length: usize,
        block_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            nid,
            key_length,
            iv_length,
            block_size,
            variable_key_length: false,
            aead: false,
            wrap: false,
        }
    }

    /// Marks the key length as configurable per context.
    pub fn with_variable_key_length(mut self, variable: bool) -> Self {
        self.variable_key_length = variable;
        self
    }

    /// Marks the algorithm as authenticated (tag produced on finalize).
    pub fn with_aead(mut self, aead: bool) -> Self {
        self.aead = aead;
        self
    }

    /// Marks the algorithm as a key-wrap mode (RFC 3394 / RFC 5649).
    ///
    /// Wrap modes emit the whole wrapped value from a single `update`, which
    /// is up to two blocks longer than the input.
    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    /// Resolves an algorithm by name from the default native backend.
    ///
    /// Names are those of the native registry, e.g. `AES-128-CBC`,
    /// `ChaCha20` or `DES-EDE3-CBC`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::UnknownAlgorithm`] when no implementation is
    /// available in this build.
    pub fn from_name(name: &str) -> Result<Self, CipherError> {
        DefaultNative::lookup(name, None)
    }

    /// Resolves an algorithm by its native numeric identifier.
    pub fn from_nid(nid: i32) -> Result<Self, CipherError> {
        DefaultNative::lookup_nid(nid)
    }

    /// Name used to resolve the algorithm.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native numeric identifier (`0` when none).
    pub fn nid(&self) -> i32 {
        self.nid
    }

    /// Default key length in bytes.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// IV length in bytes.
    pub fn iv_length(&self) -> usize {
        self.iv_length
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Whether an IV must be supplied on initialize.
    pub fn requires_iv(&self) -> bool {
        self.iv_length > 0
    }

    /// Whether the key length may be changed per context.
    pub fn variable_key_length(&self) -> bool {
        self.variable_key_length
    }

    /// Whether the algorithm authenticates its output with a tag.
    pub fn is_aead(&self) -> bool {
        self.aead
    }

    /// Whether the algorithm is a key-wrap mode.
    pub fn is_wrap(&self) -> bool {
        self.wrap
    }

    /// Whether two descriptors name the same native implementation.
    pub(crate) fn same_algorithm(&self, other: &CipherAlgorithm) -> bool {
        if self.nid != 0 || other.nid != 0 {
            self.nid == other.nid
        } else {
            self.name.eq_ignore_ascii_case(&other.name)
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

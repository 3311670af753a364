// Copyright (C) Microsoft Corporation. All rights reserved.

mod lifecycle_tests;
mod vector_tests;

use super::*;

/// Runs `input` through a fresh context in one `update` + `finalize`.
pub(crate) fn crypt(
    algorithm: &CipherAlgorithm,
    direction: Direction,
    key: &[u8],
    iv: Option<&[u8]>,
    padding: bool,
    input: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let mut ctx = CipherContext::<DefaultNative>::new()?;
    ctx.initialize(algorithm, direction, key, iv, None)?;
    ctx.set_padding(padding)?;
    ctx.crypt_vec(input)
}

/// Deterministic, non-repeating test data.
pub(crate) fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Key and IV of the right size for `algorithm`.
pub(crate) fn key_iv(algorithm: &CipherAlgorithm) -> (Vec<u8>, Option<Vec<u8>>) {
    let key = pattern(algorithm.key_length(), 0x11);
    let iv = algorithm
        .requires_iv()
        .then(|| pattern(algorithm.iv_length(), 0x77));
    (key, iv)
}

/// Context keyed for AES-128-CBC with all-zero key and IV.
pub(crate) fn aes_cbc_context(direction: Direction) -> CipherContext {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();
    ctx.initialize(&algorithm, direction, &[0u8; 16], Some(&[0u8; 16]), None)
        .unwrap();
    ctx
}

// Copyright (C) Microsoft Corporation. All rights reserved.

use test_with_tracing::test;

use super::*;

#[test]
fn test_empty_context_rejects_everything() {
    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();
    assert_eq!(ctx.stage(), ContextStage::Empty);
    assert_eq!(ctx.direction(), None);

    assert!(matches!(
        ctx.set_padding(false),
        Err(CipherError::ContractViolation(_))
    ));
    assert!(matches!(
        ctx.key_length(),
        Err(CipherError::ContractViolation(_))
    ));
    assert!(matches!(
        ctx.set_key_length(16),
        Err(CipherError::ContractViolation(_))
    ));
    assert!(matches!(
        ctx.algorithm(),
        Err(CipherError::ContractViolation(_))
    ));

    let mut out = [0u8; 64];
    assert!(matches!(
        ctx.update(&mut out, b"abc"),
        Err(CipherError::ContractViolation(_))
    ));
    assert!(matches!(
        ctx.finalize(&mut out),
        Err(CipherError::ContractViolation(_))
    ));
    assert_eq!(ctx.stage(), ContextStage::Empty);
}

#[test]
fn test_keep_previous_without_history() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();

    let result = ctx.initialize(
        &algorithm,
        InitDirection::KeepPrevious,
        &[0u8; 16],
        Some(&[0u8; 16]),
        None,
    );
    assert!(matches!(result, Err(CipherError::ContractViolation(_))));
    assert_eq!(ctx.stage(), ContextStage::Empty);
}

#[test]
fn test_stage_transitions() {
    let mut ctx = aes_cbc_context(Direction::Encrypt);
    assert_eq!(ctx.stage(), ContextStage::Initialized);
    assert_eq!(ctx.direction(), Some(Direction::Encrypt));
    assert!(ctx.padding());

    let mut out = [0u8; 64];
    ctx.update(&mut out, &[1u8; 20]).unwrap();
    assert_eq!(ctx.stage(), ContextStage::Streaming);

    ctx.finalize(&mut out).unwrap();
    assert_eq!(ctx.stage(), ContextStage::Finalized);
}

#[test]
fn test_double_finalize() {
    let mut ctx = aes_cbc_context(Direction::Encrypt);
    let mut out = [0u8; 16];

    assert_eq!(ctx.finalize(&mut out).unwrap(), 16);
    assert!(matches!(
        ctx.finalize(&mut out),
        Err(CipherError::ContractViolation(_))
    ));
}

#[test]
fn test_update_after_finalize() {
    let mut ctx = aes_cbc_context(Direction::Encrypt);
    let mut out = [0u8; 64];

    ctx.update(&mut out, b"hello").unwrap();
    ctx.finalize(&mut out).unwrap();
    assert!(matches!(
        ctx.update(&mut out, b"world"),
        Err(CipherError::ContractViolation(_))
    ));
    assert_eq!(ctx.stage(), ContextStage::Finalized);
}

#[test]
fn test_reinitialize_keep_previous() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let key = [7u8; 16];
    let iv = [9u8; 16];
    let plaintext = pattern(40, 1);

    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();
    ctx.initialize(&algorithm, Direction::Encrypt, &key, Some(&iv), None)
        .unwrap();
    let first = ctx.crypt_vec(&plaintext).unwrap();

    // Re-arm with the same key and IV, reusing the direction.
    ctx.initialize(
        &algorithm,
        InitDirection::KeepPrevious,
        &key,
        Some(&iv),
        None,
    )
    .unwrap();
    assert_eq!(ctx.direction(), Some(Direction::Encrypt));
    let second = ctx.crypt_vec(&plaintext).unwrap();
    assert_eq!(first, second);

    // Switch direction on the same context.
    ctx.initialize(&algorithm, Direction::Decrypt, &key, Some(&iv), None)
        .unwrap();
    assert_eq!(ctx.crypt_vec(&first).unwrap(), plaintext);
}

#[test]
fn test_reinitialize_mid_stream_discards_partial_block() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let (key, iv) = key_iv(&algorithm);
    let plaintext = pattern(32, 4);

    let expected = crypt(
        &algorithm,
        Direction::Encrypt,
        &key,
        iv.as_deref(),
        true,
        &plaintext,
    )
    .unwrap();

    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();
    ctx.initialize(&algorithm, Direction::Encrypt, &key, iv.as_deref(), None)
        .unwrap();
    let mut out = [0u8; 64];
    ctx.update(&mut out, &[0xee; 5]).unwrap();

    ctx.initialize(&algorithm, Direction::Encrypt, &key, iv.as_deref(), None)
        .unwrap();
    assert_eq!(ctx.stage(), ContextStage::Initialized);
    assert_eq!(ctx.crypt_vec(&plaintext).unwrap(), expected);
}

#[test]
fn test_padding_survives_reinitialize_with_same_algorithm() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let mut ctx = aes_cbc_context(Direction::Encrypt);
    ctx.set_padding(false).unwrap();

    ctx.initialize(
        &algorithm,
        Direction::Encrypt,
        &[0u8; 16],
        Some(&[0u8; 16]),
        None,
    )
    .unwrap();
    assert!(!ctx.padding());
    assert_eq!(ctx.crypt_vec(&[0u8; 32]).unwrap().len(), 32);

    // A different algorithm starts from defaults again.
    let other = CipherAlgorithm::from_name("AES-256-CBC").unwrap();
    ctx.initialize(
        &other,
        Direction::Encrypt,
        &[0u8; 32],
        Some(&[0u8; 16]),
        None,
    )
    .unwrap();
    assert!(ctx.padding());
    assert_eq!(ctx.crypt_vec(&[0u8; 32]).unwrap().len(), 48);
    assert_eq!(ctx.algorithm().unwrap().name(), "AES-256-CBC");
}

#[test]
fn test_invalid_key_and_iv_lengths() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();

    let result = ctx.initialize(
        &algorithm,
        Direction::Encrypt,
        &[0u8; 15],
        Some(&[0u8; 16]),
        None,
    );
    assert_eq!(
        result,
        Err(CipherError::InvalidKeyLength {
            expected: 16,
            actual: 15
        })
    );

    let result = ctx.initialize(&algorithm, Direction::Encrypt, &[0u8; 16], None, None);
    assert_eq!(
        result,
        Err(CipherError::InvalidIvLength {
            expected: 16,
            actual: 0
        })
    );

    let result = ctx.initialize(
        &algorithm,
        Direction::Encrypt,
        &[0u8; 16],
        Some(&[0u8; 8]),
        None,
    );
    assert_eq!(
        result,
        Err(CipherError::InvalidIvLength {
            expected: 16,
            actual: 8
        })
    );

    // Nothing was bound by the rejected calls.
    assert_eq!(ctx.stage(), ContextStage::Empty);
}

#[test]
fn test_iv_ignored_when_not_used() {
    let algorithm = CipherAlgorithm::from_name("AES-128-ECB").unwrap();
    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();
    ctx.initialize(
        &algorithm,
        Direction::Encrypt,
        &[0u8; 16],
        Some(&[0u8; 3]),
        None,
    )
    .unwrap();
    assert_eq!(ctx.iv_length().unwrap(), 0);
    assert_eq!(ctx.crypt_vec(&[0u8; 16]).unwrap().len(), 32);
}

#[test]
fn test_output_too_small() {
    let mut ctx = aes_cbc_context(Direction::Encrypt);
    assert_eq!(ctx.update_capacity(20).unwrap(), 35);
    assert_eq!(ctx.final_capacity().unwrap(), 16);

    let mut out = [0u8; 34];
    assert_eq!(
        ctx.update(&mut out, &[0u8; 20]),
        Err(CipherError::OutputTooSmall {
            required: 35,
            available: 34
        })
    );
    // The rejected call did not start the stream.
    assert_eq!(ctx.stage(), ContextStage::Initialized);

    let mut out = [0u8; 15];
    assert_eq!(
        ctx.finalize(&mut out),
        Err(CipherError::OutputTooSmall {
            required: 16,
            available: 15
        })
    );
    assert_eq!(ctx.stage(), ContextStage::Initialized);

    let decrypt = aes_cbc_context(Direction::Decrypt);
    assert_eq!(decrypt.update_capacity(32).unwrap(), 48);
}

#[test]
fn test_stream_cipher_capacity() {
    let algorithm = CipherAlgorithm::from_name("ChaCha20").unwrap();
    let (key, iv) = key_iv(&algorithm);
    let mut ctx = CipherContext::<DefaultNative>::new().unwrap();
    ctx.initialize(&algorithm, Direction::Encrypt, &key, iv.as_deref(), None)
        .unwrap();

    assert_eq!(ctx.block_size().unwrap(), 1);
    assert_eq!(ctx.update_capacity(100).unwrap(), 100);
    assert_eq!(ctx.final_capacity().unwrap(), 0);

    let mut out = [0u8; 10];
    assert_eq!(ctx.update(&mut out, &[1u8; 10]).unwrap(), 10);
    assert_eq!(ctx.finalize(&mut []).unwrap(), 0);
}

#[test]
fn test_debug_output() {
    let ctx = aes_cbc_context(Direction::Decrypt);
    let text = format!("{ctx:?}");
    assert!(text.contains("AES-128-CBC"));
    assert!(text.contains("Initialized"));
}

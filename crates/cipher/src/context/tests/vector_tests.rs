// Copyright (C) Microsoft Corporation. All rights reserved.

use test_with_tracing::test;

use super::*;

// NIST SP 800-38A F.2.1 / F.5.5, first two blocks.
const SP800_38A_KEY_128: &str = "2b7e151628aed2a6abf7158809cf4f3c";
const SP800_38A_KEY_256: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
const SP800_38A_PLAINTEXT: &str =
    "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51";

#[test]
fn test_aes_128_cbc_known_answer() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let key = hex::decode(SP800_38A_KEY_128).unwrap();
    let iv = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
    let plaintext = hex::decode(SP800_38A_PLAINTEXT).unwrap();

    // Without padding the output is the raw SP 800-38A ciphertext.
    let ciphertext = crypt(
        &algorithm,
        Direction::Encrypt,
        &key,
        Some(&iv),
        false,
        &plaintext,
    )
    .unwrap();
    assert_eq!(
        hex::encode(&ciphertext),
        "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2"
    );

    // With padding a full block of 0x10 is appended.
    let ciphertext = crypt(
        &algorithm,
        Direction::Encrypt,
        &key,
        Some(&iv),
        true,
        &plaintext,
    )
    .unwrap();
    assert_eq!(
        hex::encode(&ciphertext),
        "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2\
         55e21d7100b988ffec32feeafaf23538"
    );

    let decrypted = crypt(
        &algorithm,
        Direction::Decrypt,
        &key,
        Some(&iv),
        true,
        &ciphertext,
    )
    .unwrap();
    assert_eq!(decrypted, plaintext);
}

#[test]
fn test_aes_256_ctr_known_answer() {
    let algorithm = CipherAlgorithm::from_name("AES-256-CTR").unwrap();
    let key = hex::decode(SP800_38A_KEY_256).unwrap();
    let counter = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap();
    let plaintext = hex::decode(SP800_38A_PLAINTEXT).unwrap();

    let ciphertext = crypt(
        &algorithm,
        Direction::Encrypt,
        &key,
        Some(&counter),
        true,
        &plaintext,
    )
    .unwrap();
    assert_eq!(
        hex::encode(ciphertext),
        "601ec313775789a5b7a7f504bbf3d228f443e3ca4d62b59aca84e990cacaf5c5"
    );
}

#[test]
fn test_algorithm_descriptors() {
    let cbc = CipherAlgorithm::from_name("AES-256-CBC").unwrap();
    assert_eq!(cbc.key_length(), 32);
    assert_eq!(cbc.iv_length(), 16);
    assert_eq!(cbc.block_size(), 16);
    assert!(cbc.requires_iv());
    assert!(!cbc.variable_key_length());
    assert!(!cbc.is_aead());

    let ecb = CipherAlgorithm::from_name("AES-128-ECB").unwrap();
    assert!(!ecb.requires_iv());

    let chacha = CipherAlgorithm::from_name("ChaCha20").unwrap();
    assert_eq!(chacha.key_length(), 32);
    assert_eq!(chacha.iv_length(), 16);
    assert_eq!(chacha.block_size(), 1);

    let gcm = CipherAlgorithm::from_name("AES-128-GCM").unwrap();
    assert!(gcm.is_aead());
    assert_eq!(gcm.iv_length(), 12);

    // Lookup by identifier lands on the same implementation.
    let by_nid = CipherAlgorithm::from_nid(cbc.nid()).unwrap();
    assert_eq!(by_nid.nid(), cbc.nid());
    assert_eq!(by_nid.key_length(), 32);
    assert!(by_nid.same_algorithm(&cbc));
}

#[test]
fn test_unknown_algorithm() {
    let result = CipherAlgorithm::from_name("NOT-A-CIPHER");
    assert!(matches!(result, Err(CipherError::UnknownAlgorithm(name)) if name == "NOT-A-CIPHER"));

    let result = CipherAlgorithm::from_nid(0);
    assert!(matches!(result, Err(CipherError::UnknownAlgorithm(_))));
}

#[test]
fn test_error_string() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let (key, iv) = key_iv(&algorithm);
    let err = crypt(
        &algorithm,
        Direction::Encrypt,
        &key,
        iv.as_deref(),
        false,
        &[0u8; 5],
    )
    .unwrap_err();

    let CipherError::Crypto { code, reason } = err else {
        panic!("expected a native error, got {err:?}");
    };
    if code != 0 {
        let text = crate::error_string(code);
        assert!(text.starts_with(&format!("error:{code:08X}:")), "{text}");
        assert!(text.ends_with(&reason), "{text}");
    }
}

#[test]
fn test_zero_key_scenario() {
    let algorithm = CipherAlgorithm::from_name("AES-128-CBC").unwrap();
    let key = [0u8; 16];
    let iv = [0u8; 16];
    let plaintext = [0x41u8; 32];
    let unpadded = "b49cbf19d357e6e1f6845c30fd5b63e36f9f769a9caa0313ba178c1c2e0f6076";

    for (padding, expected) in [
        (false, unpadded.to_string()),
        (true, format!("{unpadded}aa327e7125309768fde7f263cc304a85")),
    ] {
        let ciphertext = crypt(
            &algorithm,
            Direction::Encrypt,
            &key,
            Some(&iv),
            padding,
            &plaintext,
        )
        .unwrap();
        assert_eq!(hex::encode(&ciphertext), expected);

        let decrypted = crypt(
            &algorithm,
            Direction::Decrypt,
            &key,
            Some(&iv),
            padding,
            &ciphertext,
        )
        .unwrap();
        assert_eq!(decrypted, plaintext);
    }
}

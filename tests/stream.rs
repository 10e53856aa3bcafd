//! Streaming behavior: the keystream a cipher produces must depend only on
//! (variant, key, nonce) and the number of bytes already processed, never
//! on how callers partition their input.

use chacha20_stream::{
    ChaCha20, ChaCha20Legacy, StreamCipher, XChaCha20, KEY_SIZE, LEGACY_NONCE_SIZE, NONCE_SIZE,
    XCHACHA_NONCE_SIZE,
};

const MIB: usize = 1 << 20;

// Call sizes straddling the block (64) and double-block (128) boundaries.
const PIECES: &[usize] = &[1, 63, 64, 65, 127, 128, 129, 255, 256, 257, 8191, 8192, 8193];

const VARIANTS: usize = 3;

fn make(variant: usize) -> Box<dyn StreamCipher> {
    let key = [7u8; KEY_SIZE];
    match variant {
        0 => Box::new(ChaCha20::new(&key, &[3u8; NONCE_SIZE]).unwrap()),
        1 => Box::new(ChaCha20Legacy::new(&key, &[3u8; LEGACY_NONCE_SIZE]).unwrap()),
        _ => Box::new(XChaCha20::new(&key, &[3u8; XCHACHA_NONCE_SIZE]).unwrap()),
    }
}

fn fresh_ciphers() -> Vec<Box<dyn StreamCipher>> {
    (0..VARIANTS).map(make).collect()
}

/// Deterministic non-trivial plaintext.
fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

#[test]
fn chunked_calls_match_single_shot() {
    for (mut chunked, mut single) in fresh_ciphers().into_iter().zip(fresh_ciphers()) {
        let mut expected = vec![0u8; MIB];
        single.apply_keystream(&mut expected);

        let mut out = vec![0u8; MIB];
        let mut rest = out.as_mut_slice();
        let mut pieces = PIECES.iter().cycle();
        while !rest.is_empty() {
            let n = (*pieces.next().unwrap()).min(rest.len());
            let (head, tail) = rest.split_at_mut(n);
            chunked.apply_keystream(head);
            rest = tail;
        }

        assert_eq!(out, expected);
    }
}

#[test]
fn every_split_of_three_blocks_matches() {
    // All two-way splits of a three-block buffer, exhaustively.
    let len = 192;
    for variant in 0..VARIANTS {
        let mut expected = vec![0u8; len];
        make(variant).apply_keystream(&mut expected);

        for at in 0..=len {
            let mut cipher = make(variant);
            let mut out = vec![0u8; len];
            let (head, tail) = out.split_at_mut(at);
            cipher.apply_keystream(head);
            cipher.apply_keystream(tail);
            assert_eq!(out, expected, "split at {at}");
        }
    }
}

#[test]
fn extending_the_stream_never_changes_earlier_bytes() {
    let mut short = ChaCha20::new(&[7u8; KEY_SIZE], &[3u8; NONCE_SIZE]).unwrap();
    let mut long = ChaCha20::new(&[7u8; KEY_SIZE], &[3u8; NONCE_SIZE]).unwrap();

    let mut a = vec![0u8; 1000];
    short.apply_keystream(&mut a);

    let mut b = vec![0u8; 1500];
    long.apply_keystream(&mut b);

    assert_eq!(a, b[..1000]);
}

#[test]
fn applying_the_keystream_twice_is_the_identity() {
    let data = pattern(3000);

    for (mut enc, mut dec) in fresh_ciphers().into_iter().zip(fresh_ciphers()) {
        let mut buf = data.clone();
        enc.apply_keystream(&mut buf);
        assert_ne!(buf, data);
        dec.apply_keystream(&mut buf);
        assert_eq!(buf, data);
    }
}

#[test]
fn split_buffers_match_in_place() {
    let src = pattern(1000);

    for (mut split, mut in_place) in fresh_ciphers().into_iter().zip(fresh_ciphers()) {
        let mut dst = vec![0u8; 1000];
        split.xor_key_stream(&mut dst, &src);

        let mut buf = src.clone();
        in_place.apply_keystream(&mut buf);

        assert_eq!(dst, buf);
    }
}

#[test]
fn oversized_dst_suffix_is_untouched() {
    let src = pattern(100);
    let mut cipher = ChaCha20::new(&[7u8; KEY_SIZE], &[3u8; NONCE_SIZE]).unwrap();

    let mut dst = vec![0xaa; 150];
    cipher.xor_key_stream(&mut dst, &src);
    assert!(dst[100..].iter().all(|&b| b == 0xaa));
}

#[test]
#[should_panic(expected = "dst is shorter than src")]
fn short_dst_panics() {
    let mut cipher = ChaCha20::new(&[7u8; KEY_SIZE], &[3u8; NONCE_SIZE]).unwrap();
    let src = [0u8; 64];
    let mut dst = [0u8; 63];
    cipher.xor_key_stream(&mut dst, &src);
}

#[test]
fn zero_length_calls_are_a_no_op() {
    let mut interrupted = ChaCha20Legacy::new(&[7u8; KEY_SIZE], &[3u8; LEGACY_NONCE_SIZE]).unwrap();
    let mut straight = ChaCha20Legacy::new(&[7u8; KEY_SIZE], &[3u8; LEGACY_NONCE_SIZE]).unwrap();

    let mut a = vec![0u8; 100];
    interrupted.apply_keystream(&mut a[..50]);
    interrupted.apply_keystream(&mut []);
    interrupted.apply_keystream(&mut a[50..]);

    let mut b = vec![0u8; 100];
    straight.apply_keystream(&mut b);

    assert_eq!(a, b);
}

#[test]
fn repeated_calls_continue_the_stream() {
    let src = pattern(10_000);

    for (mut repeated, mut single) in fresh_ciphers().into_iter().zip(fresh_ciphers()) {
        let mut out = Vec::new();
        for _ in 0..5 {
            let mut dst = vec![0u8; src.len()];
            repeated.xor_key_stream(&mut dst, &src);
            out.extend_from_slice(&dst);
        }

        let mut expected = Vec::new();
        for _ in 0..5 {
            expected.extend_from_slice(&src);
        }
        single.apply_keystream(&mut expected);

        assert_eq!(out, expected);
    }
}

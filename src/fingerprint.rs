//! Derived views of public key fingerprints.
//!
//! The primary fingerprint format is `SHA256:` followed by base64, available as
//! [`Pubkey::fingerprint()`]. This module adds the other views that OpenSSH tooling shows:
//! the "bubblebabble" encoding of the SHA-1 digest and the "randomart" ASCII image that makes
//! fingerprints comparable at a glance.
use sha2::Digest as _;
use crate::pubkey::{Pubkey, KeyType};

/// Encode bytes in the bubblebabble format.
///
/// Bubblebabble encodes binary data as pronounceable five-letter words. The empty input encodes
/// as `"xexax"`.
pub fn bubblebabble(data: &[u8]) -> String {
    static VOWELS: &[u8] = b"aeiouy";
    static CONSONANTS: &[u8] = b"bcdfghklmnprstvzx";

    let rounds = data.len() / 2 + 1;
    let mut seed = 1usize;
    let mut out = String::with_capacity(rounds * 6 + 1);
    out.push('x');
    for i in 0..rounds {
        if i + 1 < rounds || data.len() % 2 != 0 {
            let byte = data[2 * i] as usize;
            out.push(VOWELS[(((byte >> 6) & 3) + seed) % 6] as char);
            out.push(CONSONANTS[(byte >> 2) & 15] as char);
            out.push(VOWELS[((byte & 3) + seed / 6) % 6] as char);
            if i + 1 < rounds {
                let byte2 = data[2 * i + 1] as usize;
                out.push(CONSONANTS[(byte2 >> 4) & 15] as char);
                out.push('-');
                out.push(CONSONANTS[byte2 & 15] as char);
                seed = (seed * 5 + byte * 7 + byte2) % 36;
            }
        } else {
            out.push(VOWELS[seed % 6] as char);
            out.push('x');
            out.push(VOWELS[seed / 6] as char);
        }
    }
    out.push('x');
    out
}

/// Compute the bubblebabble fingerprint of a public key.
///
/// This is the bubblebabble encoding of the SHA-1 digest of the encoded key, the same view that
/// `ssh-keygen -B` prints.
pub fn fingerprint_bubblebabble(pubkey: &Pubkey) -> String {
    let digest = sha1::Sha1::digest(pubkey.encode());
    bubblebabble(&digest)
}

const ART_WIDTH: usize = 17;
const ART_HEIGHT: usize = 9;

/// Compute the "randomart" image of a public key.
///
/// This is the ASCII image that OpenSSH shows in `VisualHostKey` mode, a "drunken bishop" walk
/// over the SHA-256 digest of the encoded key. Its only purpose is to make key fingerprints
/// easier to compare for humans. The result spans eleven lines including the frame.
pub fn fingerprint_randomart(pubkey: &Pubkey) -> String {
    let digest = sha2::Sha256::digest(pubkey.encode());
    let header = format!("[{}]", key_label(pubkey));
    let footer = "[SHA256]";
    randomart(&digest, &header, footer)
}

fn randomart(digest: &[u8], header: &str, footer: &str) -> String {
    static AUGMENTATION: &[u8] = b" .o+=*BOX@%&#/^SE";

    let mut field = [[0u8; ART_WIDTH]; ART_HEIGHT];
    let start = (ART_HEIGHT / 2, ART_WIDTH / 2);
    let (mut y, mut x) = start;
    for &byte in digest {
        let mut byte = byte;
        for _ in 0..4 {
            x = if byte & 0x1 != 0 { (x + 1).min(ART_WIDTH - 1) } else { x.saturating_sub(1) };
            y = if byte & 0x2 != 0 { (y + 1).min(ART_HEIGHT - 1) } else { y.saturating_sub(1) };
            if field[y][x] < (AUGMENTATION.len() - 3) as u8 {
                field[y][x] += 1;
            }
            byte >>= 2;
        }
    }
    field[start.0][start.1] = (AUGMENTATION.len() - 2) as u8;
    field[y][x] = (AUGMENTATION.len() - 1) as u8;

    let mut out = String::new();
    out.push_str(&frame_line(header));
    for row in &field {
        out.push('|');
        for &cell in row {
            out.push(AUGMENTATION[cell as usize] as char);
        }
        out.push_str("|\n");
    }
    out.push_str(&frame_line(footer));
    out
}

fn frame_line(text: &str) -> String {
    let text = if text.len() > ART_WIDTH { &text[..ART_WIDTH] } else { text };
    let fill = ART_WIDTH - text.len();
    let left = fill / 2;
    format!("+{}{}{}+\n", "-".repeat(left), text, "-".repeat(fill - left))
}

fn key_label(pubkey: &Pubkey) -> String {
    let name = match pubkey.key_type() {
        KeyType::Ed25519 => "ED25519",
        KeyType::Rsa => "RSA",
        KeyType::Dsa => "DSA",
        KeyType::EcdsaP256 | KeyType::EcdsaP384 | KeyType::EcdsaP521 => "ECDSA",
        KeyType::SkEd25519 => "ED25519-SK",
        KeyType::SkEcdsaP256 => "ECDSA-SK",
        KeyType::Xmss => "XMSS",
    };
    match key_bits(pubkey) {
        Some(bits) => format!("{} {}", name, bits),
        None => name.into(),
    }
}

fn key_bits(pubkey: &Pubkey) -> Option<usize> {
    use rsa::traits::PublicKeyParts as _;
    match pubkey.plain() {
        Pubkey::Ed25519(_) | Pubkey::SkEd25519(_) | Pubkey::Xmss(_) => Some(256),
        Pubkey::Rsa(pubkey) => Some(pubkey.pubkey.n().bits()),
        Pubkey::Dsa(pubkey) => Some(pubkey.pubkey.components().p().bits()),
        Pubkey::EcdsaP256(_) | Pubkey::SkEcdsaP256(_) => Some(256),
        Pubkey::EcdsaP384(_) => Some(384),
        Pubkey::EcdsaP521(_) => Some(521),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubblebabble_vectors() {
        // test vectors from the bubblebabble draft
        assert_eq!(bubblebabble(b""), "xexax");
        assert_eq!(bubblebabble(b"1234567890"), "xesef-disof-gytuf-katof-movif-baxux");
        assert_eq!(bubblebabble(b"Pineapple"), "xigak-nyryk-humil-bosek-sonax");
    }

    #[test]
    fn test_randomart_shape() {
        let art = randomart(&[0; 32], "[TEST]", "[SHA256]");
        let lines: Vec<&str> = art.lines().collect();
        assert_eq!(lines.len(), ART_HEIGHT + 2);
        for line in &lines {
            assert_eq!(line.len(), ART_WIDTH + 2);
        }
        assert!(lines[0].contains("[TEST]"));
        assert!(lines[ART_HEIGHT + 1].contains("[SHA256]"));
    }

    #[test]
    fn test_randomart_marks_start_and_end() {
        // both the header and the footer contain an 'S' of their own
        let art = randomart(&[0x55; 32], "[TEST]", "[SHA256]");
        let frame_s = "[TEST]".matches('S').count() + "[SHA256]".matches('S').count();
        assert_eq!(art.matches('S').count(), 1 + frame_s);
        assert!(art.contains('E'));
    }
}

//! Caesar cipher gadget.
//!
//! Letters are upper-cased and rotated within the 26-letter alphabet;
//! everything else passes through untouched. This is a puzzle device,
//! not a security primitive.

/// Prefix attached to every decryption result.
pub const DECRYPTION_PREFIX: &str = "Unencrypted message: ";

/// Encrypt plaintext by rotating each letter `shift` places forward.
pub fn encrypt(plaintext: &str, shift: i64) -> String {
    caesar_shift(plaintext, shift)
}

/// Decrypt ciphertext by rotating each letter `shift` places back.
///
/// The result carries [`DECRYPTION_PREFIX`].
pub fn decrypt(ciphertext: &str, shift: i64) -> String {
    let plaintext = caesar_shift(ciphertext, -shift);
    format!("{DECRYPTION_PREFIX}{plaintext}")
}

fn caesar_shift(text: &str, shift: i64) -> String {
    let offset = shift.rem_euclid(26) as u8;
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            let index = c.to_ascii_uppercase() as u8 - b'A';
            out.push((b'A' + (index + offset) % 26) as char);
        } else {
            out.extend(c.to_uppercase());
        }
    }

    out
}

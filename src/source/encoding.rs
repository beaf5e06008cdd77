use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::borrow::Cow;

/// Minimum share of NUL bytes on one parity for BOM-less UTF-16 detection.
const UTF16_NUL_RATIO: f32 = 0.4;

/// Maximum share of NUL bytes tolerated on the other parity.
const UTF16_OTHER_NUL_RATIO: f32 = 0.05;

/// Result of decoding a byte buffer.
#[derive(Debug)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static Encoding,
    /// True when at least one sequence was replaced with U+FFFD.
    pub had_errors: bool,
}

/// Detect the most likely encoding of `bytes`.
///
/// Returns the encoding and the length of any byte-order mark found at the
/// start of the buffer. Detection never fails: windows-1252 maps every byte
/// value, so it is the last resort.
pub fn resolve(bytes: &[u8]) -> (&'static Encoding, usize) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return (encoding, bom_len);
    }

    // NUL is valid UTF-8, so UTF-16 has to be ruled out first
    if let Some(encoding) = sniff_utf16(bytes) {
        return (encoding, 0);
    }

    if Encoding::utf8_valid_up_to(bytes) == bytes.len() {
        return (UTF_8, 0);
    }

    (WINDOWS_1252, 0)
}

/// Decode `bytes` with the detected encoding, replacing malformed sequences.
pub fn decode(bytes: &[u8]) -> Decoded<'_> {
    let (encoding, bom_len) = resolve(bytes);
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);

    Decoded {
        text,
        encoding,
        had_errors,
    }
}

/// Guess UTF-16 without a BOM from the distribution of NUL bytes.
///
/// Mostly-ASCII UTF-16LE text has a NUL in nearly every odd position and
/// almost none in even positions; big-endian is the mirror image.
fn sniff_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.len() < 4 || bytes.len() % 2 != 0 {
        return None;
    }

    let pairs = bytes.len() / 2;
    let (mut even_nuls, mut odd_nuls) = (0usize, 0usize);
    for pair in bytes.chunks_exact(2) {
        if pair[0] == 0 {
            even_nuls += 1;
        }
        if pair[1] == 0 {
            odd_nuls += 1;
        }
    }

    let even = even_nuls as f32 / pairs as f32;
    let odd = odd_nuls as f32 / pairs as f32;

    if odd >= UTF16_NUL_RATIO && even <= UTF16_OTHER_NUL_RATIO {
        Some(UTF_16LE)
    } else if even >= UTF16_NUL_RATIO && odd <= UTF16_OTHER_NUL_RATIO {
        Some(UTF_16BE)
    } else {
        None
    }
}

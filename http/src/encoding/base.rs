//! The RFC 4648 base-N encoding family.

use crate::{Error, Result};
use std::borrow::Cow;

const BASE64_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const BASE32_HEX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";
const BASE16_ALPHABET: &[u8] = b"0123456789ABCDEF";

/// A member of the RFC 4648 encoding family.
///
/// The family is parameterized on the encoded-group bit width and the
/// alphabet; every member shares one bit-shuffling algorithm.
///
/// ```
/// # use sorrel_http::encoding::BaseEncoding;
/// assert_eq!(BaseEncoding::base64().encode("Pony!"), "UG9ueSE=");
/// assert_eq!(BaseEncoding::base64_unpadded().encode("Pony!"), "UG9ueSE");
/// ```
#[derive(Debug, Clone)]
pub struct BaseEncoding {
    name: &'static str,
    alphabet: Cow<'static, [u8]>,
    /// bits carried by one encoded character
    bits: u32,
    pad: bool,
    padding: u8,
    /// whether decoding accepts lowercase alphabet characters
    case_fold: bool,
}

impl BaseEncoding {
    /// Base 64 with the standard `+` `/` alphabet and `=` padding.
    pub fn base64() -> Self {
        Self {
            name: "base64",
            alphabet: Cow::Borrowed(BASE64_ALPHABET),
            bits: 6,
            pad: true,
            padding: b'=',
            case_fold: false,
        }
    }

    /// Base 64 without output padding.
    pub fn base64_unpadded() -> Self {
        Self {
            pad: false,
            ..Self::base64()
        }
    }

    /// Base 64 with the 62nd and 63rd alphabet characters replaced, e.g.
    /// `-` and `_` for the url-safe variant.
    pub fn base64_custom(c62: u8, c63: u8, pad: bool) -> Self {
        let mut alphabet = BASE64_ALPHABET.to_vec();
        alphabet[62] = c62;
        alphabet[63] = c63;
        Self {
            alphabet: Cow::Owned(alphabet),
            pad,
            ..Self::base64()
        }
    }

    /// Base 32 with the `A-Z 2-7` alphabet.
    pub fn base32() -> Self {
        Self {
            name: "base32",
            alphabet: Cow::Borrowed(BASE32_ALPHABET),
            bits: 5,
            pad: true,
            padding: b'=',
            case_fold: true,
        }
    }

    /// Base 32 with the extended hex alphabet `0-9 A-V`.
    pub fn base32_hex() -> Self {
        Self {
            name: "base32hex",
            alphabet: Cow::Borrowed(BASE32_HEX_ALPHABET),
            ..Self::base32()
        }
    }

    /// Base 16, upper-case hex.
    pub fn base16() -> Self {
        Self {
            name: "base16",
            alphabet: Cow::Borrowed(BASE16_ALPHABET),
            bits: 4,
            pad: true,
            padding: b'=',
            case_fold: true,
        }
    }

    /// Name of the encoding, as reported in [`Error::Encoding`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// encoded characters per input group
    fn group_chars(&self) -> usize {
        // lcm(8, bits) / bits
        match self.bits {
            6 => 4,
            5 => 8,
            _ => 2,
        }
    }

    /// whether a correctly padded encoding can contain the padding
    /// character at all: with an encoded group evenly dividing a byte
    /// there is never anything to pad
    fn pads_output(&self) -> bool {
        8 % self.bits != 0
    }

    /// Encodes `input`, padding the final group unless padding is
    /// disabled.
    pub fn encode(&self, input: impl AsRef<[u8]>) -> String {
        let input = input.as_ref();
        let mask = (1u32 << self.bits) - 1;
        let mut output = String::with_capacity(self.group_chars() * (input.len() / 2 + 1));
        let mut group = 0u32;
        let mut held_bits = 0;

        for &byte in input {
            group = group << 8 | u32::from(byte);
            held_bits += 8;
            while held_bits >= self.bits {
                held_bits -= self.bits;
                output.push(char::from(self.alphabet[(group >> held_bits & mask) as usize]));
            }
        }

        if held_bits > 0 {
            output.push(char::from(
                self.alphabet[(group << (self.bits - held_bits) & mask) as usize],
            ));
        }

        if self.pad && self.pads_output() {
            while output.len() % self.group_chars() != 0 {
                output.push(char::from(self.padding));
            }
        }

        output
    }

    /// Decodes `input`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] when the input length is not a multiple
    /// of the encoded group size while padding is enabled, when a
    /// character falls outside the alphabet, or when padding appears
    /// before the final group.
    pub fn decode(&self, input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let input = input.as_ref();
        let group_chars = self.group_chars();

        if self.pad && input.len() % group_chars != 0 {
            return Err(self.error());
        }

        let mut output = Vec::with_capacity(input.len() * self.bits as usize / 8);
        let mut group = 0u32;
        let mut held_bits = 0;

        for (i, &c) in input.iter().enumerate() {
            if c == self.padding && self.pads_output() {
                if i + group_chars - 1 < input.len() {
                    return Err(self.error());
                }
                break;
            }

            group = group << self.bits | u32::from(self.decode_char(c)?);
            held_bits += self.bits;
            if held_bits >= 8 {
                held_bits -= 8;
                output.push((group >> held_bits) as u8);
            }
        }

        // any bits short of a full octet are padding leftovers
        Ok(output)
    }

    fn decode_char(&self, c: u8) -> Result<u8> {
        let c = if self.case_fold {
            c.to_ascii_uppercase()
        } else {
            c
        };
        self.alphabet
            .iter()
            .position(|&a| a == c)
            .map(|index| index as u8)
            .ok_or_else(|| self.error())
    }

    fn error(&self) -> Error {
        Error::Encoding { codec: self.name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_4648_vectors() {
        let cases: &[(BaseEncoding, &str, &str)] = &[
            (BaseEncoding::base64(), "", ""),
            (BaseEncoding::base64(), "f", "Zg=="),
            (BaseEncoding::base64(), "fo", "Zm8="),
            (BaseEncoding::base64(), "foo", "Zm9v"),
            (BaseEncoding::base64(), "foob", "Zm9vYg=="),
            (BaseEncoding::base64(), "fooba", "Zm9vYmE="),
            (BaseEncoding::base64(), "foobar", "Zm9vYmFy"),
            (BaseEncoding::base32(), "f", "MY======"),
            (BaseEncoding::base32(), "fo", "MZXQ===="),
            (BaseEncoding::base32(), "foobar", "MZXW6YTBOI======"),
            (BaseEncoding::base32_hex(), "f", "CO======"),
            (BaseEncoding::base32_hex(), "foobar", "CPNMUOJ1E8======"),
            (BaseEncoding::base16(), "f", "66"),
            (BaseEncoding::base16(), "foobar", "666F6F626172"),
        ];
        for (encoding, plain, encoded) in cases {
            assert_eq!(encoding.encode(plain), *encoded, "{} {plain:?}", encoding.name());
            assert_eq!(
                encoding.decode(encoded).unwrap(),
                plain.as_bytes(),
                "{} {encoded:?}",
                encoding.name()
            );
        }
    }

    #[test]
    fn padding_can_be_disabled() {
        assert_eq!(BaseEncoding::base64_unpadded().encode("Pony!"), "UG9ueSE");
        assert_eq!(
            BaseEncoding::base64_unpadded().decode("UG9ueSE").unwrap(),
            b"Pony!"
        );
    }

    #[test]
    fn url_safe_alphabet() {
        let encoding = BaseEncoding::base64_custom(b'-', b'_', false);
        assert_eq!(encoding.encode([0xfb, 0xff]), "-_8");
        assert_eq!(encoding.decode("-_8").unwrap(), [0xfb, 0xff]);
    }

    #[test]
    fn round_trips_arbitrary_bytes() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        for encoding in [
            BaseEncoding::base16(),
            BaseEncoding::base32(),
            BaseEncoding::base32_hex(),
            BaseEncoding::base64(),
        ] {
            assert_eq!(
                encoding.decode(encoding.encode(&bytes)).unwrap(),
                bytes,
                "{}",
                encoding.name()
            );
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(BaseEncoding::base64().decode("Zg=").is_err(), "length");
        assert!(BaseEncoding::base64().decode("Z!==").is_err(), "alphabet");
        assert!(
            BaseEncoding::base64().decode("Zg==Zg==").is_err(),
            "padding mid-input"
        );
        assert!(BaseEncoding::base64().decode("=AAA").is_err());
        assert!(BaseEncoding::base16().decode("6=").is_err());
    }

    #[test]
    fn decodes_case_insensitively_where_the_alphabet_allows() {
        assert_eq!(BaseEncoding::base16().decode("66").unwrap(), b"f");
        assert_eq!(BaseEncoding::base16().decode("6f").unwrap(), [0x6f]);
        assert_eq!(BaseEncoding::base32().decode("my======").unwrap(), b"f");
    }
}

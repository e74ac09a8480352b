//! Time-ordered-ish unique identifiers.
//!
//! Both formats embed the creation time (milliseconds since
//! [`EPOCH_MILLIS`]) with its digits reversed so that consecutive ids do not
//! share a prefix, plus a rolling serial number and a small random spread.
//!
//! * UID62: 12 base-62 characters, carrying a numeric code (0-999).
//! * UID36: 12 upper-case base-36 characters, carrying a one-character prefix.

use crate::Error;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 2017-09-01T00:00:00Z
pub const EPOCH_MILLIS: u64 = 1_504_195_200_000;

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// What an id decodes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidInfo {
    pub uid: String,
    pub code: String,
    /// Milliseconds since the Unix epoch.
    pub time_millis: u64,
}

fn now_since_epoch() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH_MILLIS);
    now.saturating_sub(EPOCH_MILLIS)
}

/// Zero-pad `value` to `width` digits (keeping the last `width`) and reverse.
fn reverse_digits(value: u64, width: usize) -> u64 {
    let padded = format!("{:0>width$}", value, width = width);
    let tail = &padded[padded.len() - width..];
    tail.chars().rev().collect::<String>().parse().unwrap_or(0)
}

fn encode(mut value: u64, alphabet: &[u8]) -> String {
    let base = alphabet.len() as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(alphabet[(value % base) as usize]);
        value /= base;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Encode and keep exactly the last `width` characters, left-padding with `0`.
fn encode_fixed(value: u64, alphabet: &[u8], width: usize) -> String {
    let encoded = format!("{:0>width$}", encode(value, alphabet), width = width);
    encoded[encoded.len() - width..].to_string()
}

fn decode_base62(input: &str) -> u64 {
    input.bytes().fold(0u64, |acc, byte| {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'A'..=b'Z' => byte - b'A' + 10,
            b'a'..=b'z' => byte - b'a' + 36,
            _ => 0,
        };
        acc.wrapping_mul(62).wrapping_add(digit as u64)
    })
}

/// Rolling counter over `0..=max`, starting at `start`.
#[derive(Debug)]
struct Serial {
    value: AtomicU64,
    modulus: u64,
}

impl Serial {
    fn new(start: u64, max: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
            modulus: max + 1,
        }
    }

    fn next(&self) -> u64 {
        let modulus = self.modulus;
        let previous = self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some((v + 1) % modulus))
            .unwrap_or(0);
        (previous + 1) % modulus
    }
}

/// UID62 generator bound to a numeric code.
#[derive(Debug)]
pub struct Uid62 {
    code: u64,
    serial: Serial,
    spread: Serial,
}

impl Uid62 {
    pub fn new(code: u64) -> Self {
        let mut rng = rand::rng();
        Self {
            code: code % 1000,
            serial: Serial::new(rng.random_range(0..=1000), 1000),
            spread: Serial::new(rng.random_range(0..=20), 20),
        }
    }

    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        let serial = self.serial.next();
        let timestamp = reverse_digits(now_since_epoch(), 13);

        let mut serial_no = reverse_digits(serial, 4) * 1000 + self.code;
        if serial_no < 4_776_336 && rng.random_bool(0.5) {
            serial_no += 10_000_000;
        }
        let timestamp = self.spread.next() * 10_000_000_000_000 + timestamp;

        encode_fixed(serial_no, BASE62, 4) + &encode_fixed(timestamp, BASE62, 8)
    }

    /// Decode the code and creation time of a UID62.
    pub fn resolve(uid: &str) -> Result<UidInfo, Error> {
        if uid.len() != 12 || !uid.is_ascii() {
            return Err(Error::BadRequest(format!("invalid uid62: {uid}")));
        }
        let code = decode_base62(&uid[..4]) % 1000;
        let reversed = decode_base62(&uid[4..12]) % 10_000_000_000_000;
        Ok(UidInfo {
            uid: uid.to_string(),
            code: code.to_string(),
            time_millis: reverse_digits(reversed, 13) + EPOCH_MILLIS,
        })
    }
}

/// UID36 generator with a fixed or random one-character prefix.
#[derive(Debug)]
pub struct Uid36 {
    prefix: Option<char>,
    serial: Serial,
}

impl Uid36 {
    /// `prefix` must be one of `0-9a-z`; `None` picks a random prefix per id.
    pub fn new(prefix: Option<char>) -> Result<Self, Error> {
        let prefix = match prefix {
            Some(c) if c.is_ascii() && BASE36.contains(&(c.to_ascii_lowercase() as u8)) => {
                Some(c.to_ascii_lowercase())
            }
            Some(c) => return Err(Error::BadRequest(format!("invalid prefix: {c}"))),
            None => None,
        };
        Ok(Self {
            prefix,
            serial: Serial::new(0, 999),
        })
    }

    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        let time = now_since_epoch();
        let n = self.serial.next();

        let seconds = reverse_digits(time / 1000, 10);
        let millis = reverse_digits(time % 1000, 3);

        let mut serial_no = reverse_digits(n, 3) * 1000 + millis;
        if serial_no <= 679_615 && rng.random_bool(0.5) {
            serial_no += 1_000_000;
        }
        let spread_max = if seconds <= 8_364_164_095 { 7 } else { 6 };
        let seconds = rng.random_range(0..=spread_max) * 10_000_000_000 + seconds;

        let prefix = self
            .prefix
            .unwrap_or_else(|| BASE36[rng.random_range(0..BASE36.len())] as char);

        format!(
            "{}{}{}",
            prefix,
            encode_fixed(serial_no, BASE36, 4),
            encode_fixed(seconds, BASE36, 7)
        )
        .to_uppercase()
    }

    /// Decode the prefix and creation time of a UID36.
    pub fn resolve(uid: &str) -> Result<UidInfo, Error> {
        let invalid = || Error::BadRequest(format!("invalid uid36: {uid}"));
        if uid.len() != 12 || !uid.is_ascii() {
            return Err(invalid());
        }
        let serial_no = u64::from_str_radix(&uid[1..5], 36).map_err(|_| invalid())? % 1_000_000;
        let seconds = u64::from_str_radix(&uid[5..12], 36).map_err(|_| invalid())? % 10_000_000_000;
        let millis = reverse_digits(serial_no % 1000, 3);

        Ok(UidInfo {
            uid: uid.to_string(),
            code: uid[..1].to_string(),
            time_millis: reverse_digits(seconds, 10) * 1000 + millis + EPOCH_MILLIS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now_millis() -> u64 {
        now_since_epoch() + EPOCH_MILLIS
    }

    #[test]
    fn test_reverse_digits() {
        assert_eq!(reverse_digits(12, 4), 2100);
        assert_eq!(reverse_digits(2100, 4), 12);
        assert_eq!(reverse_digits(123456, 4), 6543);
    }

    #[test]
    fn test_base62_round_trip() {
        for value in [0u64, 61, 62, 14_776_335, 123_456_789] {
            assert_eq!(decode_base62(&encode(value, BASE62)), value);
        }
    }

    #[test]
    fn test_uid62_shape_and_resolve() {
        let generator = Uid62::new(1042);
        let before = now_millis();
        let uid = generator.generate();
        let after = now_millis();

        assert_eq!(uid.len(), 12);
        assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));

        let info = Uid62::resolve(&uid).unwrap();
        assert_eq!(info.code, "42");
        assert!(info.time_millis >= before && info.time_millis <= after);
    }

    #[test]
    fn test_uid62_ids_differ() {
        let generator = Uid62::new(1);
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_uid36_shape_and_resolve() {
        let generator = Uid36::new(Some('k')).unwrap();
        let before = now_millis();
        let uid = generator.generate();
        let after = now_millis();

        assert_eq!(uid.len(), 12);
        assert!(uid.starts_with('K'));
        assert_eq!(uid, uid.to_uppercase());

        let info = Uid36::resolve(&uid).unwrap();
        assert_eq!(info.code, "K");
        assert!(info.time_millis >= before && info.time_millis <= after);
    }

    #[test]
    fn test_uid36_rejects_bad_prefix() {
        assert!(Uid36::new(Some('#')).is_err());
        assert!(Uid36::resolve("short").is_err());
    }
}

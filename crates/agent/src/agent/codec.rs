//! Agent wire primitives.
//!
//! # Encodings
//!
//! ```text
//! uint32        4 bytes, big-endian
//! string        uint32 length || length bytes
//! mp_ssh1       uint16 bit count (big-endian) || ceil(bits/8) bytes, big-endian
//! rsa_ssh1_pub  uint32 bits || mp_ssh1 || mp_ssh1   (exponent/modulus order varies)
//! ```
//!
//! # Error model
//!
//! [`MessageReader`] is a cursor with a *sticky* error flag: any short read
//! sets the flag and every subsequent operation returns a zero value. The
//! cursor never panics and never returns `Result` — a request is malformed
//! iff the flag is set once the handler has read all the fields it expects.
//! This mirrors how the handlers are written: read everything first, check
//! once.
//!
//! [`MessageWriter`] is the symmetric append-only reply buffer.

use bytes::{BufMut, BytesMut};

/// Order of the exponent and modulus within an SSH-1 RSA public key
/// encoding.
///
/// The public blob and the challenge/remove requests carry the exponent
/// first; the SSH-1 add-identity private body carries the modulus first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rsa1Order {
    /// `uint32 bits || mp exponent || mp modulus`
    ExponentFirst,
    /// `uint32 bits || mp modulus || mp exponent`
    ModulusFirst,
}

/// A decoded SSH-1 RSA public key: declared bit count plus raw big-endian
/// magnitudes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaSsh1Public {
    /// Declared modulus size in bits.
    pub bits: u32,
    /// Public exponent, minimal big-endian bytes.
    pub exponent: Vec<u8>,
    /// Modulus, minimal big-endian bytes.
    pub modulus: Vec<u8>,
}

/// Number of significant bits in a big-endian magnitude.
fn magnitude_bits(bytes: &[u8]) -> u32 {
    let mut i = 0;
    while i < bytes.len() && bytes[i] == 0 {
        i += 1;
    }
    if i == bytes.len() {
        return 0;
    }
    (bytes.len() - i - 1) as u32 * 8 + (8 - bytes[i].leading_zeros())
}

/// Strip redundant leading zero bytes from a big-endian magnitude.
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < bytes.len() && bytes[i] == 0 {
        i += 1;
    }
    &bytes[i..]
}

/// Decoding cursor over a byte span with a sticky error flag.
#[derive(Debug)]
pub struct MessageReader<'a> {
    buf: &'a [u8],
    pos: usize,
    err: bool,
}

impl<'a> MessageReader<'a> {
    /// Creates a cursor over `buf`, positioned at its start.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            err: false,
        }
    }

    /// True if any operation so far has run off the end of the buffer.
    pub fn has_err(&self) -> bool {
        self.err
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads one byte. Returns 0 on short read.
    pub fn get_byte(&mut self) -> u8 {
        match self.get_data(1) {
            [b] => *b,
            _ => 0,
        }
    }

    /// Reads a big-endian `uint32`. Returns 0 on short read.
    pub fn get_uint32(&mut self) -> u32 {
        let d = self.get_data(4);
        if d.len() == 4 {
            u32::from_be_bytes([d[0], d[1], d[2], d[3]])
        } else {
            0
        }
    }

    /// Reads `n` raw bytes. Returns an empty slice on short read.
    pub fn get_data(&mut self, n: usize) -> &'a [u8] {
        if self.err || self.buf.len() - self.pos < n {
            self.err = true;
            return &[];
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    /// Reads a length-prefixed `string`. Returns an empty slice on short
    /// read.
    pub fn get_string(&mut self) -> &'a [u8] {
        let len = self.get_uint32() as usize;
        self.get_data(len)
    }

    /// Reads an SSH-1 mpint: a 16-bit bit count followed by the magnitude.
    ///
    /// The returned slice is exactly `ceil(bits/8)` bytes and may carry a
    /// redundant leading zero if the peer encoded one.
    pub fn get_mp_ssh1(&mut self) -> &'a [u8] {
        let d = self.get_data(2);
        let bits = if d.len() == 2 {
            u16::from_be_bytes([d[0], d[1]]) as usize
        } else {
            0
        };
        self.get_data((bits + 7) / 8)
    }

    /// Reads an SSH-1 RSA public key in the given field order.
    ///
    /// The magnitudes are normalised (leading zeros stripped) so that two
    /// encodings of the same key always produce the same value.
    pub fn get_rsa_ssh1_pub(&mut self, order: Rsa1Order) -> RsaSsh1Public {
        let bits = self.get_uint32();
        let first = strip_leading_zeros(self.get_mp_ssh1()).to_vec();
        let second = strip_leading_zeros(self.get_mp_ssh1()).to_vec();
        let (exponent, modulus) = match order {
            Rsa1Order::ExponentFirst => (first, second),
            Rsa1Order::ModulusFirst => (second, first),
        };
        RsaSsh1Public {
            bits,
            exponent,
            modulus,
        }
    }
}

/// Append-only encoding buffer.
#[derive(Debug, Default)]
pub struct MessageWriter {
    buf: BytesMut,
}

impl MessageWriter {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards everything written so far.
    ///
    /// Used by the failure path: a handler may have begun composing a
    /// success reply before discovering the error.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The encoded bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer, returning the encoded bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Appends one byte.
    pub fn put_byte(&mut self, b: u8) {
        self.buf.put_u8(b);
    }

    /// Appends a big-endian `uint32`.
    pub fn put_uint32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    /// Appends raw bytes with no header.
    pub fn put_data(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Appends a length-prefixed `string`.
    pub fn put_string(&mut self, data: &[u8]) {
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
    }

    /// Appends an SSH-1 mpint from a big-endian magnitude.
    ///
    /// The magnitude is re-encoded minimally: leading zeros are stripped
    /// and the bit count is computed from the topmost set bit.
    pub fn put_mp_ssh1(&mut self, magnitude: &[u8]) {
        let m = strip_leading_zeros(magnitude);
        self.buf.put_u16(magnitude_bits(m) as u16);
        self.buf.put_slice(m);
    }

    /// Appends an SSH-2 mpint from a big-endian magnitude: minimal bytes,
    /// prefixed with a zero byte when the top bit is set.
    pub fn put_mp_ssh2(&mut self, magnitude: &[u8]) {
        let m = strip_leading_zeros(magnitude);
        let pad = !m.is_empty() && m[0] & 0x80 != 0;
        self.buf.put_u32((m.len() + pad as usize) as u32);
        if pad {
            self.buf.put_u8(0);
        }
        self.buf.put_slice(m);
    }

    /// Appends an SSH-1 RSA public key in the given field order.
    pub fn put_rsa_ssh1_pub(&mut self, key: &RsaSsh1Public, order: Rsa1Order) {
        self.put_uint32(key.bits);
        match order {
            Rsa1Order::ExponentFirst => {
                self.put_mp_ssh1(&key.exponent);
                self.put_mp_ssh1(&key.modulus);
            }
            Rsa1Order::ModulusFirst => {
                self.put_mp_ssh1(&key.modulus);
                self.put_mp_ssh1(&key.exponent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint32_round_trip() {
        let mut w = MessageWriter::new();
        w.put_uint32(0xdeadbeef);
        assert_eq!(w.as_slice(), &[0xde, 0xad, 0xbe, 0xef]);

        let bytes = w.into_vec();
        let mut r = MessageReader::new(&bytes);
        assert_eq!(r.get_uint32(), 0xdeadbeef);
        assert!(!r.has_err());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_string_round_trip() {
        let mut w = MessageWriter::new();
        w.put_string(b"hello");
        let bytes = w.into_vec();
        assert_eq!(&bytes[..4], &[0, 0, 0, 5]);

        let mut r = MessageReader::new(&bytes);
        assert_eq!(r.get_string(), b"hello");
        assert!(!r.has_err());
    }

    #[test]
    fn test_mp_ssh1_round_trip() {
        let mut w = MessageWriter::new();
        w.put_mp_ssh1(&[0x05, 0xff]);
        // 0x05ff has 11 significant bits.
        assert_eq!(w.as_slice(), &[0x00, 0x0b, 0x05, 0xff]);

        let bytes = w.into_vec();
        let mut r = MessageReader::new(&bytes);
        assert_eq!(r.get_mp_ssh1(), &[0x05, 0xff]);
        assert!(!r.has_err());
    }

    #[test]
    fn test_mp_ssh1_strips_leading_zeros() {
        let mut w = MessageWriter::new();
        w.put_mp_ssh1(&[0x00, 0x00, 0x80]);
        assert_eq!(w.as_slice(), &[0x00, 0x08, 0x80]);
    }

    #[test]
    fn test_mp_ssh1_zero() {
        let mut w = MessageWriter::new();
        w.put_mp_ssh1(&[]);
        assert_eq!(w.as_slice(), &[0x00, 0x00]);

        let bytes = w.into_vec();
        let mut r = MessageReader::new(&bytes);
        assert_eq!(r.get_mp_ssh1(), &[] as &[u8]);
        assert!(!r.has_err());
    }

    #[test]
    fn test_mp_ssh2_sign_padding() {
        let mut w = MessageWriter::new();
        w.put_mp_ssh2(&[0x80, 0x01]);
        // Top bit set: a zero byte is prepended.
        assert_eq!(w.as_slice(), &[0, 0, 0, 3, 0x00, 0x80, 0x01]);

        let mut w = MessageWriter::new();
        w.put_mp_ssh2(&[0x7f, 0x01]);
        assert_eq!(w.as_slice(), &[0, 0, 0, 2, 0x7f, 0x01]);
    }

    #[test]
    fn test_rsa_ssh1_pub_round_trip() {
        let key = RsaSsh1Public {
            bits: 11,
            exponent: vec![0x03],
            modulus: vec![0x05, 0xff],
        };

        let mut w = MessageWriter::new();
        w.put_rsa_ssh1_pub(&key, Rsa1Order::ExponentFirst);
        let bytes = w.into_vec();

        let mut r = MessageReader::new(&bytes);
        assert_eq!(r.get_rsa_ssh1_pub(Rsa1Order::ExponentFirst), key);
        assert!(!r.has_err());
    }

    #[test]
    fn test_rsa_ssh1_pub_order_matters() {
        let key = RsaSsh1Public {
            bits: 11,
            exponent: vec![0x03],
            modulus: vec![0x05, 0xff],
        };

        let mut exp_first = MessageWriter::new();
        exp_first.put_rsa_ssh1_pub(&key, Rsa1Order::ExponentFirst);
        let mut mod_first = MessageWriter::new();
        mod_first.put_rsa_ssh1_pub(&key, Rsa1Order::ModulusFirst);
        assert_ne!(exp_first.as_slice(), mod_first.as_slice());

        let bytes = mod_first.into_vec();
        let mut r = MessageReader::new(&bytes);
        assert_eq!(r.get_rsa_ssh1_pub(Rsa1Order::ModulusFirst), key);
    }

    #[test]
    fn test_sticky_error_on_short_read() {
        let mut r = MessageReader::new(&[0x01, 0x02]);
        assert_eq!(r.get_uint32(), 0);
        assert!(r.has_err());

        // Once set, the flag never clears and later reads return zeros.
        assert_eq!(r.get_byte(), 0);
        assert_eq!(r.get_string(), &[] as &[u8]);
        assert!(r.has_err());
    }

    #[test]
    fn test_string_length_past_end_sets_error() {
        // Declares 100 bytes but carries 2.
        let mut r = MessageReader::new(&[0, 0, 0, 100, 0xaa, 0xbb]);
        assert_eq!(r.get_string(), &[] as &[u8]);
        assert!(r.has_err());
    }

    #[test]
    fn test_successful_reads_leave_no_error() {
        let mut r = MessageReader::new(&[0x0d, 0, 0, 0, 1, 0x41]);
        assert_eq!(r.get_byte(), 0x0d);
        assert_eq!(r.get_string(), b"A");
        assert!(!r.has_err());
    }

    #[test]
    fn test_magnitude_bits() {
        assert_eq!(magnitude_bits(&[]), 0);
        assert_eq!(magnitude_bits(&[0x00]), 0);
        assert_eq!(magnitude_bits(&[0x01]), 1);
        assert_eq!(magnitude_bits(&[0x80]), 8);
        assert_eq!(magnitude_bits(&[0x01, 0x00]), 9);
        assert_eq!(magnitude_bits(&[0x00, 0xff]), 8);
    }
}

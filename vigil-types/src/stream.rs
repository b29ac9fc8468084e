//! Binary stream codec for request/response envelopes.
//!
//! Values are written big-endian. Strings and lists carry a `u32` length
//! prefix, optional values a leading present/absent flag, and enums a stable
//! one-byte ordinal. The format is positional: readers consume fields in the
//! same order writers produced them.

use thiserror::Error;

/// Maximum accepted length of a single string (16 MB).
const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Errors raised while decoding a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid boolean byte: {0}")]
    InvalidBool(u8),

    #[error("invalid utf-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("string too large: {0} bytes")]
    StringTooLong(usize),

    #[error("invalid {kind} ordinal: {ordinal}")]
    InvalidOrdinal { kind: &'static str, ordinal: u8 },

    #[error("JSON decode error: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// An enum with a stable wire ordinal.
pub trait WireEnum: Sized + Copy {
    /// Type name used in decode errors.
    const NAME: &'static str;

    fn ordinal(self) -> u8;

    fn from_ordinal(ordinal: u8) -> Option<Self>;
}

/// A value that can be written to a [`StreamOutput`].
pub trait Writeable {
    fn write_to(&self, out: &mut StreamOutput);

    /// Serializes the value into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = StreamOutput::new();
        self.write_to(&mut out);
        out.into_bytes()
    }
}

/// A value that can be read back from a [`StreamInput`].
pub trait Readable: Sized {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError>;

    /// Deserializes a complete message, rejecting trailing bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, StreamError> {
        let mut input = StreamInput::new(bytes);
        let value = Self::read_from(&mut input)?;
        input.ensure_consumed()?;
        Ok(value)
    }
}

/// Growable output buffer.
#[derive(Debug, Clone, Default)]
pub struct StreamOutput {
    buf: Vec<u8>,
}

impl StreamOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_byte(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(u8::from(value));
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_optional_string(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.write_bool(true);
                self.write_string(s);
            }
            None => self.write_bool(false),
        }
    }

    pub fn write_string_list(&mut self, values: &[String]) {
        self.write_len(values.len());
        for value in values {
            self.write_string(value);
        }
    }

    pub fn write_optional_i64(&mut self, value: Option<i64>) {
        match value {
            Some(v) => {
                self.write_bool(true);
                self.write_i64(v);
            }
            None => self.write_bool(false),
        }
    }

    pub fn write_enum<E: WireEnum>(&mut self, value: E) {
        self.write_byte(value.ordinal());
    }

    /// Writes a JSON value as its compact text form.
    pub fn write_json(&mut self, value: &serde_json::Value) {
        self.write_string(&value.to_string());
    }

    pub fn write_optional<T: Writeable>(&mut self, value: Option<&T>) {
        match value {
            Some(v) => {
                self.write_bool(true);
                v.write_to(self);
            }
            None => self.write_bool(false),
        }
    }

    pub fn write_list<T: Writeable>(&mut self, values: &[T]) {
        self.write_len(values.len());
        for value in values {
            value.write_to(self);
        }
    }

    fn write_len(&mut self, len: usize) {
        // Lengths beyond u32 are rejected by every reader anyway.
        self.write_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }
}

/// Cursor over an input buffer.
#[derive(Debug)]
pub struct StreamInput<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StreamInput<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fails if any bytes are left unread.
    pub fn ensure_consumed(&self) -> Result<(), StreamError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(StreamError::TrailingBytes(n)),
        }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], StreamError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(StreamError::UnexpectedEof { needed, remaining });
        }
        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_byte(&mut self) -> Result<u8, StreamError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StreamError::InvalidBool(other)),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, StreamError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_string(&mut self) -> Result<String, StreamError> {
        let len = self.read_u32()? as usize;
        if len > MAX_STRING_LEN {
            return Err(StreamError::StringTooLong(len));
        }
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn read_optional_string(&mut self) -> Result<Option<String>, StreamError> {
        if self.read_bool()? {
            Ok(Some(self.read_string()?))
        } else {
            Ok(None)
        }
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>, StreamError> {
        let count = self.read_u32()? as usize;
        let mut values = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            values.push(self.read_string()?);
        }
        Ok(values)
    }

    pub fn read_optional_i64(&mut self) -> Result<Option<i64>, StreamError> {
        if self.read_bool()? {
            Ok(Some(self.read_i64()?))
        } else {
            Ok(None)
        }
    }

    pub fn read_enum<E: WireEnum>(&mut self) -> Result<E, StreamError> {
        let ordinal = self.read_byte()?;
        E::from_ordinal(ordinal).ok_or(StreamError::InvalidOrdinal {
            kind: E::NAME,
            ordinal,
        })
    }

    pub fn read_json(&mut self) -> Result<serde_json::Value, StreamError> {
        let text = self.read_string()?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn read_optional<T: Readable>(&mut self) -> Result<Option<T>, StreamError> {
        if self.read_bool()? {
            Ok(Some(T::read_from(self)?))
        } else {
            Ok(None)
        }
    }

    pub fn read_list<T: Readable>(&mut self) -> Result<Vec<T>, StreamError> {
        let count = self.read_u32()? as usize;
        let mut values = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            values.push(T::read_from(self)?);
        }
        Ok(values)
    }
}

impl Writeable for String {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_string(self);
    }
}

impl Readable for String {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        input.read_string()
    }
}

impl Writeable for serde_json::Value {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_json(self);
    }
}

impl Readable for serde_json::Value {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        input.read_json()
    }
}

impl Writeable for crate::JobId {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_string(self.as_str());
    }
}

impl Readable for crate::JobId {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        let raw = input.read_string()?;
        crate::JobId::try_from(raw).map_err(|e| StreamError::InvalidValue(e.to_string()))
    }
}

impl Writeable for crate::SeqNo {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_i64(self.value());
    }
}

impl Readable for crate::SeqNo {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(crate::SeqNo::new(input.read_i64()?))
    }
}

impl Writeable for crate::PrimaryTerm {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_i64(self.value());
    }
}

impl Readable for crate::PrimaryTerm {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(crate::PrimaryTerm::new(input.read_i64()?))
    }
}

//! Binary coders for elements and accumulators.
//!
//! A [`Coder<T>`] turns values into bytes and back. Coders are what lets the
//! engine ship values between stages that may run on different machines:
//! grouped values crossing a shuffle, and partial accumulators produced by
//! the hot-key pre-combine. Encodings only need to be stable within one
//! pipeline execution.
//!
//! The [`CoderRegistry`] maps Rust types to coders so combiners can derive
//! accumulator and output coders from their input coder. Failing to find one
//! is the recoverable [`CoderError::CannotProvide`].
//!
//! ```
//! use ironbeam_combine::coders::*;
//!
//! let registry = CoderRegistry::with_standard_coders();
//! let coder = registry.coder_for::<i32>().unwrap();
//! let bytes = encode_to_vec(coder.as_ref(), &7).unwrap();
//! assert_eq!(decode_from_slice(coder.as_ref(), &bytes).unwrap(), 7);
//! ```

mod accumulator;
mod primitive;
#[cfg(feature = "serde-coder")]
mod serde_coder;
mod structured;

pub use accumulator::{HolderCoder, InputOrAccumCoder, NullableCoder};
pub use primitive::{
    BoolCoder, F64Coder, I32Coder, I64Coder, StringUtf8Coder, U32Coder, U64Coder, UnitCoder,
    VarIntCoder,
};
#[cfg(feature = "serde-coder")]
pub use serde_coder::SerdeCoder;
pub use structured::{IterableCoder, KvCoder};

use crate::error::CoderError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;

/// Encodes and decodes values of type `T`.
///
/// Encodings are self-delimiting: a value decoded from the middle of a stream
/// consumes exactly the bytes its encoding wrote.
pub trait Coder<T>: Send + Sync + 'static {
    fn encode(&self, value: &T, out: &mut dyn Write) -> Result<(), CoderError>;

    fn decode(&self, input: &mut dyn Read) -> Result<T, CoderError>;

    /// Fails with [`CoderError::NonDeterministic`] when equal values may
    /// encode to different bytes.
    fn verify_deterministic(&self) -> Result<(), CoderError> {
        Ok(())
    }

    /// Human-readable name, including component coders.
    fn describe(&self) -> String;

    /// Used to recover component coders (e.g. the value coder of a [`KvCoder`]).
    fn as_any(&self) -> &dyn Any;
}

/// Encode one value into a fresh buffer.
pub fn encode_to_vec<T: 'static>(coder: &dyn Coder<T>, value: &T) -> Result<Vec<u8>, CoderError> {
    let mut buf = Vec::new();
    coder.encode(value, &mut buf)?;
    Ok(buf)
}

/// Decode exactly one value from `bytes`; trailing bytes are malformed.
pub fn decode_from_slice<T: 'static>(coder: &dyn Coder<T>, bytes: &[u8]) -> Result<T, CoderError> {
    let mut cursor = bytes;
    let value = coder.decode(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(CoderError::malformed(
            coder.describe(),
            format!("{} trailing bytes", cursor.len()),
        ));
    }
    Ok(value)
}

/// Type-keyed table of coders.
#[derive(Clone, Default)]
pub struct CoderRegistry {
    coders: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl CoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with coders for the primitive types.
    pub fn with_standard_coders() -> Self {
        let mut r = Self::new();
        r.register::<i32>(Arc::new(I32Coder));
        r.register::<i64>(Arc::new(I64Coder));
        r.register::<u32>(Arc::new(U32Coder));
        r.register::<u64>(Arc::new(U64Coder));
        r.register::<f64>(Arc::new(F64Coder));
        r.register::<bool>(Arc::new(BoolCoder));
        r.register::<String>(Arc::new(StringUtf8Coder));
        r.register::<()>(Arc::new(UnitCoder));
        r
    }

    /// Register (or replace) the coder used for `T`.
    pub fn register<T: 'static>(&mut self, coder: Arc<dyn Coder<T>>) {
        self.coders.insert(TypeId::of::<T>(), Arc::new(coder));
    }

    pub fn coder_for<T: 'static>(&self) -> Result<Arc<dyn Coder<T>>, CoderError> {
        self.coders
            .get(&TypeId::of::<T>())
            .and_then(|c| c.downcast_ref::<Arc<dyn Coder<T>>>())
            .cloned()
            .ok_or_else(|| CoderError::cannot_provide::<T>("no coder registered for this type"))
    }

    /// Coder for `(K, V)` built from the registered component coders.
    pub fn kv_coder_for<K: 'static, V: 'static>(&self) -> Result<Arc<dyn Coder<(K, V)>>, CoderError> {
        Ok(Arc::new(KvCoder::new(self.coder_for::<K>()?, self.coder_for::<V>()?)))
    }
}

/* ---------- byte helpers shared by the concrete coders ---------- */

pub(crate) fn read_exact_or_malformed(
    input: &mut dyn Read,
    buf: &mut [u8],
    coder: &str,
) -> Result<(), CoderError> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            CoderError::malformed(coder, "unexpected end of stream")
        } else {
            CoderError::Io(e)
        }
    })
}

/// Read a varint length followed by that many bytes.
///
/// The buffer grows with the bytes actually present, so a corrupt length
/// fails as malformed instead of reserving memory up front.
pub(crate) fn read_len_prefixed(input: &mut dyn Read, coder: &str) -> Result<Vec<u8>, CoderError> {
    let len = read_varint(input, coder)?;
    let mut buf = Vec::with_capacity(len.min(4096) as usize);
    Read::take(&mut *input, len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(CoderError::malformed(
            coder,
            format!("declared {len} bytes, stream held {}", buf.len()),
        ));
    }
    Ok(buf)
}

pub(crate) fn read_byte(input: &mut dyn Read, coder: &str) -> Result<u8, CoderError> {
    let mut b = [0u8; 1];
    read_exact_or_malformed(input, &mut b, coder)?;
    Ok(b[0])
}

/// LEB128 unsigned varint.
pub(crate) fn write_varint(out: &mut dyn Write, mut v: u64) -> Result<(), CoderError> {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.write_all(&[byte])?;
            return Ok(());
        }
        out.write_all(&[byte | 0x80])?;
    }
}

pub(crate) fn read_varint(input: &mut dyn Read, coder: &str) -> Result<u64, CoderError> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = read_byte(input, coder)?;
        if shift >= 64 {
            return Err(CoderError::malformed(coder, "varint is too long"));
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

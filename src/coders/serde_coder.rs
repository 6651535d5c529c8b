use super::{Coder, read_len_prefixed, write_varint};
use crate::error::CoderError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{Any, type_name};
use std::io::{Read, Write};
use std::marker::PhantomData;

/// Coder for any serde type, backed by postcard.
///
/// Each value is written as a varint length followed by the postcard bytes.
/// Serde offers no guarantee that equal values serialize identically (maps
/// and sets iterate in hash order), so this coder reports itself as
/// non-deterministic unless built with [`SerdeCoder::deterministic`].
pub struct SerdeCoder<T> {
    deterministic: bool,
    _t: PhantomData<fn() -> T>,
}

impl<T> SerdeCoder<T> {
    pub fn new() -> Self {
        Self { deterministic: false, _t: PhantomData }
    }

    /// Declare that `T` serializes deterministically.
    pub fn deterministic() -> Self {
        Self { deterministic: true, _t: PhantomData }
    }
}

impl<T> Default for SerdeCoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Coder<T> for SerdeCoder<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, value: &T, out: &mut dyn Write) -> Result<(), CoderError> {
        let bytes = postcard::to_allocvec(value)
            .map_err(|e| CoderError::Io(std::io::Error::other(e)))?;
        write_varint(out, bytes.len() as u64)?;
        out.write_all(&bytes)?;
        Ok(())
    }

    fn decode(&self, input: &mut dyn Read) -> Result<T, CoderError> {
        let buf = read_len_prefixed(input, "SerdeCoder")?;
        postcard::from_bytes(&buf).map_err(|e| CoderError::malformed(self.describe(), e.to_string()))
    }

    fn verify_deterministic(&self) -> Result<(), CoderError> {
        if self.deterministic {
            Ok(())
        } else {
            Err(CoderError::NonDeterministic {
                coder: self.describe(),
                reason: "serde encodings are not guaranteed to be deterministic".into(),
            })
        }
    }

    fn describe(&self) -> String {
        format!("SerdeCoder<{}>", type_name::<T>())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

//! Coders for primitive types.
//!
//! Fixed-width numbers are big-endian. Strings are a varint byte length
//! followed by UTF-8 bytes.

use super::{Coder, read_byte, read_exact_or_malformed, read_len_prefixed, read_varint, write_varint};
use crate::error::CoderError;
use std::any::Any;
use std::io::{Read, Write};

macro_rules! fixed_width_coder {
    ($(#[$doc:meta])* $name:ident, $t:ty, $n:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name;

        impl Coder<$t> for $name {
            fn encode(&self, value: &$t, out: &mut dyn Write) -> Result<(), CoderError> {
                out.write_all(&value.to_be_bytes())?;
                Ok(())
            }

            fn decode(&self, input: &mut dyn Read) -> Result<$t, CoderError> {
                let mut buf = [0u8; $n];
                read_exact_or_malformed(input, &mut buf, stringify!($name))?;
                Ok(<$t>::from_be_bytes(buf))
            }

            fn describe(&self) -> String {
                stringify!($name).to_string()
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

fixed_width_coder!(
    /// Four big-endian bytes.
    I32Coder, i32, 4
);
fixed_width_coder!(I64Coder, i64, 8);
fixed_width_coder!(U32Coder, u32, 4);
fixed_width_coder!(U64Coder, u64, 8);

/// IEEE-754 bits, big-endian.
///
/// Not deterministic: `0.0` and `-0.0` compare equal but encode differently,
/// as do the many NaN payloads.
#[derive(Clone, Copy, Debug, Default)]
pub struct F64Coder;

impl Coder<f64> for F64Coder {
    fn encode(&self, value: &f64, out: &mut dyn Write) -> Result<(), CoderError> {
        out.write_all(&value.to_bits().to_be_bytes())?;
        Ok(())
    }

    fn decode(&self, input: &mut dyn Read) -> Result<f64, CoderError> {
        let mut buf = [0u8; 8];
        read_exact_or_malformed(input, &mut buf, "F64Coder")?;
        Ok(f64::from_bits(u64::from_be_bytes(buf)))
    }

    fn verify_deterministic(&self) -> Result<(), CoderError> {
        Err(CoderError::NonDeterministic {
            coder: self.describe(),
            reason: "floating point equality does not match byte equality".into(),
        })
    }

    fn describe(&self) -> String {
        "F64Coder".into()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Variable-length `u32`, used for hot-key nonces.
#[derive(Clone, Copy, Debug, Default)]
pub struct VarIntCoder;

impl Coder<u32> for VarIntCoder {
    fn encode(&self, value: &u32, out: &mut dyn Write) -> Result<(), CoderError> {
        write_varint(out, u64::from(*value))
    }

    fn decode(&self, input: &mut dyn Read) -> Result<u32, CoderError> {
        let v = read_varint(input, "VarIntCoder")?;
        u32::try_from(v).map_err(|_| CoderError::malformed("VarIntCoder", "value exceeds u32"))
    }

    fn describe(&self) -> String {
        "VarIntCoder".into()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BoolCoder;

impl Coder<bool> for BoolCoder {
    fn encode(&self, value: &bool, out: &mut dyn Write) -> Result<(), CoderError> {
        out.write_all(&[u8::from(*value)])?;
        Ok(())
    }

    fn decode(&self, input: &mut dyn Read) -> Result<bool, CoderError> {
        match read_byte(input, "BoolCoder")? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(CoderError::malformed("BoolCoder", format!("unexpected byte {b}"))),
        }
    }

    fn describe(&self) -> String {
        "BoolCoder".into()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StringUtf8Coder;

impl Coder<String> for StringUtf8Coder {
    fn encode(&self, value: &String, out: &mut dyn Write) -> Result<(), CoderError> {
        write_varint(out, value.len() as u64)?;
        out.write_all(value.as_bytes())?;
        Ok(())
    }

    fn decode(&self, input: &mut dyn Read) -> Result<String, CoderError> {
        let buf = read_len_prefixed(input, "StringUtf8Coder")?;
        String::from_utf8(buf).map_err(|e| CoderError::malformed("StringUtf8Coder", e.to_string()))
    }

    fn describe(&self) -> String {
        "StringUtf8Coder".into()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The unit value encodes to zero bytes; used for the synthetic global key.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitCoder;

impl Coder<()> for UnitCoder {
    fn encode(&self, _value: &(), _out: &mut dyn Write) -> Result<(), CoderError> {
        Ok(())
    }

    fn decode(&self, _input: &mut dyn Read) -> Result<(), CoderError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "UnitCoder".into()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

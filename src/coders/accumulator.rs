//! Coders for "possibly absent" accumulators and for the input-or-accumulator
//! union.
//!
//! Wire formats:
//! - nullable / holder: one presence byte (`0` absent, `1` present), then the
//!   wrapped encoding only when present;
//! - input-or-accumulator: one tag byte (`0` raw input, `1` accumulator), then
//!   the tagged payload's encoding.
//!
//! Any other leading byte is a malformed stream.

use super::{Coder, read_byte};
use crate::accumulator::{Holder, InputOrAccum};
use crate::error::CoderError;
use std::any::Any;
use std::io::{Read, Write};
use std::sync::Arc;

const ABSENT: u8 = 0;
const PRESENT: u8 = 1;

const TAG_INPUT: u8 = 0;
const TAG_ACCUM: u8 = 1;

/// Coder for `Option<V>` using a presence byte.
pub struct NullableCoder<V> {
    value: Arc<dyn Coder<V>>,
}

impl<V> NullableCoder<V> {
    pub fn new(value: Arc<dyn Coder<V>>) -> Self {
        Self { value }
    }

    pub fn value_coder(&self) -> Arc<dyn Coder<V>> {
        Arc::clone(&self.value)
    }
}

impl<V: 'static> Coder<Option<V>> for NullableCoder<V> {
    fn encode(&self, value: &Option<V>, out: &mut dyn Write) -> Result<(), CoderError> {
        match value {
            Some(v) => {
                out.write_all(&[PRESENT])?;
                self.value.encode(v, out)
            }
            None => {
                out.write_all(&[ABSENT])?;
                Ok(())
            }
        }
    }

    fn decode(&self, input: &mut dyn Read) -> Result<Option<V>, CoderError> {
        match read_byte(input, "NullableCoder")? {
            ABSENT => Ok(None),
            PRESENT => Ok(Some(self.value.decode(input)?)),
            b => Err(CoderError::malformed(
                self.describe(),
                format!("unexpected presence byte {b}"),
            )),
        }
    }

    fn verify_deterministic(&self) -> Result<(), CoderError> {
        self.value.verify_deterministic()
    }

    fn describe(&self) -> String {
        format!("NullableCoder({})", self.value.describe())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Coder for [`Holder<V>`]; same bytes as [`NullableCoder`].
pub struct HolderCoder<V> {
    inner: NullableCoder<V>,
}

impl<V> HolderCoder<V> {
    pub fn new(value: Arc<dyn Coder<V>>) -> Self {
        Self { inner: NullableCoder::new(value) }
    }
}

impl<V: 'static> Coder<Holder<V>> for HolderCoder<V> {
    fn encode(&self, value: &Holder<V>, out: &mut dyn Write) -> Result<(), CoderError> {
        match value.value() {
            Some(v) => {
                out.write_all(&[PRESENT])?;
                self.inner.value.encode(v, out)
            }
            None => {
                out.write_all(&[ABSENT])?;
                Ok(())
            }
        }
    }

    fn decode(&self, input: &mut dyn Read) -> Result<Holder<V>, CoderError> {
        self.inner.decode(input).map(Holder::from)
    }

    fn verify_deterministic(&self) -> Result<(), CoderError> {
        self.inner.verify_deterministic()
    }

    fn describe(&self) -> String {
        format!("HolderCoder({})", self.inner.value.describe())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Coder for [`InputOrAccum`].
pub struct InputOrAccumCoder<I, A> {
    input: Arc<dyn Coder<I>>,
    accum: Arc<dyn Coder<A>>,
}

impl<I, A> InputOrAccumCoder<I, A> {
    pub fn new(input: Arc<dyn Coder<I>>, accum: Arc<dyn Coder<A>>) -> Self {
        Self { input, accum }
    }

    pub fn input_coder(&self) -> Arc<dyn Coder<I>> {
        Arc::clone(&self.input)
    }
}

impl<I: 'static, A: 'static> Coder<InputOrAccum<I, A>> for InputOrAccumCoder<I, A> {
    fn encode(&self, value: &InputOrAccum<I, A>, out: &mut dyn Write) -> Result<(), CoderError> {
        match value {
            InputOrAccum::Input(i) => {
                out.write_all(&[TAG_INPUT])?;
                self.input.encode(i, out)
            }
            InputOrAccum::Accum(a) => {
                out.write_all(&[TAG_ACCUM])?;
                self.accum.encode(a, out)
            }
        }
    }

    fn decode(&self, input: &mut dyn Read) -> Result<InputOrAccum<I, A>, CoderError> {
        match read_byte(input, "InputOrAccumCoder")? {
            TAG_INPUT => Ok(InputOrAccum::Input(self.input.decode(input)?)),
            TAG_ACCUM => Ok(InputOrAccum::Accum(self.accum.decode(input)?)),
            b => Err(CoderError::malformed(self.describe(), format!("unexpected tag byte {b}"))),
        }
    }

    fn verify_deterministic(&self) -> Result<(), CoderError> {
        self.input.verify_deterministic()?;
        self.accum.verify_deterministic()
    }

    fn describe(&self) -> String {
        format!(
            "InputOrAccumCoder({}, {})",
            self.input.describe(),
            self.accum.describe()
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

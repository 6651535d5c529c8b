use super::{Coder, read_varint, write_varint};
use crate::error::CoderError;
use std::any::Any;
use std::io::{Read, Write};
use std::sync::Arc;

/// Coder for `(K, V)` pairs: the key encoding followed by the value encoding.
pub struct KvCoder<K, V> {
    key: Arc<dyn Coder<K>>,
    value: Arc<dyn Coder<V>>,
}

impl<K, V> KvCoder<K, V> {
    pub fn new(key: Arc<dyn Coder<K>>, value: Arc<dyn Coder<V>>) -> Self {
        Self { key, value }
    }

    pub fn key_coder(&self) -> Arc<dyn Coder<K>> {
        Arc::clone(&self.key)
    }

    pub fn value_coder(&self) -> Arc<dyn Coder<V>> {
        Arc::clone(&self.value)
    }
}

impl<K: 'static, V: 'static> Coder<(K, V)> for KvCoder<K, V> {
    fn encode(&self, value: &(K, V), out: &mut dyn Write) -> Result<(), CoderError> {
        self.key.encode(&value.0, out)?;
        self.value.encode(&value.1, out)
    }

    fn decode(&self, input: &mut dyn Read) -> Result<(K, V), CoderError> {
        let k = self.key.decode(input)?;
        let v = self.value.decode(input)?;
        Ok((k, v))
    }

    fn verify_deterministic(&self) -> Result<(), CoderError> {
        self.key.verify_deterministic()?;
        self.value.verify_deterministic()
    }

    fn describe(&self) -> String {
        format!("KvCoder({}, {})", self.key.describe(), self.value.describe())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Coder for `Vec<T>`: a varint element count followed by each element.
pub struct IterableCoder<T> {
    elem: Arc<dyn Coder<T>>,
}

impl<T> IterableCoder<T> {
    pub fn new(elem: Arc<dyn Coder<T>>) -> Self {
        Self { elem }
    }

    pub fn elem_coder(&self) -> Arc<dyn Coder<T>> {
        Arc::clone(&self.elem)
    }
}

impl<T: 'static> Coder<Vec<T>> for IterableCoder<T> {
    fn encode(&self, value: &Vec<T>, out: &mut dyn Write) -> Result<(), CoderError> {
        write_varint(out, value.len() as u64)?;
        for v in value {
            self.elem.encode(v, out)?;
        }
        Ok(())
    }

    fn decode(&self, input: &mut dyn Read) -> Result<Vec<T>, CoderError> {
        let n = read_varint(input, "IterableCoder")? as usize;
        // Cap the preallocation; a corrupt count must not reserve gigabytes.
        let mut out = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            out.push(self.elem.decode(input)?);
        }
        Ok(out)
    }

    fn verify_deterministic(&self) -> Result<(), CoderError> {
        self.elem.verify_deterministic()
    }

    fn describe(&self) -> String {
        format!("IterableCoder({})", self.elem.describe())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

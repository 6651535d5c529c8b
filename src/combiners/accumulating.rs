//! Combiners whose accumulator type carries the combining logic itself.

use crate::combine_fn::CombineFn;
use std::marker::PhantomData;

/// A mutable accumulator that knows how to absorb inputs and other partials.
///
/// `Default` plays the role of `create_accumulator`.
pub trait Accumulator<I, O>: Default {
    fn add_input(&mut self, input: I);

    fn merge_accumulator(&mut self, other: Self);

    fn extract_output(&self) -> O;
}

/// [`CombineFn`] delegating every step to an [`Accumulator`] type.
///
/// ```
/// use ironbeam_combine::combine_fn::CombineFn;
/// use ironbeam_combine::combiners::{Accumulator, AccumulatingCombineFn};
///
/// #[derive(Default)]
/// struct Longest(String);
///
/// impl Accumulator<String, String> for Longest {
///     fn add_input(&mut self, s: String) {
///         if s.len() > self.0.len() {
///             self.0 = s;
///         }
///     }
///     fn merge_accumulator(&mut self, other: Self) {
///         self.add_input(other.0);
///     }
///     fn extract_output(&self) -> String {
///         self.0.clone()
///     }
/// }
///
/// let longest = AccumulatingCombineFn::<Longest, String, String>::new();
/// assert_eq!(longest.apply(vec!["a".into(), "abc".into(), "ab".into()]), "abc");
/// ```
pub struct AccumulatingCombineFn<Acc, I, O>(PhantomData<fn(I) -> (Acc, O)>);

impl<Acc, I, O> AccumulatingCombineFn<Acc, I, O> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<Acc, I, O> Default for AccumulatingCombineFn<Acc, I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Acc, I, O> Clone for AccumulatingCombineFn<Acc, I, O> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<Acc, I, O> CombineFn<I, Acc, O> for AccumulatingCombineFn<Acc, I, O>
where
    Acc: Accumulator<I, O> + 'static,
    I: 'static,
    O: 'static,
{
    fn create_accumulator(&self) -> Acc {
        Acc::default()
    }

    fn add_input(&self, mut acc: Acc, input: I) -> Acc {
        acc.add_input(input);
        acc
    }

    fn merge_accumulators(&self, accs: Vec<Acc>) -> Acc {
        let mut merged = Acc::default();
        for a in accs {
            merged.merge_accumulator(a);
        }
        merged
    }

    fn extract_output(&self, acc: Acc) -> O {
        acc.extract_output()
    }
}

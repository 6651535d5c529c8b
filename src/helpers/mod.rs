pub(crate) mod combine;
pub(crate) mod keyed;
pub(crate) mod windowing;

pub use keyed::GroupByKeyOptions;

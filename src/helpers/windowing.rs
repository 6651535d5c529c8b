//! Re-windowing a collection.
//!
//! ```
//! use ironbeam_combine::*;
//!
//! let p = Pipeline::default();
//! let events = from_timestamped(&p, vec![
//!     Timestamped::new(1_000, 1u64),
//!     Timestamped::new(9_000, 2),
//!     Timestamped::new(11_000, 3),
//! ]);
//!
//! let mut windows: Vec<_> = events
//!     .window_into(WindowFn::fixed(10_000)?)
//!     .collect_windowed_seq()?
//!     .into_iter()
//!     .map(|wv| wv.window)
//!     .collect();
//! windows.dedup();
//! assert_eq!(windows.len(), 2);
//! # anyhow::Result::<()>::Ok(())
//! ```

use crate::collection::{Data, PCollection};
use crate::window::{WindowFn, WindowedValue, WindowingStrategy};

impl<T: Data> PCollection<T> {
    /// Assign every element to the window `window_fn` picks for its timestamp.
    ///
    /// The accumulation mode of the current strategy is kept.
    pub fn window_into(self, window_fn: WindowFn) -> PCollection<T> {
        let strategy = WindowingStrategy { window_fn, mode: self.strategy.mode };
        let coder = self.coder.clone();
        let out = self
            .map_windowed(move |wv: &WindowedValue<T>| {
                vec![WindowedValue::new(wv.value.clone(), wv.timestamp, window_fn.assign(wv.timestamp))]
            })
            .with_windowing_strategy(strategy);
        match coder {
            Some(c) => out.set_coder(c),
            None => out,
        }
    }

    /// Same elements and windows, with a different accumulation mode.
    pub fn with_accumulation_mode(self, mode: crate::window::AccumulationMode) -> PCollection<T> {
        let strategy = self.strategy.with_mode(mode);
        self.with_windowing_strategy(strategy)
    }
}

//! Disk-cached parameter-sweep engine.
//!
//! Drives a callable over the cartesian product of parameter axes and
//! keyword dimensions, persisting each cell result to a deterministic path
//! derived from the call signature. Previously computed cells are reloaded
//! from disk instead of recomputed; missing cells can be in-painted with a
//! sentinel; post-processed aggregates are themselves cached.

#![deny(missing_docs)]

mod cache;
mod grid;
mod matrix;
mod pool;
mod signature;
mod sweep;

pub use cache::{cell_path, check_function_cache, ensure_parent, normalize_extension, FuncId};
pub use grid::{axes_nd_shape, axes_product, dict_product, kw_nd_shape, take_dicts, KwRange, KwSpec};
pub use matrix::{Cell, Dtype, ResultMatrix};
pub use pool::{build_pool, default_workers, io_workers};
pub use signature::{signature_string, ArgSpec, OptParam};
pub use sweep::{aggregate_cache_probe, sweep, sweep_on, CellFn, Kw, PostFn, SweepOpts};

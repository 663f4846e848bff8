//! The sweep orchestrator.
//!
//! Two passes over the cell space: a run pass that executes the callable
//! for cells with no persisted result, and a load pass that deserializes
//! (and optionally post-processes) everything else from disk. Workers hand
//! `(index, path, outcome)` tuples back to the orchestrator; placement into
//! the matrix is by flattened index, so output ordering is deterministic
//! even though execution order is not.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::Value;

use labkit_core::errors::{ErrorInfo, LabError};
use labkit_core::hash::dict_hash;
use labkit_core::serde::{from_json_slice, to_canonical_json_bytes};

use crate::cache::{cell_path, check_function_cache, ensure_parent, normalize_extension, FuncId};
use crate::grid::{axes_nd_shape, axes_product, dict_product, kw_nd_shape, KwSpec};
use crate::matrix::{Cell, ResultMatrix};
use crate::pool::{build_pool, default_workers, io_workers};
use crate::signature::{signature_string, ArgSpec};

fn io_error(code: &str, err: impl ToString) -> LabError {
    LabError::Io(ErrorInfo::new(code, err.to_string()))
}

/// The callable driven by a sweep, with its identity and parameter spec.
///
/// The callable receives every bound argument by name: required parameters
/// bound to the cell's grid tuple, merged with the cell's keyword mapping
/// (keywords win on collision). Returning `Ok(None)` means the callable
/// persisted its own result (or produced nothing); returning a value lets
/// the engine persist it.
pub struct CellFn<'a> {
    /// Stable identity used for cache paths.
    pub id: FuncId,
    /// Declared parameters and defaults, used for signature encoding.
    pub spec: ArgSpec,
    /// The function evaluated per cell.
    pub call: &'a (dyn Fn(&BTreeMap<String, Value>) -> Result<Option<Value>, LabError> + Sync),
}

/// Post-load transform applied to a raw cell value, with its identity.
///
/// The identity keys the aggregate cache, so sweeps that differ only in
/// their post-process land on distinct cache entries.
pub struct PostFn<'a> {
    /// Stable identity used for the aggregate-cache path.
    pub id: FuncId,
    /// The transform applied to each loaded cell.
    pub call: &'a (dyn Fn(&Value, &BTreeMap<String, Value>) -> Result<Value, LabError> + Sync),
}

/// Keyword input for a sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum Kw {
    /// A single ordered mapping, expanded into columns via [`dict_product`]
    /// and reshaped back into its dimensions at the end.
    Map(KwSpec),
    /// An explicit list of keyword mappings, one per column; no reshape.
    List(Vec<BTreeMap<String, Value>>),
}

impl Default for Kw {
    fn default() -> Self {
        Kw::Map(KwSpec::new())
    }
}

/// Options governing sweep execution.
#[derive(Debug, Clone)]
pub struct SweepOpts {
    /// Root directory for per-cell result files.
    pub savepath_prefix: PathBuf,
    /// Root directory for the aggregate post-process cache.
    pub cache_root: PathBuf,
    /// File suffix for persisted cell results; normalized to start with a dot.
    pub extension: String,
    /// Recompute and re-save cells even when a file exists.
    pub overwrite: bool,
    /// Sentinel substituted for any cell that could not be produced.
    /// When set, no cell is ever executed.
    pub inpaint: Option<Value>,
    /// Cache the post-processed aggregate matrix.
    pub cache: bool,
    /// Ignore the current aggregate cache and overwrite it afterwards.
    pub refresh: bool,
    /// Log a line per loaded cell with its path and file size.
    pub verbose: bool,
    /// Merge the cell's keyword mapping into the post-process keywords.
    pub pass_kw: bool,
    /// Keywords forwarded to the post-process function.
    pub post_kw: BTreeMap<String, Value>,
    /// Worker count for the CPU-bound pass; defaults to available
    /// parallelism minus one.
    pub workers: Option<usize>,
    /// Surface a final reshape mismatch as an error instead of warning and
    /// returning the flat matrix.
    pub strict_reshape: bool,
    /// Cooperative cancellation flag; once set, workers skip remaining cells
    /// so the pool drains promptly.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SweepOpts {
    fn default() -> Self {
        Self {
            savepath_prefix: PathBuf::from("."),
            cache_root: PathBuf::from(".cache"),
            extension: ".json".to_string(),
            overwrite: false,
            inpaint: None,
            cache: false,
            refresh: false,
            verbose: true,
            pass_kw: false,
            post_kw: BTreeMap::new(),
            workers: None,
            strict_reshape: false,
            cancel: None,
        }
    }
}

struct RunOutcome {
    k: usize,
    path: PathBuf,
    value: Option<Value>,
}

/// Runs a sweep on freshly built pools sized from `opts.workers`.
pub fn sweep(
    func: &CellFn<'_>,
    axes: &[Vec<Value>],
    kw: &Kw,
    post: Option<&PostFn<'_>>,
    opts: &SweepOpts,
) -> Result<ResultMatrix, LabError> {
    let workers = opts.workers.unwrap_or_else(default_workers);
    let run_pool = build_pool(workers)?;
    let load_pool = if post.is_none() {
        Some(build_pool(io_workers(workers))?)
    } else {
        None
    };
    sweep_core(func, axes, kw, post, opts, &run_pool, load_pool.as_ref())
}

/// Runs a sweep on a caller-supplied pool, used for both passes.
pub fn sweep_on(
    pool: &rayon::ThreadPool,
    func: &CellFn<'_>,
    axes: &[Vec<Value>],
    kw: &Kw,
    post: Option<&PostFn<'_>>,
    opts: &SweepOpts,
) -> Result<ResultMatrix, LabError> {
    sweep_core(func, axes, kw, post, opts, pool, None)
}

/// Resolves the aggregate-cache entry for a sweep configuration.
///
/// Entries live under the post-process identity; the key salts the
/// post-process keyword hash with a hash of the grid, the keyword set, and
/// the sweep function's save directory, so any change to the sweep's inputs
/// or its post-process lands on a different cache file. Returns the cached
/// matrix (when loadable) and its path. A corrupt cache file is a miss.
pub fn aggregate_cache_probe(
    func: &CellFn<'_>,
    axes: &[Vec<Value>],
    kw: &Kw,
    post_id: &FuncId,
    opts: &SweepOpts,
) -> Result<(Option<ResultMatrix>, PathBuf), LabError> {
    let grid = axes_product(axes);
    let kw_list = normalize_kw(kw);
    probe_cache(func, post_id, &grid, &kw_list, opts, true)
}

fn normalize_kw(kw: &Kw) -> Vec<BTreeMap<String, Value>> {
    match kw {
        Kw::Map(spec) => dict_product(spec),
        Kw::List(list) => list.clone(),
    }
}

fn probe_cache(
    func: &CellFn<'_>,
    post_id: &FuncId,
    grid: &[Vec<Value>],
    kw_list: &[BTreeMap<String, Value>],
    opts: &SweepOpts,
    load: bool,
) -> Result<(Option<ResultMatrix>, PathBuf), LabError> {
    let savedir = func.id.savedir().to_string_lossy().to_string();
    let salt = dict_hash(&(grid, kw_list, savedir), None)?;
    match check_function_cache::<ResultMatrix>(
        &opts.cache_root,
        post_id,
        &opts.post_kw,
        Some(&salt),
        load,
    ) {
        Ok(found) => Ok(found),
        Err(LabError::Serde(info)) => {
            // Corrupt aggregate cache: discard and recompute.
            tracing::warn!(code = %info.code, "unreadable aggregate cache, treating as miss");
            let (_, path) = check_function_cache::<ResultMatrix>(
                &opts.cache_root,
                post_id,
                &opts.post_kw,
                Some(&salt),
                false,
            )?;
            Ok((None, path))
        }
        Err(other) => Err(other),
    }
}

fn sweep_core(
    func: &CellFn<'_>,
    axes: &[Vec<Value>],
    kw: &Kw,
    post: Option<&PostFn<'_>>,
    opts: &SweepOpts,
    run_pool: &rayon::ThreadPool,
    load_pool: Option<&rayon::ThreadPool>,
) -> Result<ResultMatrix, LabError> {
    if func.spec.required.len() != axes.len() {
        return Err(LabError::Config(
            ErrorInfo::new("sweep_arity", "parameter axes do not match required parameters")
                .with_context("required", func.spec.required.len().to_string())
                .with_context("axes", axes.len().to_string()),
        ));
    }

    let extension = normalize_extension(&opts.extension);
    let grid = axes_product(axes);
    let kw_list = normalize_kw(kw);
    let rows = grid.len().max(1);
    let cols = kw_list.len();

    // Aggregate cache applies only when a post-process is configured.
    let mut cache_entry: Option<PathBuf> = None;
    let mut results: Option<ResultMatrix> = None;
    if let Some(post) = post.filter(|_| opts.cache) {
        let load = !(opts.refresh || opts.overwrite);
        let (cached, path) = probe_cache(func, &post.id, &grid, &kw_list, opts, load)?;
        cache_entry = Some(path);
        results = cached.filter(|matrix| matrix.shape() == [rows, cols]);
    }
    let mut results = results.unwrap_or_else(|| ResultMatrix::pending(rows, cols));

    let to_check = results.pending_indices();
    let possibly_new = !to_check.is_empty();

    let outcomes: Result<Vec<RunOutcome>, LabError> = run_pool.install(|| {
        to_check
            .par_iter()
            .map(|&k| run_cell(func, &grid, &kw_list, cols, k, &extension, opts))
            .collect()
    });
    let mut outcomes = outcomes?;
    outcomes.sort_by_key(|outcome| outcome.k);

    let mut paths: Vec<Option<PathBuf>> = vec![None; results.len()];
    for outcome in outcomes {
        paths[outcome.k] = Some(outcome.path);
        if let Some(value) = outcome.value {
            results.set(outcome.k, Cell::Value(value));
        }
    }

    // Pure loading is I/O bound; use the wider pool when one was built.
    let needed = results.pending_indices();
    let loaded: Vec<(usize, Cell)> = match (post, load_pool) {
        (None, Some(pool)) => pool.install(|| {
            needed
                .par_iter()
                .map(|&k| (k, load_cell(&kw_list, cols, k, &paths, post, opts)))
                .collect()
        }),
        _ => run_pool.install(|| {
            needed
                .par_iter()
                .map(|&k| (k, load_cell(&kw_list, cols, k, &paths, post, opts)))
                .collect()
        }),
    };
    for (k, cell) in loaded {
        results.set(k, cell);
    }

    if possibly_new && post.is_some() && opts.cache {
        if let Some(path) = &cache_entry {
            ensure_parent(path)?;
            let bytes = to_canonical_json_bytes(&results)?;
            fs::write(path, bytes).map_err(|err| io_error("cache_write", err))?;
        }
    }

    // In-paint after the aggregate has been cached, mirroring run order.
    if let Some(sentinel) = &opts.inpaint {
        results.inpaint(sentinel);
    }

    results.coerce_dtype();

    if let Kw::Map(spec) = kw {
        let mut dims = axes_nd_shape(axes);
        dims.extend(kw_nd_shape(spec));
        if let Err(err) = results.reshape(&dims) {
            if opts.strict_reshape {
                return Err(err);
            }
            tracing::warn!(error = %err, "reshape skipped, returning flat matrix");
        }
    }

    Ok(results)
}

fn cancelled(opts: &SweepOpts) -> bool {
    opts.cancel
        .as_ref()
        .map(|flag| flag.load(Ordering::SeqCst))
        .unwrap_or(false)
}

fn bind_cell(
    func: &CellFn<'_>,
    grid: &[Vec<Value>],
    kw_list: &[BTreeMap<String, Value>],
    cols: usize,
    k: usize,
) -> BTreeMap<String, Value> {
    let (i, j) = (k / cols, k % cols);
    let empty: Vec<Value> = Vec::new();
    let tuple = grid.get(i).unwrap_or(&empty);
    let mut bound: BTreeMap<String, Value> = func
        .spec
        .required
        .iter()
        .cloned()
        .zip(tuple.iter().cloned())
        .collect();
    for (key, value) in &kw_list[j] {
        bound.insert(key.clone(), value.clone());
    }
    bound
}

fn run_cell(
    func: &CellFn<'_>,
    grid: &[Vec<Value>],
    kw_list: &[BTreeMap<String, Value>],
    cols: usize,
    k: usize,
    extension: &str,
    opts: &SweepOpts,
) -> Result<RunOutcome, LabError> {
    let bound = bind_cell(func, grid, kw_list, cols, k);
    let sig = signature_string(&func.spec, &bound)?;
    let path = cell_path(&opts.savepath_prefix, &func.id, &sig, extension);

    if cancelled(opts) {
        return Ok(RunOutcome {
            k,
            path,
            value: None,
        });
    }

    let run = opts.inpaint.is_none() && (opts.overwrite || !path.exists());
    let mut value = None;
    if run {
        value = (func.call)(&bound)?;
        if let Some(result) = &value {
            if !path.exists() {
                ensure_parent(&path)?;
                let bytes = to_canonical_json_bytes(result)?;
                fs::write(&path, bytes).map_err(|err| {
                    LabError::Io(
                        ErrorInfo::new("cell_write", "failed to persist cell result")
                            .with_context("path", path.display().to_string())
                            .with_hint(err.to_string()),
                    )
                })?;
            }
        }
    }
    Ok(RunOutcome { k, path, value })
}

fn load_cell(
    kw_list: &[BTreeMap<String, Value>],
    cols: usize,
    k: usize,
    paths: &[Option<PathBuf>],
    post: Option<&PostFn<'_>>,
    opts: &SweepOpts,
) -> Cell {
    if cancelled(opts) {
        return Cell::Missing;
    }
    let path = match &paths[k] {
        Some(path) => path,
        None => return Cell::Missing,
    };
    if !path.exists() {
        return Cell::Missing;
    }
    match try_load(kw_list, cols, k, path, post, opts) {
        Ok(value) => Cell::Value(value),
        Err(err) => {
            tracing::warn!(
                cell = k,
                path = %path.display(),
                error = %err,
                "failed to load or post-process cell, marking for in-paint"
            );
            Cell::Missing
        }
    }
}

fn try_load(
    kw_list: &[BTreeMap<String, Value>],
    cols: usize,
    k: usize,
    path: &Path,
    post: Option<&PostFn<'_>>,
    opts: &SweepOpts,
) -> Result<Value, LabError> {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let bytes = fs::read(path).map_err(|err| io_error("cell_read", err))?;
    let raw: Value = from_json_slice(&bytes)?;
    let value = match post {
        Some(post) => {
            let mut post_kw = opts.post_kw.clone();
            if opts.pass_kw {
                for (key, value) in &kw_list[k % cols] {
                    post_kw.insert(key.clone(), value.clone());
                }
            }
            (post.call)(&raw, &post_kw)?
        }
        None => raw,
    };
    if opts.verbose {
        tracing::info!(
            cell = k,
            path = %path.display(),
            size_mb = size as f64 / (1024.0 * 1024.0),
            "loaded cell"
        );
    }
    Ok(value)
}

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use labkit_core::errors::{ErrorInfo, LabError};
use labkit_sweep::{sweep, ArgSpec, Cell, CellFn, FuncId, Kw, SweepOpts};
use serde_json::{json, Value};

mod common;
use common::quiet_opts;

#[test]
fn axis_arity_mismatch_is_a_config_error() {
    let temp = tempfile::tempdir().unwrap();
    let call = |_: &BTreeMap<String, Value>| -> Result<Option<Value>, LabError> { Ok(None) };
    let func = CellFn {
        id: FuncId::new("experiments", "misconfigured"),
        spec: ArgSpec::new(["x", "y"]),
        call: &call,
    };
    let err = sweep(
        &func,
        &[vec![json!(1)]],
        &Kw::List(vec![BTreeMap::new()]),
        None,
        &quiet_opts(temp.path()),
    )
    .unwrap_err();
    assert!(matches!(err, LabError::Config(_)));
    assert_eq!(err.info().code, "sweep_arity");
}

#[test]
fn run_phase_failures_abort_the_sweep() {
    let temp = tempfile::tempdir().unwrap();
    let call = |bound: &BTreeMap<String, Value>| -> Result<Option<Value>, LabError> {
        if bound["x"] == json!(2) {
            return Err(LabError::Cell(ErrorInfo::new("boom", "unstable input")));
        }
        Ok(Some(bound["x"].clone()))
    };
    let func = CellFn {
        id: FuncId::new("experiments", "unstable"),
        spec: ArgSpec::new(["x"]),
        call: &call,
    };
    let err = sweep(
        &func,
        &[vec![json!(1), json!(2)]],
        &Kw::List(vec![BTreeMap::new()]),
        None,
        &quiet_opts(temp.path()),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "boom");
}

#[test]
fn empty_axis_leaves_required_parameter_unbound() {
    let temp = tempfile::tempdir().unwrap();
    let call = |bound: &BTreeMap<String, Value>| -> Result<Option<Value>, LabError> {
        Ok(Some(bound["x"].clone()))
    };
    let func = CellFn {
        id: FuncId::new("experiments", "identity"),
        spec: ArgSpec::new(["x"]),
        call: &call,
    };
    // An empty axis produces an empty grid, so the single logical cell has
    // no value to bind to `x`.
    let err = sweep(
        &func,
        &[Vec::<Value>::new()],
        &Kw::List(vec![BTreeMap::new()]),
        None,
        &quiet_opts(temp.path()),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "sig_unbound");
}

#[test]
fn cancellation_skips_remaining_cells() {
    let temp = tempfile::tempdir().unwrap();
    let cancel = Arc::new(AtomicBool::new(true));
    let call = |_: &BTreeMap<String, Value>| -> Result<Option<Value>, LabError> {
        panic!("must not run after cancellation");
    };
    let func = CellFn {
        id: FuncId::new("experiments", "cancelled"),
        spec: ArgSpec::new(["x"]),
        call: &call,
    };
    let opts = SweepOpts {
        cancel: Some(Arc::clone(&cancel)),
        ..quiet_opts(temp.path())
    };
    let matrix = sweep(
        &func,
        &[vec![json!(1), json!(2)]],
        &Kw::List(vec![BTreeMap::new()]),
        None,
        &opts,
    )
    .unwrap();
    assert!(matrix.cells().all(|cell| cell == &Cell::Missing));
}

#[test]
fn cancellation_skips_the_load_pass_too() {
    let temp = tempfile::tempdir().unwrap();
    let call = |bound: &BTreeMap<String, Value>| -> Result<Option<Value>, LabError> {
        Ok(Some(bound["x"].clone()))
    };
    let func = CellFn {
        id: FuncId::new("experiments", "persisted"),
        spec: ArgSpec::new(["x"]),
        call: &call,
    };
    let axes = [vec![json!(1), json!(2)]];
    let kw = Kw::List(vec![BTreeMap::new()]);
    let opts = quiet_opts(temp.path());

    // Persist every cell, then cancel before the second sweep starts.
    sweep(&func, &axes, &kw, None, &opts).unwrap();
    let cancelled = SweepOpts {
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..opts
    };
    let matrix = sweep(&func, &axes, &kw, None, &cancelled).unwrap();
    assert!(matrix.cells().all(|cell| cell == &Cell::Missing));
}

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use labkit_core::errors::LabError;
use labkit_sweep::{ArgSpec, FuncId, SweepOpts};
use serde_json::Value;

/// Counts how many times a cell callable actually ran.
#[derive(Default)]
pub struct CallCounter(AtomicUsize);

impl CallCounter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn quiet_opts(prefix: &Path) -> SweepOpts {
    SweepOpts {
        savepath_prefix: prefix.to_path_buf(),
        cache_root: prefix.join(".cache"),
        verbose: false,
        workers: Some(2),
        ..SweepOpts::default()
    }
}

pub fn product_id() -> FuncId {
    FuncId::new("experiments", "product")
}

pub fn product_spec() -> ArgSpec {
    ArgSpec::new(["x", "y"])
}

/// `x * y` over integer-valued arguments.
pub fn product_call(bound: &BTreeMap<String, Value>) -> Result<Option<Value>, LabError> {
    let x = bound["x"].as_i64().unwrap();
    let y = bound["y"].as_i64().unwrap();
    Ok(Some(Value::from(x * y)))
}

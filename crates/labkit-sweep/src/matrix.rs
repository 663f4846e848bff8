//! Row-major result container for sweep cells.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use labkit_core::errors::{ErrorInfo, LabError};

/// State of one sweep cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Not yet computed or loaded.
    Pending,
    /// Materialized result.
    Value(Value),
    /// Could not be produced; eligible for in-painting.
    Missing,
}

impl Cell {
    /// The materialized value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Cell::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Element kind detected when every cell holds a consistent scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    /// All cells are booleans.
    Bool,
    /// All cells are integers.
    Int,
    /// All cells are numbers with at least one non-integer.
    Float,
    /// All cells are strings.
    Str,
}

/// N-dimensional result container with row-major flat storage.
///
/// Invariant: `cells.len()` equals the product of `shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMatrix {
    shape: Vec<usize>,
    dtype: Option<Dtype>,
    cells: Vec<Cell>,
}

impl ResultMatrix {
    /// Creates an all-pending matrix with the given 2-D logical shape.
    pub fn pending(rows: usize, cols: usize) -> Self {
        Self {
            shape: vec![rows, cols],
            dtype: None,
            cells: vec![Cell::Pending; rows * cols],
        }
    }

    /// Current dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Detected element kind, if the matrix was coerced.
    pub fn dtype(&self) -> Option<Dtype> {
        self.dtype
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the matrix holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at the flattened index.
    pub fn cell(&self, k: usize) -> &Cell {
        &self.cells[k]
    }

    /// Replaces the cell at the flattened index.
    pub fn set(&mut self, k: usize, cell: Cell) {
        self.cells[k] = cell;
    }

    /// Cell at a multi-dimensional index, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&Cell> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (idx, dim) in index.iter().zip(&self.shape) {
            if idx >= dim {
                return None;
            }
            flat = flat * dim + idx;
        }
        self.cells.get(flat)
    }

    /// Flattened indices of cells still pending.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(k, cell)| matches!(cell, Cell::Pending).then_some(k))
            .collect()
    }

    /// Iterator over all cells in flat order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Replaces every non-materialized cell with the sentinel value.
    pub fn inpaint(&mut self, sentinel: &Value) {
        for cell in &mut self.cells {
            if !matches!(cell, Cell::Value(_)) {
                *cell = Cell::Value(sentinel.clone());
            }
        }
    }

    /// Records the element kind when every cell holds a consistent scalar.
    ///
    /// Integers and floats mix down to [`Dtype::Float`]; any other mixture,
    /// a composite value, or a non-materialized cell leaves the matrix
    /// generic. Never fails.
    pub fn coerce_dtype(&mut self) {
        let mut detected: Option<Dtype> = None;
        for cell in &self.cells {
            let kind = match cell.value() {
                Some(Value::Bool(_)) => Dtype::Bool,
                Some(Value::Number(n)) => {
                    if n.is_i64() || n.is_u64() {
                        Dtype::Int
                    } else {
                        Dtype::Float
                    }
                }
                Some(Value::String(_)) => Dtype::Str,
                _ => {
                    self.dtype = None;
                    return;
                }
            };
            detected = match (detected, kind) {
                (None, kind) => Some(kind),
                (Some(current), kind) if current == kind => Some(current),
                (Some(Dtype::Int), Dtype::Float) | (Some(Dtype::Float), Dtype::Int) => {
                    Some(Dtype::Float)
                }
                _ => {
                    self.dtype = None;
                    return;
                }
            };
        }
        self.dtype = detected;
    }

    /// Reinterprets the flat storage under new dimensions.
    pub fn reshape(&mut self, dims: &[usize]) -> Result<(), LabError> {
        let product: usize = dims.iter().product();
        if product != self.cells.len() {
            return Err(LabError::Shape(
                ErrorInfo::new("reshape_mismatch", "dimension product does not match cell count")
                    .with_context("cells", self.cells.len().to_string())
                    .with_context("dims", format!("{dims:?}")),
            ));
        }
        self.shape = dims.to_vec();
        Ok(())
    }

    /// All cell values as `f64`, when a numeric or boolean dtype applies.
    pub fn as_f64s(&self) -> Option<Vec<f64>> {
        match self.dtype? {
            Dtype::Str => None,
            _ => self
                .cells
                .iter()
                .map(|cell| match cell.value() {
                    Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
                    Some(Value::Number(n)) => n.as_f64(),
                    _ => None,
                })
                .collect(),
        }
    }
}

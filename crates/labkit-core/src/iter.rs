//! Small slice helpers for locating extrema and first elements.

/// Returns the first item of an iterator, if any.
pub fn first_item<I: IntoIterator>(iter: I) -> Option<I::Item> {
    iter.into_iter().next()
}

/// Index of the minimum element, comparing by partial order.
///
/// Returns `None` for an empty slice. Incomparable pairs (NaN) keep the
/// earlier candidate.
pub fn imin<T: PartialOrd>(values: &[T]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, value) in values.iter().enumerate() {
        match best {
            None => best = Some(idx),
            Some(current) => {
                if value < &values[current] {
                    best = Some(idx);
                }
            }
        }
    }
    best
}

/// Index of the maximum element, comparing by partial order.
pub fn imax<T: PartialOrd>(values: &[T]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, value) in values.iter().enumerate() {
        match best {
            None => best = Some(idx),
            Some(current) => {
                if value > &values[current] {
                    best = Some(idx);
                }
            }
        }
    }
    best
}

/// Minimum element together with its index.
pub fn min_and_loc<T: PartialOrd + Copy>(values: &[T]) -> Option<(T, usize)> {
    imin(values).map(|idx| (values[idx], idx))
}

/// Maximum element together with its index.
pub fn max_and_loc<T: PartialOrd + Copy>(values: &[T]) -> Option<(T, usize)> {
    imax(values).map(|idx| (values[idx], idx))
}

//! Re-grouping of connected geoms around missing values
//!
//! A line or path cannot be drawn through a missing value. Instead of
//! interpolating over the gap, each run of complete rows becomes its own group
//! and the incomplete rows are removed.

use polars::prelude::*;
use std::cmp::Ordering;

use crate::data::{column_values, has_column, rows_with_missing, take_rows};
use crate::naming::GROUP_COLUMN;
use crate::{DataFrame, Result};

/// Split groups at rows holding a missing value
///
/// Rows are stable-sorted by `key_columns`, then scanned in order: a new group
/// starts whenever the row is the first incomplete row after a complete one, or
/// when any key column differs from the previous row. Group ids count from 0 and
/// replace the `group` column; incomplete rows are dropped.
///
/// Columns missing in every row do not count. Frames without a `group` column or
/// without missing values are returned as is.
pub fn split_na_groups(data: DataFrame, key_columns: &[String]) -> Result<DataFrame> {
    if !has_column(&data, GROUP_COLUMN) {
        return Ok(data);
    }
    let missing = rows_with_missing(&data)?;
    if !missing.iter().any(|m| *m) {
        return Ok(data);
    }

    let keys = key_columns
        .iter()
        .filter(|c| has_column(&data, c))
        .map(|c| column_values(&data, c))
        .collect::<Result<Vec<_>>>()?;
    let compare = |a: usize, b: usize| {
        keys.iter()
            .map(|column| column[a].compare(&column[b]))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    };

    let mut order: Vec<usize> = (0..data.height()).collect();
    order.sort_by(|&a, &b| compare(a, b));

    let mut group = 0i64;
    let mut kept = Vec::new();
    let mut ids = Vec::new();
    for (i, &row) in order.iter().enumerate() {
        if i > 0 {
            let previous = order[i - 1];
            let gap_starts = missing[row] && !missing[previous];
            if gap_starts || compare(previous, row).is_ne() {
                group += 1;
            }
        }
        if !missing[row] {
            kept.push(row);
            ids.push(group);
        }
    }

    let mut out = take_rows(&data, &kept)?;
    out.with_column(Series::new(GROUP_COLUMN.into(), ids))?;
    Ok(out)
}

/// The rows [`split_na_groups`] keeps, in their original order
pub fn complete_rows(data: &DataFrame) -> Result<DataFrame> {
    let missing = rows_with_missing(data)?;
    if !missing.iter().any(|m| *m) {
        return Ok(data.clone());
    }
    let kept: Vec<usize> = (0..data.height()).filter(|&row| !missing[row]).collect();
    take_rows(data, &kept)
}

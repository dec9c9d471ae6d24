//! Step geom pre-processing

use std::collections::HashMap;

use super::{GeomData, GeomKind};
use crate::data::{column_keys, has_column, take_rows};
use crate::naming::GROUP_COLUMN;
use crate::{AnimintError, Result};

/// Row positions of the stair-step expansion of each group
///
/// For rows `0..n` of a group the step visits `(x0, y0), (x1, y0), (x1, y1), ...`,
/// so `y_rows` repeats each row and `x_rows` runs one ahead on the horizontal
/// segments. Groups keep their order of first appearance.
pub(crate) fn stairstep_rows(groups: &[Vec<usize>]) -> (Vec<usize>, Vec<usize>) {
    let mut x_rows = Vec::new();
    let mut y_rows = Vec::new();
    for rows in groups {
        for (i, &row) in rows.iter().enumerate() {
            x_rows.push(row);
            y_rows.push(row);
            if let Some(&next) = rows.get(i + 1) {
                x_rows.push(next);
                y_rows.push(row);
            }
        }
    }
    (x_rows, y_rows)
}

/// Steps are exported as stair-stepped paths
pub(super) fn pre_process(mut input: GeomData) -> Result<GeomData> {
    for required in ["x", "y"] {
        if !has_column(&input.data, required) {
            return Err(AnimintError::DataError(format!(
                "Step layer requires a '{}' column",
                required
            )));
        }
    }

    let groups: Vec<Vec<usize>> = if has_column(&input.data, GROUP_COLUMN) {
        let keys = column_keys(&input.data, GROUP_COLUMN)?;
        let mut index: HashMap<Option<String>, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (row, key) in keys.into_iter().enumerate() {
            let g = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(row);
        }
        groups
    } else {
        vec![(0..input.data.height()).collect()]
    };

    let (x_rows, y_rows) = stairstep_rows(&groups);
    let x = take_rows(&input.data, &x_rows)?
        .column("x")?
        .as_materialized_series()
        .clone();
    let mut data = take_rows(&input.data, &y_rows)?;
    data.with_column(x)?;

    input.data = data;
    input.geom = GeomKind::Path;
    Ok(input)
}

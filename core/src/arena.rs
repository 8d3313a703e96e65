// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Result, SortError};
use crate::{Number, Rank};

/// Row-major matrix of numbers in a single contiguous allocation.
///
/// Rows are addressed by stride (`row * columns`), so a run of consecutive
/// rows is itself a contiguous slice that can be sent or received as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberArena {
    data: Vec<Number>,
    rows: usize,
    columns: usize,
}

/// Order-independent digest of a row, used to check that sorting only permutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowFingerprint {
    pub sum: i64,
    pub mix: u64,
}

impl NumberArena {
    /// Allocate a zeroed `rows x columns` arena, reporting allocation failure
    /// instead of aborting.
    pub fn new(rows: usize, columns: usize) -> Result<Self> {
        let elements = rows
            .checked_mul(columns)
            .ok_or_else(|| SortError::allocation(usize::MAX, "element count overflows usize"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(elements)
            .map_err(|e| SortError::allocation(elements, e.to_string()))?;
        data.resize(elements, 0);

        Ok(Self {
            data,
            rows,
            columns,
        })
    }

    pub fn from_vec(data: Vec<Number>, columns: usize) -> Result<Self> {
        if columns == 0 || data.len() % columns != 0 {
            return Err(SortError::config(format!(
                "{} elements cannot be split into rows of {}",
                data.len(),
                columns
            )));
        }
        let rows = data.len() / columns;
        Ok(Self {
            data,
            rows,
            columns,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn as_slice(&self) -> &[Number] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Number] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<Number> {
        self.data
    }

    pub fn row(&self, row: usize) -> Option<&[Number]> {
        self.rows_slice(row, 1)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [Number]> {
        self.rows_slice_mut(row, 1)
    }

    /// Contiguous view over `count` rows starting at `first`
    pub fn rows_slice(&self, first: usize, count: usize) -> Option<&[Number]> {
        let (start, end) = self.span(first, count)?;
        Some(&self.data[start..end])
    }

    pub fn rows_slice_mut(&mut self, first: usize, count: usize) -> Option<&mut [Number]> {
        let (start, end) = self.span(first, count)?;
        Some(&mut self.data[start..end])
    }

    fn span(&self, first: usize, count: usize) -> Option<(usize, usize)> {
        let last = first.checked_add(count)?;
        if last > self.rows {
            return None;
        }
        Some((first * self.columns, last * self.columns))
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Number]> {
        // chunks_exact panics on zero, and an empty arena has no rows anyway
        self.data.chunks_exact(self.columns.max(1))
    }

    pub fn is_sorted_rows(&self) -> bool {
        self.iter_rows()
            .all(|row| row.windows(2).all(|pair| pair[0] <= pair[1]))
    }

    pub fn fingerprints(&self) -> Vec<RowFingerprint> {
        self.iter_rows().map(RowFingerprint::of).collect()
    }

    /// Debug dump of the first and last `edge_rows` rows, showing the first
    /// and last three elements of each.
    pub fn preview(&self, rank: Rank, edge_rows: usize) -> Vec<String> {
        let mut lines = Vec::new();
        if self.rows <= edge_rows * 2 {
            lines.extend(self.iter_rows().map(|row| format_row(rank, row)));
            return lines;
        }

        lines.extend(
            self.iter_rows()
                .take(edge_rows)
                .map(|row| format_row(rank, row)),
        );
        lines.push(" ...".to_string());
        lines.extend(
            self.iter_rows()
                .skip(self.rows - edge_rows)
                .map(|row| format_row(rank, row)),
        );
        lines
    }
}

fn format_row(rank: Rank, row: &[Number]) -> String {
    let format_all = |values: &[Number]| {
        values
            .iter()
            .map(|value| format!("{:07}", value))
            .collect::<Vec<_>>()
            .join(" ")
    };

    if row.len() <= 6 {
        return format!("[{}] [ {} ]", rank, format_all(row));
    }
    format!(
        "[{}] [ {}  ...  {} ]",
        rank,
        format_all(&row[..3]),
        format_all(&row[row.len() - 3..])
    )
}

impl RowFingerprint {
    pub fn of(row: &[Number]) -> Self {
        row.iter().fold(Self { sum: 0, mix: 0 }, |acc, &value| {
            // splitmix64 finalizer, combined with a commutative add
            let mut z = (value as i64 as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^= z >> 31;
            Self {
                sum: acc.sum.wrapping_add(value as i64),
                mix: acc.mix.wrapping_add(z),
            }
        })
    }
}

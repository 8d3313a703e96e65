// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::arena::NumberArena;
use crate::error::{Result, SortError};
use crate::job_layout::JobLayout;
use crate::Number;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Every array strictly descending, the worst case for an ascending sort
    #[default]
    Descending,
    /// Uniform random values
    Random,
}

/// Allocate and fill the full dataset for `layout`
pub fn generate(layout: &JobLayout, kind: DatasetKind, seed: Option<u64>) -> Result<NumberArena> {
    let mut arena = NumberArena::new(layout.total_arrays(), layout.array_length())?;
    match kind {
        DatasetKind::Descending => fill_descending(&mut arena)?,
        DatasetKind::Random => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            fill_random(&mut arena, &mut rng);
        }
    }
    Ok(arena)
}

/// `value(i, n) = rows * columns - i * columns - n`
pub fn fill_descending(arena: &mut NumberArena) -> Result<()> {
    let columns = arena.columns();
    let total = arena.rows() * columns;
    if Number::try_from(total).is_err() {
        return Err(SortError::config(format!(
            "{} elements exceed the range of a descending fill",
            total
        )));
    }

    for (i, value) in arena.as_mut_slice().iter_mut().enumerate() {
        // i == row * columns + n
        *value = (total - i) as Number;
    }
    Ok(())
}

pub fn fill_random(arena: &mut NumberArena, rng: &mut impl Rng) {
    let max = Number::try_from(arena.rows() * arena.columns()).unwrap_or(Number::MAX);
    for value in arena.as_mut_slice() {
        *value = rng.random_range(0..=max);
    }
}

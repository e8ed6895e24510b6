// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Column budget derived from the viewport width.

use crate::columns::{ColumnError, ColumnStack};

const BREAKPOINTS: [(u32, usize); 3] = [(600, 1), (900, 2), (1200, 3)];
const WIDEST_BUDGET: usize = 4;

/// Number of columns that fit side by side at `width` pixels.
pub fn max_columns(width: u32) -> usize {
    BREAKPOINTS
        .iter()
        .find(|(limit, _)| width < *limit)
        .map_or(WIDEST_BUDGET, |(_, budget)| *budget)
}

pub fn column_width(width: u32) -> u32 {
    let budget = u32::try_from(max_columns(width)).unwrap_or(1);
    (width / budget).saturating_sub(1)
}

/// Collapses or expands columns after the budget moved from `old` to `new`.
///
/// A shrinking budget collapses expanded columns from the left; a growing
/// one re-expands collapsed columns from the right. At most `|old - new|`
/// columns change.
pub fn reconcile(stack: &mut ColumnStack, old: usize, new: usize) -> Result<usize, ColumnError> {
    let expanded = stack.expanded_count();
    let ids = stack.ids();
    let mut changed = 0;

    if old > new && expanded > new {
        let wanted = old - new;
        for id in ids {
            if changed == wanted {
                break;
            }
            if stack.collapse(id)? {
                changed += 1;
            }
        }
    } else if old < new && expanded < new {
        let wanted = new - old;
        for id in ids.into_iter().rev() {
            if changed == wanted {
                break;
            }
            if stack.expand(id)? {
                changed += 1;
            }
        }
    }
    Ok(changed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    budget: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Viewport {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            budget: max_columns(width),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn column_width(&self) -> u32 {
        column_width(self.width)
    }

    /// Records a new width and returns the previous budget.
    pub fn resize(&mut self, width: u32) -> usize {
        let old = self.budget;
        self.width = width;
        self.budget = max_columns(width);
        old
    }
}

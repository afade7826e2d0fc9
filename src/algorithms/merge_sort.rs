use crate::model::{Algorithm, DataStructure};

use super::format_values;

#[derive(Debug, Clone, Default)]
pub struct MergeSort {
    result: Vec<i32>,
}

impl MergeSort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn result(&self) -> &[i32] {
        &self.result
    }

    /// Top-down merge sort; `on_merge` sees each merged run
    pub fn sort_with(values: &mut [i32], on_merge: &mut impl FnMut(&[i32])) {
        if values.len() < 2 {
            return;
        }
        let mid = values.len() / 2;
        Self::sort_with(&mut values[..mid], on_merge);
        Self::sort_with(&mut values[mid..], on_merge);

        let mut merged = Vec::with_capacity(values.len());
        let (left, right) = values.split_at(mid);
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            if left[i] <= right[j] {
                merged.push(left[i]);
                i += 1;
            } else {
                merged.push(right[j]);
                j += 1;
            }
        }
        merged.extend_from_slice(&left[i..]);
        merged.extend_from_slice(&right[j..]);
        values.copy_from_slice(&merged);
        on_merge(values);
    }
}

impl Algorithm for MergeSort {
    fn execute(&mut self, ds: &mut dyn DataStructure) {
        let mut values = ds.elements();
        Self::sort_with(&mut values, &mut |_: &[i32]| {});
        self.result = values;
    }

    fn execute_and_display(&mut self, ds: &mut dyn DataStructure) {
        let mut values = ds.elements();
        self.display(&values);
        Self::sort_with(&mut values, &mut |run: &[i32]| println!("merged: {}", format_values(run)));
        self.display(&values);
        self.result = values;
    }

    fn display(&mut self, elements: &[i32]) {
        println!("{}", format_values(elements));
    }

    fn name(&self) -> String {
        "Merge Sort".to_string()
    }
}

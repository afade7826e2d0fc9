use crate::model::{Algorithm, DataStructure};

use super::format_values;

#[derive(Debug, Clone, Default)]
pub struct InsertionSort {
    result: Vec<i32>,
}

impl InsertionSort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Output of the most recent run
    #[must_use]
    pub fn result(&self) -> &[i32] {
        &self.result
    }

    /// Sort in place, calling `on_step` after each element is placed
    pub fn sort_with(values: &mut [i32], mut on_step: impl FnMut(&[i32])) {
        for i in 1..values.len() {
            let key = values[i];
            let mut j = i;
            while j > 0 && values[j - 1] > key {
                values[j] = values[j - 1];
                j -= 1;
            }
            values[j] = key;
            on_step(values);
        }
    }
}

impl Algorithm for InsertionSort {
    fn execute(&mut self, ds: &mut dyn DataStructure) {
        let mut values = ds.elements();
        Self::sort_with(&mut values, |_| {});
        self.result = values;
    }

    fn execute_and_display(&mut self, ds: &mut dyn DataStructure) {
        let mut values = ds.elements();
        self.display(&values);
        Self::sort_with(&mut values, |step| println!("{}", format_values(step)));
        self.result = values;
    }

    fn display(&mut self, elements: &[i32]) {
        println!("{}", format_values(elements));
    }

    fn name(&self) -> String {
        "Insertion Sort".to_string()
    }
}

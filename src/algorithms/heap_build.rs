use crate::model::{Algorithm, DataStructure};

use super::format_values;

/// Bottom-up heap construction (min-heap or max-heap)
#[derive(Debug, Clone)]
pub struct HeapBuild {
    min_heap: bool,
    result: Vec<i32>,
}

impl HeapBuild {
    #[must_use]
    pub fn new(min_heap: bool) -> Self {
        Self {
            min_heap,
            result: Vec::new(),
        }
    }

    pub fn set_min_heap(&mut self, min_heap: bool) {
        self.min_heap = min_heap;
    }

    #[must_use]
    pub fn result(&self) -> &[i32] {
        &self.result
    }

    /// Heapify `values`, calling `on_step` after each sift-down from an inner node
    pub fn build_with(values: &mut [i32], min_heap: bool, mut on_step: impl FnMut(&[i32])) {
        for root in (0..values.len() / 2).rev() {
            sift_down(values, root, min_heap);
            on_step(values);
        }
    }

    /// Render the heap level by level
    #[must_use]
    pub fn render_tree(values: &[i32]) -> String {
        if values.is_empty() {
            return String::new();
        }
        let levels = usize::BITS - values.len().leading_zeros();
        let mut out = String::new();
        let mut index = 0;
        for level in 0..levels {
            let pad = " ".repeat(1 << (levels - level));
            out.push_str(&pad);
            let row = (index..values.len()).take(1 << level);
            let row: Vec<String> = row.map(|i| values[i].to_string()).collect();
            index += row.len();
            out.push_str(&row.join(&format!(" {pad}{pad}")));
            out.push('\n');
        }
        out
    }
}

impl Default for HeapBuild {
    fn default() -> Self {
        Self::new(true)
    }
}

fn sift_down(values: &mut [i32], mut root: usize, min_heap: bool) {
    let before = |a: i32, b: i32| if min_heap { a < b } else { a > b };
    loop {
        let mut extreme = root;
        for child in [2 * root + 1, 2 * root + 2] {
            if child < values.len() && before(values[child], values[extreme]) {
                extreme = child;
            }
        }
        if extreme == root {
            return;
        }
        values.swap(root, extreme);
        root = extreme;
    }
}

impl Algorithm for HeapBuild {
    fn execute(&mut self, ds: &mut dyn DataStructure) {
        let mut values = ds.elements();
        Self::build_with(&mut values, self.min_heap, |_| {});
        self.result = values;
    }

    fn execute_and_display(&mut self, ds: &mut dyn DataStructure) {
        let mut values = ds.elements();
        self.display(&values);
        Self::build_with(&mut values, self.min_heap, |step| println!("{}", format_values(step)));
        self.display(&values);
        self.result = values;
    }

    fn display(&mut self, elements: &[i32]) {
        println!("{}", Self::render_tree(elements));
    }

    fn name(&self) -> String {
        "Heap Build".to_string()
    }
}

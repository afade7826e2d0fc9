use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::model::{Algorithm, DataStructure};

/// k-th smallest or largest element via a bounded heap
#[derive(Debug, Clone)]
pub struct HeapSelection {
    k: usize,
    smallest: bool,
    result: Option<i32>,
}

impl HeapSelection {
    #[must_use]
    pub fn new(k: usize, smallest: bool) -> Self {
        Self {
            k: k.max(1),
            smallest,
            result: None,
        }
    }

    pub fn set_k(&mut self, k: usize) {
        self.k = k.max(1);
    }

    pub fn set_smallest(&mut self, smallest: bool) {
        self.smallest = smallest;
    }

    /// Result of the most recent run; `None` when k exceeded the element count
    #[must_use]
    pub fn result(&self) -> Option<i32> {
        self.result
    }

    #[must_use]
    pub fn kth_smallest(values: &[i32], k: usize) -> Option<i32> {
        if k == 0 || k > values.len() {
            return None;
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for &v in values {
            heap.push(v);
            if heap.len() > k {
                heap.pop();
            }
        }
        heap.peek().copied()
    }

    #[must_use]
    pub fn kth_largest(values: &[i32], k: usize) -> Option<i32> {
        if k == 0 || k > values.len() {
            return None;
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for &v in values {
            heap.push(Reverse(v));
            if heap.len() > k {
                heap.pop();
            }
        }
        heap.peek().map(|r| r.0)
    }

    fn select(&self, values: &[i32]) -> Option<i32> {
        if self.smallest {
            Self::kth_smallest(values, self.k)
        } else {
            Self::kth_largest(values, self.k)
        }
    }
}

impl Default for HeapSelection {
    fn default() -> Self {
        Self::new(1, true)
    }
}

impl Algorithm for HeapSelection {
    fn execute(&mut self, ds: &mut dyn DataStructure) {
        self.result = self.select(&ds.elements());
    }

    fn execute_and_display(&mut self, ds: &mut dyn DataStructure) {
        let values = ds.elements();
        self.result = self.select(&values);
        self.display(&values);
    }

    fn display(&mut self, _elements: &[i32]) {
        let order = if self.smallest { "smallest" } else { "largest" };
        match self.result {
            Some(value) => println!("The {}-th {order} element is: {value}", self.k),
            None => println!("There is no {}-th {order} element.", self.k),
        }
    }

    fn name(&self) -> String {
        "Heap Selection".to_string()
    }
}

use crate::model::DataStructure;

/// Backing storage for heap algorithms.
///
/// Values are kept in insertion order; heap algorithms work on the snapshot
/// returned by [`DataStructure::elements`].
#[derive(Debug, Clone, Default)]
pub struct HeapStructure {
    data: Vec<i32>,
}

impl HeapStructure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataStructure for HeapStructure {
    fn insert(&mut self, value: i32) {
        self.data.push(value);
    }

    fn remove(&mut self, value: i32) {
        if let Some(pos) = self.data.iter().position(|&v| v == value) {
            self.data.remove(pos);
        }
    }

    fn elements(&self) -> Vec<i32> {
        self.data.clone()
    }

    fn name(&self) -> String {
        "Heap".to_string()
    }
}

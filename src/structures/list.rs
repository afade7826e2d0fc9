use crate::model::DataStructure;

/// Vector-backed list; inserts append
#[derive(Debug, Clone, Default)]
pub struct ListStructure {
    data: Vec<i32>,
}

impl ListStructure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataStructure for ListStructure {
    fn insert(&mut self, value: i32) {
        self.data.push(value);
    }

    /// Removes the first occurrence only
    fn remove(&mut self, value: i32) {
        if let Some(pos) = self.data.iter().position(|&v| v == value) {
            self.data.remove(pos);
        }
    }

    fn elements(&self) -> Vec<i32> {
        self.data.clone()
    }

    fn name(&self) -> String {
        "List".to_string()
    }
}

use super::{RecordIterator, RecordProvider, RecordVisitor};
use std::collections::VecDeque;

/// FIFO record queue usable both as an outbound provider and an inbound iterator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBuffer<R> {
    records: VecDeque<R>,
}

impl<R> Default for RecordBuffer<R> {
    fn default() -> Self {
        Self {
            records: VecDeque::new(),
        }
    }
}

impl<R> RecordBuffer<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: R) {
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }
}

impl<R> From<Vec<R>> for RecordBuffer<R> {
    fn from(records: Vec<R>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl<R> FromIterator<R> for RecordBuffer<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<R> Extend<R> for RecordBuffer<R> {
    fn extend<I: IntoIterator<Item = R>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl<R> RecordProvider<R> for RecordBuffer<R> {
    fn retrieve(&mut self, visitor: &mut dyn RecordVisitor<R>) -> bool {
        while visitor.has_capacity() {
            match self.records.pop_front() {
                Some(record) => visitor.visit_record(&record),
                None => return false,
            }
        }
        !self.records.is_empty()
    }
}

impl<R> RecordIterator<R> for RecordBuffer<R> {
    fn next_record(&mut self) -> Option<R> {
        self.records.pop_front()
    }
}

/// Record layout: maps record ids carried on the wire to record names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataScheme {
    name: String,
    records: Vec<String>,
}

impl DataScheme {
    pub fn new<I, S>(name: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            records: records.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn record_name(&self, record_id: i32) -> Option<&str> {
        usize::try_from(record_id)
            .ok()
            .and_then(|i| self.records.get(i))
            .map(String::as_str)
    }

    pub fn find_record(&self, name: &str) -> Option<i32> {
        self.records
            .iter()
            .position(|r| r == name)
            .and_then(|i| i32::try_from(i).ok())
    }
}

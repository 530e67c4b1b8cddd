use std::cmp::Ordering;

use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Ascending => "▲",
            Direction::Descending => "▼",
        }
    }
}

/// Optional single active sort column. No column means store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    column: Option<String>,
    direction: Direction,
}

impl SortSpec {
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Clicking the active column flips the direction, any other column
    /// becomes active ascending.
    pub fn sort_by(&mut self, key: &str) {
        if self.column.as_deref() == Some(key) {
            self.direction = self.direction.flip();
        } else {
            self.column = Some(key.to_string());
            self.direction = Direction::Ascending;
        }
    }

    pub fn clear(&mut self) {
        self.column = None;
        self.direction = Direction::Ascending;
    }

    /// Sort arrow for a header, if `key` is the active column.
    pub fn indicator(&self, key: &str) -> Option<Direction> {
        (self.column.as_deref() == Some(key)).then_some(self.direction)
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self.column.as_deref() {
            None => Ordering::Equal,
            Some(key) => {
                let ord = compare_values(a.value(key), b.value(key));
                match self.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }
        }
    }

    /// Stable in-place sort; equal keys keep their input order.
    pub fn apply(&self, records: &mut [&Record]) {
        if self.column.is_some() {
            records.sort_by(|a, b| self.compare(a, b));
        }
    }
}

/// Numeric comparison when both sides read as numbers, case-insensitive text
/// otherwise. Nulls compare as the empty string.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_string().to_lowercase().cmp(&b.to_string().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StatusClass;

    fn rec(id: &str, v: impl Into<Value>) -> Record {
        Record::new(id, StatusClass::Normal).with_field("v", v)
    }

    fn sorted_ids(spec: &SortSpec, records: &[Record]) -> Vec<String> {
        let mut refs: Vec<&Record> = records.iter().collect();
        spec.apply(&mut refs);
        refs.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn toggling_returns_to_ascending() {
        let mut spec = SortSpec::default();
        spec.sort_by("v");
        assert_eq!(spec.direction(), Direction::Ascending);
        spec.sort_by("v");
        assert_eq!(spec.direction(), Direction::Descending);
        spec.sort_by("v");
        assert_eq!(spec.direction(), Direction::Ascending);
    }

    #[test]
    fn new_column_starts_ascending() {
        let mut spec = SortSpec::default();
        spec.sort_by("a");
        spec.sort_by("a");
        spec.sort_by("b");
        assert_eq!(spec.column(), Some("b"));
        assert_eq!(spec.direction(), Direction::Ascending);
        assert_eq!(spec.indicator("a"), None);
        assert_eq!(spec.indicator("b"), Some(Direction::Ascending));
    }

    #[test]
    fn numeric_text_sorts_numerically() {
        let records = vec![rec("a", "10"), rec("b", "9"), rec("c", "100")];
        let mut spec = SortSpec::default();
        spec.sort_by("v");
        assert_eq!(sorted_ids(&spec, &records), vec!["b", "a", "c"]);
    }

    #[test]
    fn text_sorts_case_insensitively() {
        let records = vec![rec("a", "banana"), rec("b", "Apple"), rec("c", "cherry")];
        let mut spec = SortSpec::default();
        spec.sort_by("v");
        assert_eq!(sorted_ids(&spec, &records), vec!["b", "a", "c"]);
        spec.sort_by("v");
        assert_eq!(sorted_ids(&spec, &records), vec!["c", "a", "b"]);
    }

    #[test]
    fn missing_values_sort_as_empty() {
        let records = vec![
            rec("a", "x"),
            Record::new("b", StatusClass::Normal),
            rec("c", Value::Null),
        ];
        let mut spec = SortSpec::default();
        spec.sort_by("v");
        assert_eq!(sorted_ids(&spec, &records), vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let records = vec![
            rec("1", "same"),
            rec("2", "other"),
            rec("3", "SAME"),
            rec("4", "same"),
            rec("5", "other"),
        ];
        let mut spec = SortSpec::default();
        spec.sort_by("v");
        assert_eq!(sorted_ids(&spec, &records), vec!["2", "5", "1", "3", "4"]);
        spec.sort_by("v");
        assert_eq!(sorted_ids(&spec, &records), vec!["1", "3", "4", "2", "5"]);
    }

    #[test]
    fn unsorted_keeps_store_order() {
        let records = vec![rec("z", "3"), rec("y", "1")];
        assert_eq!(sorted_ids(&SortSpec::default(), &records), vec!["z", "y"]);
    }
}

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::record::{Record, Value};
use crate::sort::compare_values;

/// One column's constraint. A column without a clause is unrestricted.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Row passes when its value is one of the set.
    AllowSet(BTreeSet<Value>),
    /// Every option was unchecked: nothing passes.
    AllowNone,
    /// Inclusive bounds, compared like the sort comparator does. Blank
    /// values never pass.
    Range { min: Option<Value>, max: Option<Value> },
}

impl FilterClause {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FilterClause::AllowSet(accepted) => accepted.contains(value),
            FilterClause::AllowNone => false,
            FilterClause::Range { min, max } => {
                if value.is_blank() {
                    return false;
                }
                let above = min
                    .as_ref()
                    .is_none_or(|m| compare_values(value, m) != Ordering::Less);
                let below = max
                    .as_ref()
                    .is_none_or(|m| compare_values(value, m) != Ordering::Greater);
                above && below
            }
        }
    }
}

/// Per-column clauses, combined with AND across columns and OR within one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    clauses: BTreeMap<String, FilterClause>,
}

impl FilterSet {
    /// Sets the accepted values of a column.
    ///
    /// An empty selection becomes [`FilterClause::AllowNone`]; a selection
    /// equal to the whole `domain` removes the clause. Values outside the
    /// domain keep the clause, so a live view can filter ahead of arrivals.
    pub fn set_clause(
        &mut self,
        key: &str,
        accepted: BTreeSet<Value>,
        domain: &BTreeSet<Value>,
    ) {
        if accepted.is_empty() {
            debug!("Filter {key:?}: none selected");
            self.clauses.insert(key.to_string(), FilterClause::AllowNone);
        } else if accepted == *domain {
            debug!("Filter {key:?}: all selected, clause removed");
            self.clauses.remove(key);
        } else {
            debug!("Filter {key:?}: {} values selected", accepted.len());
            self.clauses
                .insert(key.to_string(), FilterClause::AllowSet(accepted));
        }
    }

    pub fn set_range(&mut self, key: &str, min: Option<Value>, max: Option<Value>) {
        if min.is_none() && max.is_none() {
            self.clauses.remove(key);
        } else {
            self.clauses
                .insert(key.to_string(), FilterClause::Range { min, max });
        }
    }

    pub fn clear_clause(&mut self, key: &str) -> bool {
        self.clauses.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.clauses.clear();
    }

    pub fn clause(&self, key: &str) -> Option<&FilterClause> {
        self.clauses.get(key)
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.clauses.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.clauses.keys().map(|k| k.as_str())
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses
            .iter()
            .all(|(key, clause)| clause.matches(record.value(key)))
    }

    /// The subsequence of `records` passing every clause, order preserved.
    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let out: Vec<&Record> = records.into_iter().filter(|r| self.matches(r)).collect();
        trace!("Filter kept {} records", out.len());
        out
    }
}

/// Distinct non-blank values of a column, in value order.
pub fn clause_domain<'a, I>(key: &str, records: I) -> BTreeSet<Value>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .map(|r| r.value(key))
        .filter(|v| !v.is_blank())
        .cloned()
        .collect()
}

/// Parses the range prompt: `min..max`, `min..`, `..max`, or a single value
/// for both bounds. Blank input gives `(None, None)`, which lifts the range.
pub fn parse_range(input: &str) -> (Option<Value>, Option<Value>) {
    let bound = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| Value::text(s))
    };
    match input.split_once("..") {
        Some((min, max)) => (bound(min), bound(max)),
        None => {
            let exact = bound(input);
            (exact.clone(), exact)
        }
    }
}

/// Narrows checklist options to the ones containing `term`, ignoring case.
pub fn search_domain<'a>(domain: &'a BTreeSet<Value>, term: &str) -> Vec<&'a Value> {
    let term = term.trim().to_lowercase();
    domain
        .iter()
        .filter(|v| term.is_empty() || v.to_string().to_lowercase().contains(&term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{STATUS_FIELD, StatusClass};

    fn rec(id: u32, status: StatusClass, gate: &str) -> Record {
        Record::new(id.to_string(), status).with_field("gate", gate)
    }

    fn sample() -> Vec<Record> {
        vec![
            rec(1, StatusClass::Normal, "0001"),
            rec(2, StatusClass::Error, "0002"),
            rec(3, StatusClass::Normal, "0001"),
            rec(4, StatusClass::Warning, "0003"),
            rec(5, StatusClass::Normal, ""),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    fn set(values: &[&str]) -> BTreeSet<Value> {
        values.iter().map(|v| Value::text(*v)).collect()
    }

    #[test]
    fn status_clause_keeps_relative_order() {
        let records = sample();
        let domain = clause_domain(STATUS_FIELD, &records);
        let mut filters = FilterSet::default();
        filters.set_clause(STATUS_FIELD, set(&["normal"]), &domain);
        assert_eq!(ids(&filters.apply(&records)), vec!["1", "3", "5"]);
    }

    #[test]
    fn clauses_combine_with_and() {
        let records = sample();
        let mut filters = FilterSet::default();
        filters.set_clause(
            STATUS_FIELD,
            set(&["normal", "error"]),
            &clause_domain(STATUS_FIELD, &records),
        );
        filters.set_clause("gate", set(&["0002", "0001"]), &clause_domain("gate", &records));
        assert_eq!(ids(&filters.apply(&records)), vec!["1", "2", "3"]);
    }

    #[test]
    fn removing_a_clause_never_shrinks_the_result() {
        let records = sample();
        let mut filters = FilterSet::default();
        filters.set_clause(
            STATUS_FIELD,
            set(&["normal"]),
            &clause_domain(STATUS_FIELD, &records),
        );
        filters.set_clause("gate", set(&["0001"]), &clause_domain("gate", &records));
        let narrow = ids(&filters.apply(&records));

        for key in [STATUS_FIELD, "gate"] {
            let mut relaxed = filters.clone();
            relaxed.clear_clause(key);
            let wide = ids(&relaxed.apply(&records));
            assert!(narrow.iter().all(|id| wide.contains(id)), "{key}");
        }
    }

    #[test]
    fn empty_selection_shows_nothing() {
        let records = sample();
        let mut filters = FilterSet::default();
        filters.set_clause("gate", BTreeSet::new(), &clause_domain("gate", &records));
        assert_eq!(filters.clause("gate"), Some(&FilterClause::AllowNone));
        assert!(filters.apply(&records).is_empty());
    }

    #[test]
    fn full_selection_removes_the_clause() {
        let records = sample();
        let domain = clause_domain("gate", &records);
        let mut filters = FilterSet::default();
        filters.set_clause("gate", set(&["0001"]), &domain);
        assert!(filters.is_active("gate"));
        filters.set_clause("gate", domain.clone(), &domain);
        assert!(!filters.is_active("gate"));
        assert_eq!(filters.apply(&records).len(), records.len());
    }

    #[test]
    fn unseen_values_keep_the_clause() {
        let mut filters = FilterSet::default();
        filters.set_clause(STATUS_FIELD, set(&["error"]), &BTreeSet::new());
        assert!(filters.is_active(STATUS_FIELD));
    }

    #[test]
    fn domain_skips_blanks_and_is_sorted() {
        let records = sample();
        let domain: Vec<String> = clause_domain("gate", &records)
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(domain, vec!["0001", "0002", "0003"]);
    }

    #[test]
    fn set_clause_excludes_blank_values() {
        let records = sample();
        let domain = clause_domain("gate", &records);
        let mut filters = FilterSet::default();
        filters.set_clause("gate", set(&["0001", "0003"]), &domain);
        assert_eq!(ids(&filters.apply(&records)), vec!["1", "3", "4"]);
    }

    #[test]
    fn range_clause_is_inclusive() {
        let records: Vec<Record> = ["2024/01/01", "2024/01/15", "2024/02/01", ""]
            .iter()
            .enumerate()
            .map(|(i, d)| Record::new(i.to_string(), StatusClass::Info).with_field("date", *d))
            .collect();
        let mut filters = FilterSet::default();
        filters.set_range(
            "date",
            Some(Value::text("2024/01/01")),
            Some(Value::text("2024/01/15")),
        );
        assert_eq!(ids(&filters.apply(&records)), vec!["0", "1"]);

        filters.set_range("date", None, None);
        assert!(filters.is_empty());
    }

    #[test]
    fn range_on_numbers_compares_numerically() {
        let records: Vec<Record> = [5.0, 50.0, 500.0]
            .iter()
            .map(|n| Record::new(n.to_string(), StatusClass::Info).with_field("n", *n))
            .collect();
        let mut filters = FilterSet::default();
        filters.set_range("n", Some(Value::number(10.0)), None);
        assert_eq!(ids(&filters.apply(&records)), vec!["50", "500"]);
    }

    #[test]
    fn range_input_forms() {
        let n = |s: &str| Some(Value::text(s));
        assert_eq!(parse_range("2..4"), (n("2"), n("4")));
        assert_eq!(parse_range(" 10 .."), (n("10"), None));
        assert_eq!(parse_range("..2024/01/15"), (None, n("2024/01/15")));
        assert_eq!(parse_range("0002"), (n("0002"), n("0002")));
        assert_eq!(parse_range("  "), (None, None));
    }

    #[test]
    fn search_narrows_options() {
        let domain = set(&["Entrance", "Server room", "Meeting room"]);
        let hits: Vec<String> = search_domain(&domain, "ROOM").iter().map(|v| v.to_string()).collect();
        assert_eq!(hits, vec!["Meeting room", "Server room"]);
        assert_eq!(search_domain(&domain, " ").len(), 3);
    }
}

use std::collections::{HashSet, VecDeque};

use tracing::{trace, warn};

use crate::domain::ViewError;
use crate::record::Record;

/// Ordered record collection owned by one view.
///
/// Live-feed views insert at the head so the newest record comes first and
/// cap the store; static report views push at the tail and usually run
/// unbounded. Ids are unique within a store.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: VecDeque<Record>,
    ids: HashSet<String>,
    cap: Option<usize>,
}

impl RecordStore {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            ids: HashSet::new(),
            cap,
        }
    }

    /// Builds a store from loaded records, rejecting the first repeated id.
    pub fn from_records(records: Vec<Record>, cap: Option<usize>) -> Result<Self, ViewError> {
        let mut ids = HashSet::with_capacity(records.len());
        for record in &records {
            if !ids.insert(record.id().to_string()) {
                return Err(ViewError::DuplicateId {
                    id: record.id().to_string(),
                });
            }
        }
        let mut store = Self {
            records: records.into(),
            ids,
            cap,
        };
        store.evict_back();
        Ok(store)
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }

    pub fn set_cap(&mut self, cap: Option<usize>) {
        self.cap = cap;
        self.evict_back();
    }

    /// Inserts at the head and evicts the oldest records from the tail when
    /// the store grows past its cap. A record whose id is already stored is
    /// dropped and `false` returned.
    pub fn append(&mut self, record: Record) -> bool {
        if !self.claim_id(&record) {
            return false;
        }
        self.records.push_front(record);
        self.evict_back();
        true
    }

    /// Inserts at the tail. Over cap the head is evicted instead, so the
    /// record just pushed always survives. Repeated ids are dropped like in
    /// [`RecordStore::append`].
    pub fn push(&mut self, record: Record) -> bool {
        if !self.claim_id(&record) {
            return false;
        }
        self.records.push_back(record);
        if let Some(cap) = self.cap {
            while self.records.len() > cap {
                if let Some(evicted) = self.records.pop_front() {
                    self.ids.remove(evicted.id());
                }
            }
        }
        true
    }

    /// Applies `mutation` to every record matching `predicate`, returns how
    /// many were touched.
    pub fn update<P, M>(&mut self, mut predicate: P, mut mutation: M) -> usize
    where
        P: FnMut(&Record) -> bool,
        M: FnMut(&mut Record),
    {
        let mut count = 0;
        for record in self.records.iter_mut() {
            if predicate(record) {
                mutation(record);
                count += 1;
            }
        }
        count
    }

    pub fn remove<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&Record) -> bool,
    {
        let before = self.records.len();
        let ids = &mut self.ids;
        self.records.retain(|r| {
            let drop = predicate(r);
            if drop {
                ids.remove(r.id());
            }
            !drop
        });
        before - self.records.len()
    }

    pub fn all(&self) -> impl ExactSizeIterator<Item = &Record> + Clone + '_ {
        self.records.iter()
    }

    pub fn at(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        if !self.ids.contains(id) {
            return None;
        }
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn claim_id(&mut self, record: &Record) -> bool {
        if self.ids.insert(record.id().to_string()) {
            true
        } else {
            warn!("Dropping record with duplicate id {:?}", record.id());
            false
        }
    }

    fn evict_back(&mut self) {
        if let Some(cap) = self.cap {
            let evicted = self.records.len().saturating_sub(cap);
            if evicted > 0 {
                for record in self.records.drain(cap..) {
                    self.ids.remove(record.id());
                }
                trace!("Store over cap {cap}, evicted {evicted} records");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StatusClass;

    fn rec(id: u32) -> Record {
        Record::new(id.to_string(), StatusClass::Normal)
    }

    fn ids(store: &RecordStore) -> Vec<String> {
        store.all().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn append_puts_newest_first() {
        let mut store = RecordStore::new(None);
        store.append(rec(1));
        store.append(rec(2));
        store.append(rec(3));
        assert_eq!(ids(&store), vec!["3", "2", "1"]);
    }

    #[test]
    fn append_evicts_oldest_over_cap() {
        let mut store = RecordStore::new(Some(3));
        for i in 1..=5 {
            store.append(rec(i));
        }
        assert_eq!(store.len(), 3);
        assert_eq!(ids(&store), vec!["5", "4", "3"]);
    }

    #[test]
    fn push_keeps_the_pushed_record_over_cap() {
        let mut store = RecordStore::new(Some(2));
        store.push(rec(1));
        store.push(rec(2));
        store.push(rec(3));
        assert_eq!(ids(&store), vec!["2", "3"]);
    }

    #[test]
    fn update_and_remove_report_counts() {
        let mut store = RecordStore::from_records((1..=4).map(rec).collect(), None).unwrap();
        let touched = store.update(|r| r.id() != "2", |r| r.set("sent", "yes"));
        assert_eq!(touched, 3);
        assert_eq!(store.get("1").unwrap().value("sent").to_string(), "yes");
        assert!(store.get("2").unwrap().get("sent").is_none());

        let removed = store.remove(|r| r.value("sent").to_string() == "yes");
        assert_eq!(removed, 3);
        assert_eq!(ids(&store), vec!["2"]);
    }

    #[test]
    fn all_is_restartable() {
        let store = RecordStore::from_records((1..=3).map(rec).collect(), None).unwrap();
        let first: Vec<_> = store.all().map(|r| r.id().to_string()).collect();
        let second: Vec<_> = store.all().map(|r| r.id().to_string()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn lowering_cap_truncates() {
        let mut store = RecordStore::from_records((1..=10).map(rec).collect(), None).unwrap();
        store.set_cap(Some(4));
        assert_eq!(ids(&store), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn repeated_ids_are_rejected() {
        let err = RecordStore::from_records(vec![rec(1), rec(2), rec(1)], None).unwrap_err();
        assert_eq!(err, ViewError::DuplicateId { id: "1".to_string() });

        let mut store = RecordStore::new(None);
        assert!(store.append(rec(1)));
        assert!(!store.append(rec(1)));
        assert!(!store.push(rec(1)));
        assert_eq!(ids(&store), vec!["1"]);
    }

    #[test]
    fn evicted_and_removed_ids_can_come_back() {
        let mut store = RecordStore::new(Some(2));
        store.append(rec(1));
        store.append(rec(2));
        store.append(rec(3));
        assert!(!store.contains("1"));
        assert!(store.append(rec(1)));
        assert_eq!(ids(&store), vec!["1", "3"]);

        store.remove(|r| r.id() == "3");
        assert!(store.push(rec(3)));
        assert_eq!(ids(&store), vec!["1", "3"]);
    }
}

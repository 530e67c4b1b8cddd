use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Write;

use tracing::{debug, info, trace, warn};

use crate::columns::{Column, ColumnModel};
use crate::domain::{ViewConfig, ViewError};
use crate::filter::{FilterClause, FilterSet, clause_domain};
use crate::pagination::PageState;
use crate::record::{Record, StatusClass, Value};
use crate::sort::{Direction, SortSpec};
use crate::store::RecordStore;

/// Header metadata handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub key: String,
    pub label: String,
    pub sort: Option<Direction>,
    pub filtered: bool,
}

/// One rendered row: only visible columns, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: String,
    pub status: StatusClass,
    pub selected: bool,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageSummary {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub first_row: usize,
    pub last_row: usize,
    pub filtered: usize,
    pub total: usize,
}

/// Everything a renderer needs to paint one frame of the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSnapshot {
    pub name: String,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>,
    pub summary: PageSummary,
}

/// The filter → sort → paginate pipeline for one screen.
///
/// Every mutating call recomputes the derived row mapping before it returns,
/// so reads never see stale results. Unknown column keys are logged and
/// ignored; the remaining rejections come back as [`ViewError`] with the
/// view left as it was.
#[derive(Debug, Clone)]
pub struct TableView {
    name: String,
    store: RecordStore,
    columns: ColumnModel,
    filters: FilterSet,
    sort: SortSpec,
    pages: PageState,
    rows: Vec<usize>, // Mapping of view row index to store index, filtered and sorted
    selected: HashSet<String>,
}

impl TableView {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        records: Vec<Record>,
        cap: Option<usize>,
        page_size: usize,
    ) -> Result<Self, ViewError> {
        let mut view = Self {
            name: name.into(),
            store: RecordStore::from_records(records, cap)?,
            columns: ColumnModel::new(columns),
            filters: FilterSet::default(),
            sort: SortSpec::default(),
            pages: PageState::new(page_size)?,
            rows: Vec::new(),
            selected: HashSet::new(),
        };
        view.refresh();
        info!(
            "View {:?} ready: {} records, {} columns",
            view.name,
            view.store.len(),
            view.columns.len()
        );
        Ok(view)
    }

    /// Builds a view with page size and cap from the config. Columns named in
    /// `config.default_columns` are shown in that order, the rest start hidden.
    pub fn with_config(
        name: impl Into<String>,
        columns: Vec<Column>,
        records: Vec<Record>,
        config: &ViewConfig,
    ) -> Result<Self, ViewError> {
        let columns = arrange_defaults(columns, &config.default_columns);
        Self::new(name, columns, records, config.live_cap, config.page_size)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    pub fn pages(&self) -> &PageState {
        &self.pages
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn total_count(&self) -> usize {
        self.store.len()
    }

    pub fn filtered_count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_pages(&self) -> usize {
        self.pages.total_pages(self.rows.len())
    }

    // -------------------- Record store ---------------------- //

    /// Live feed arrival: newest first, capped. Returns `false` when the id
    /// is already in the view and the record was dropped.
    pub fn append(&mut self, record: Record) -> bool {
        trace!("Append record {}", record.id());
        let added = self.store.append(record);
        if added {
            self.after_store_change();
        }
        added
    }

    pub fn push(&mut self, record: Record) -> bool {
        let added = self.store.push(record);
        if added {
            self.after_store_change();
        }
        added
    }

    pub fn update_where<P, M>(&mut self, predicate: P, mutation: M) -> usize
    where
        P: FnMut(&Record) -> bool,
        M: FnMut(&mut Record),
    {
        let count = self.store.update(predicate, mutation);
        if count > 0 {
            self.refresh();
        }
        count
    }

    pub fn remove_where<P>(&mut self, predicate: P) -> usize
    where
        P: FnMut(&Record) -> bool,
    {
        let count = self.store.remove(predicate);
        if count > 0 {
            self.after_store_change();
        }
        count
    }

    // -------------------- Filters ---------------------- //

    /// Distinct non-blank values of a column across the whole store.
    pub fn clause_domain(&self, key: &str) -> BTreeSet<Value> {
        clause_domain(key, self.store.all())
    }

    pub fn set_clause<I>(&mut self, key: &str, accepted: I)
    where
        I: IntoIterator<Item = Value>,
    {
        if !self.known(key) {
            return;
        }
        let domain = self.clause_domain(key);
        self.filters
            .set_clause(key, accepted.into_iter().collect(), &domain);
        self.refresh();
    }

    pub fn set_range(&mut self, key: &str, min: Option<Value>, max: Option<Value>) {
        if !self.known(key) {
            return;
        }
        self.filters.set_range(key, min, max);
        self.refresh();
    }

    pub fn clear_clause(&mut self, key: &str) {
        if self.filters.clear_clause(key) {
            self.refresh();
        }
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.refresh();
    }

    /// Values currently ticked in a column's checklist: the clause's set, or
    /// the whole domain when the column is unrestricted.
    pub fn accepted_values(&self, key: &str) -> BTreeSet<Value> {
        match self.filters.clause(key) {
            Some(FilterClause::AllowSet(set)) => set.clone(),
            Some(FilterClause::AllowNone) => BTreeSet::new(),
            Some(FilterClause::Range { .. }) | None => self.clause_domain(key),
        }
    }

    // -------------------- Sorting ---------------------- //

    pub fn sort_by(&mut self, key: &str) {
        if !self.known(key) {
            return;
        }
        self.sort.sort_by(key);
        debug!("Sort by {key:?} {:?}", self.sort.direction());
        self.pages.first();
        self.refresh();
    }

    pub fn clear_sort(&mut self) {
        self.sort.clear();
        self.pages.first();
        self.refresh();
    }

    // -------------------- Pagination ---------------------- //

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ViewError> {
        self.pages.set_page_size(page_size)
    }

    pub fn go_to(&mut self, page: usize) -> bool {
        let moved = self.pages.go_to(page, self.rows.len());
        if !moved {
            trace!("Ignoring go to page {page} of {}", self.total_pages());
        }
        moved
    }

    pub fn next_page(&mut self) -> bool {
        self.pages.next(self.rows.len())
    }

    pub fn prev_page(&mut self) -> bool {
        self.pages.prev(self.rows.len())
    }

    pub fn first_page(&mut self) {
        self.pages.first();
    }

    pub fn last_page(&mut self) {
        self.pages.last(self.rows.len());
    }

    /// Records on the current page, filtered and sorted.
    pub fn page_records(&self) -> Vec<&Record> {
        self.pages
            .page(&self.rows)
            .iter()
            .filter_map(|&idx| self.store.at(idx))
            .collect()
    }

    /// Every record passing the filters, in sort order.
    pub fn filtered_records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter().filter_map(|&idx| self.store.at(idx))
    }

    // -------------------- Columns ---------------------- //

    pub fn reorder(&mut self, moved: &str, target: &str) {
        if let Err(e) = self.columns.reorder(moved, target) {
            warn!("Ignoring column move: {e}");
        }
    }

    pub fn set_visible(&mut self, key: &str, visible: bool) -> Result<(), ViewError> {
        match self.columns.set_visible(key, visible) {
            Err(ViewError::UnknownColumnKey { key }) => {
                warn!("Ignoring visibility change for unknown column {key:?}");
                Ok(())
            }
            other => other,
        }
    }

    pub fn toggle_visible(&mut self, key: &str) -> Result<(), ViewError> {
        let visible = match self.columns.get(key) {
            Some(column) => column.visible,
            None => {
                warn!("Ignoring visibility change for unknown column {key:?}");
                return Ok(());
            }
        };
        self.set_visible(key, !visible)
    }

    pub fn show_all_columns(&mut self) {
        self.columns.show_all();
    }

    pub fn reset_columns(&mut self) {
        self.columns.reset_to_default();
    }

    // -------------------- Selection and bulk operations ---------------------- //

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn toggle_selected(&mut self, id: &str) {
        if !self.selected.remove(id) && self.store.contains(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Selects or deselects every row on the current page.
    pub fn select_page(&mut self, selected: bool) {
        let ids: Vec<String> = self
            .page_records()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        for id in ids {
            if selected {
                self.selected.insert(id);
            } else {
                self.selected.remove(&id);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected ids in store order, including rows hidden by filters.
    pub fn selected_ids(&self) -> Vec<String> {
        self.store
            .all()
            .filter(|r| self.selected.contains(r.id()))
            .map(|r| r.id().to_string())
            .collect()
    }

    pub fn selection_count(&self) -> usize {
        self.selected.len()
    }

    /// Writes `value` into `field` on every selected record.
    pub fn mark_selected(&mut self, field: &str, value: impl Into<Value>) -> usize {
        let value = value.into();
        let selected = &self.selected;
        let count = self.store.update(
            |r| selected.contains(r.id()),
            |r| r.set(field, value.clone()),
        );
        info!("Marked {count} records {field}={value}");
        self.refresh();
        count
    }

    pub fn delete_selected(&mut self) -> usize {
        let selected = std::mem::take(&mut self.selected);
        let count = self.store.remove(|r| selected.contains(r.id()));
        info!("Deleted {count} records");
        self.after_store_change();
        count
    }

    // -------------------- Derived output ---------------------- //

    pub fn status_counts(&self) -> BTreeMap<StatusClass, usize> {
        let mut counts: BTreeMap<StatusClass, usize> =
            StatusClass::ALL.iter().map(|s| (*s, 0)).collect();
        for record in self.store.all() {
            *counts.entry(record.status()).or_insert(0) += 1;
        }
        counts
    }

    pub fn headers(&self) -> Vec<HeaderView> {
        self.columns
            .ordered()
            .filter(|c| c.visible)
            .map(|c| HeaderView {
                key: c.key.clone(),
                label: c.label.clone(),
                sort: self.sort.indicator(&c.key),
                filtered: self.filters.is_active(&c.key),
            })
            .collect()
    }

    pub fn summary(&self) -> PageSummary {
        let filtered = self.rows.len();
        let (first_row, last_row) = self.pages.row_range(filtered);
        PageSummary {
            current_page: self.pages.current_page(),
            total_pages: self.pages.total_pages(filtered),
            page_size: self.pages.page_size(),
            first_row,
            last_row,
            filtered,
            total: self.store.len(),
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let keys: Vec<&str> = self.columns.visible_ordered().collect();
        let rows = self
            .page_records()
            .into_iter()
            .map(|r| RowView {
                id: r.id().to_string(),
                status: r.status(),
                selected: self.selected.contains(r.id()),
                cells: keys.iter().map(|k| r.value(k).to_string()).collect(),
            })
            .collect();
        ViewSnapshot {
            name: self.name.clone(),
            headers: self.headers(),
            rows,
            summary: self.summary(),
        }
    }

    /// Writes the filtered rows as CSV, visible columns in column order.
    pub fn export_csv<W: Write>(&self, mut out: W) -> std::io::Result<usize> {
        let columns: Vec<&Column> = self.columns.ordered().filter(|c| c.visible).collect();
        let header: Vec<String> = columns.iter().map(|c| csv_cell(&c.label)).collect();
        writeln!(out, "{}", header.join(","))?;

        let mut written = 0;
        for record in self.filtered_records() {
            let line: Vec<String> = columns
                .iter()
                .map(|c| csv_cell(&record.value(&c.key).to_string()))
                .collect();
            writeln!(out, "{}", line.join(","))?;
            written += 1;
        }
        out.flush()?;
        debug!("Exported {written} rows");
        Ok(written)
    }

    fn known(&self, key: &str) -> bool {
        // The status pseudo field is filterable even when it is not a column
        if self.columns.contains(key) || key == crate::record::STATUS_FIELD {
            true
        } else {
            warn!("Ignoring operation on unknown column {key:?}");
            false
        }
    }

    fn after_store_change(&mut self) {
        let store = &self.store;
        self.selected.retain(|id| store.contains(id));
        self.refresh();
    }

    fn refresh(&mut self) {
        let records: Vec<&Record> = self.store.all().collect();
        let mut rows: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.filters.matches(r))
            .map(|(idx, _)| idx)
            .collect();
        if self.sort.column().is_some() {
            rows.sort_by(|&a, &b| self.sort.compare(records[a], records[b]));
        }
        self.rows = rows;
        self.pages.clamp(self.rows.len());
        trace!(
            "Refreshed {:?}: {}/{} rows, page {}/{}",
            self.name,
            self.rows.len(),
            self.store.len(),
            self.pages.current_page(),
            self.total_pages()
        );
    }
}

/// Puts the configured columns first, in the given order, and hides the
/// others. Names that match no column are skipped.
fn arrange_defaults(columns: Vec<Column>, defaults: &[String]) -> Vec<Column> {
    if defaults.is_empty() {
        return columns;
    }
    let mut rest = columns;
    let mut arranged = Vec::with_capacity(rest.len());
    for key in defaults {
        match rest.iter().position(|c| &c.key == key) {
            Some(idx) => {
                let mut column = rest.remove(idx);
                column.visible = true;
                arranged.push(column);
            }
            None => warn!("Default column {key:?} not in data"),
        }
    }
    arranged.extend(rest.into_iter().map(Column::hidden));
    arranged
}

fn csv_cell(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ',' || c == '"' || c == '\n' || c == '\r');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

//! Filter, sort, paginate and column management for access-control tables.
//!
//! [`view::TableView`] owns one screen's records and derives the page the
//! renderer shows. The loader and replay feed stand in for the upstream
//! data source.

pub mod columns;
pub mod domain;
pub mod feed;
pub mod filter;
pub mod loader;
pub mod pagination;
pub mod record;
pub mod sort;
pub mod store;
pub mod view;

pub use columns::{Column, ColumnModel};
pub use domain::{GateViewError, ViewConfig, ViewError};
pub use filter::{FilterClause, FilterSet};
pub use pagination::PageState;
pub use record::{Record, RecordSchema, StatusClass, Value};
pub use sort::{Direction, SortSpec};
pub use store::RecordStore;
pub use view::{TableView, ViewSnapshot};

use polars::prelude::*;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::columns::Column;
use crate::domain::GateViewError;
use crate::record::{Record, RecordSchema, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    file_type: FileType,
}

/// Column of a loaded frame, already converted to cell values.
struct LoadedColumn {
    name: String,
    values: Vec<Value>,
}

/// Records and columns read from one data file.
#[derive(Debug)]
pub struct DataSet {
    pub name: String,
    pub columns: Vec<Column>,
    pub records: Vec<Record>,
}

/// Reads a CSV, Parquet or Arrow IPC file into records.
///
/// When the file has no column named like `schema.id_field`, sequential ids
/// starting at 1 are generated into that field.
pub fn load_data_file(path: PathBuf, schema: &RecordSchema) -> Result<DataSet, GateViewError> {
    load_data_file_with_id_start(path, schema, 1)
}

/// Like [`load_data_file`], generated ids start at `first_id`. Used for a
/// second file feeding the same view, see [`next_free_id`].
pub fn load_data_file_with_id_start(
    path: PathBuf,
    schema: &RecordSchema,
    first_id: usize,
) -> Result<DataSet, GateViewError> {
    let file_info = get_file_info(path)?;
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Each column is converted in its own rayon task.
    let start_time = Instant::now();
    let df = frame.collect()?;
    let loaded: Result<Vec<LoadedColumn>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let mut loaded = loaded?;
    let nrows = df.height();

    if !loaded.iter().any(|c| c.name == schema.id_field) {
        debug!("No {:?} column, generating ids", schema.id_field);
        loaded.insert(
            0,
            LoadedColumn {
                name: schema.id_field.clone(),
                values: (first_id..first_id + nrows)
                    .map(|i| Value::text(i.to_string()))
                    .collect(),
            },
        );
    }

    let records = build_records(&loaded, nrows, schema)?;
    let columns = loaded
        .iter()
        .map(|c| Column::new(c.name.clone(), c.name.clone()))
        .collect();

    info!(
        "Loaded {} records from {:?} ({} bytes) in {}ms",
        records.len(),
        file_info.path,
        file_info.file_size,
        start_time.elapsed().as_millis()
    );

    let name = file_info
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();

    Ok(DataSet {
        name,
        columns,
        records,
    })
}

/// One past the largest numeric id among `records`, 1 when there is none.
pub fn next_free_id<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(|r| r.id().trim().parse::<usize>().ok())
        .max()
        .map_or(1, |max| max + 1)
}

fn build_records(
    columns: &[LoadedColumn],
    nrows: usize,
    schema: &RecordSchema,
) -> Result<Vec<Record>, GateViewError> {
    let mut seen = HashSet::with_capacity(nrows);
    (0..nrows)
        .map(|row| {
            let fields: HashMap<String, Value> = columns
                .iter()
                .map(|c| (c.name.clone(), c.values[row].clone()))
                .collect();
            let record = Record::from_fields(row, fields, schema)?;
            if !seen.insert(record.id().to_string()) {
                return Err(GateViewError::DuplicateId {
                    row,
                    id: record.id().to_string(),
                });
            }
            Ok(record)
        })
        .collect()
}

fn is_integer_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
    )
}

fn is_numeric_type(dtype: &DataType) -> bool {
    is_integer_type(dtype)
        || matches!(
            dtype,
            DataType::UInt64 | DataType::Float32 | DataType::Float64
        )
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
    let column = df.column(col_name)?;
    // Integers go through `Value::from(i64)`, which keeps long ones as text
    let values = if is_integer_type(column.dtype()) {
        let cast = column.cast(&DataType::Int64)?;
        cast.i64()?
            .into_iter()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .collect()
    } else if *column.dtype() == DataType::UInt64 {
        column
            .u64()?
            .into_iter()
            .map(|v| match v {
                Some(n) => i64::try_from(n)
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::text(n.to_string())),
                None => Value::Null,
            })
            .collect()
    } else if is_numeric_type(column.dtype()) {
        let cast = column.cast(&DataType::Float64)?;
        cast.f64()?
            .into_iter()
            .map(|v| v.map(Value::number).unwrap_or(Value::Null))
            .collect()
    } else {
        let cast = column.cast(&DataType::String)?;
        cast.str()?
            .into_iter()
            .map(|v| match v {
                Some(s) => Value::text(s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")),
                None => Value::Null,
            })
            .collect()
    };

    Ok(LoadedColumn {
        name: col_name.to_string(),
        values,
    })
}

fn detect_file_type(path: &Path) -> Result<FileType, GateViewError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(GateViewError::UnknownFileType(path.to_path_buf())),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, GateViewError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => GateViewError::FileNotFound(path.clone()),
        ErrorKind::PermissionDenied => GateViewError::PermissionDenied(path.clone()),
        _ => GateViewError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(GateViewError::LoadingFailed(format!(
            "{} is not a file",
            path.display()
        )));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

// Every CSV column is read as text so codes like "0001" keep their zeros.
// Sorting and ranges still compare numerically via `Value::as_number`.
fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

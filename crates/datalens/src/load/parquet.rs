//! Columnar-binary (Parquet) loading, behind the `parquet` feature.

use std::fs::File;
use std::path::Path;

use arrow::array::{
    Array, BooleanArray, Date32Array, Date64Array, Float16Array, Float32Array, Float64Array,
    Int8Array, Int16Array, Int32Array, Int64Array, LargeStringArray, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{DataLensError, Result};
use crate::table::{Column, ColumnData};

/// Read a Parquet file into typed columns. This is a passthrough to the
/// arrow reader; no bespoke parsing happens here.
pub fn load_parquet(path: &Path, max_rows: Option<usize>) -> Result<Vec<Column>> {
    let file = File::open(path).map_err(|e| DataLensError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DataLensError::Load(format!("parquet open failure: {e}")))?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| DataLensError::Load(format!("parquet read failure: {e}")))?;

    let mut batches: Vec<RecordBatch> = Vec::new();
    let mut rows_read = 0usize;
    for batch in reader {
        let batch = batch.map_err(|e| DataLensError::Load(format!("parquet read failure: {e}")))?;
        rows_read += batch.num_rows();
        batches.push(batch);
        if max_rows.is_some_and(|max| rows_read >= max) {
            break;
        }
    }

    let mut columns = Vec::with_capacity(schema.fields().len());
    for (idx, field) in schema.fields().iter().enumerate() {
        let arrays: Vec<&dyn Array> = batches.iter().map(|b| b.column(idx).as_ref()).collect();
        let mut data = column_data(field.data_type(), &arrays)?;
        if let Some(max) = max_rows {
            data = data.take_rows(&(0..max.min(data.len())).collect::<Vec<_>>());
        }
        columns.push(Column::new(field.name().clone(), data));
    }

    Ok(columns)
}

fn column_data(data_type: &DataType, arrays: &[&dyn Array]) -> Result<ColumnData> {
    macro_rules! gather_ints {
        ($array_ty:ty) => {{
            let mut cells: Vec<Option<i64>> = Vec::new();
            for array in arrays {
                let typed = downcast::<$array_ty>(array)?;
                for i in 0..typed.len() {
                    cells.push((!typed.is_null(i)).then(|| typed.value(i) as i64));
                }
            }
            Ok(ColumnData::Integer(cells))
        }};
    }

    macro_rules! gather_floats {
        ($array_ty:ty) => {{
            let mut cells: Vec<Option<f64>> = Vec::new();
            for array in arrays {
                let typed = downcast::<$array_ty>(array)?;
                for i in 0..typed.len() {
                    cells.push((!typed.is_null(i)).then(|| f64::from(typed.value(i))));
                }
            }
            Ok(ColumnData::Float(cells))
        }};
    }

    macro_rules! gather_timestamps {
        ($array_ty:ty) => {{
            let mut cells: Vec<Option<NaiveDateTime>> = Vec::new();
            for array in arrays {
                let typed = downcast::<$array_ty>(array)?;
                for i in 0..typed.len() {
                    if typed.is_null(i) {
                        cells.push(None);
                    } else {
                        cells.push(typed.value_as_datetime(i));
                    }
                }
            }
            Ok(ColumnData::DateTime(cells))
        }};
    }

    match data_type {
        DataType::Boolean => {
            let mut cells: Vec<Option<bool>> = Vec::new();
            for array in arrays {
                let typed = downcast::<BooleanArray>(array)?;
                for i in 0..typed.len() {
                    cells.push((!typed.is_null(i)).then(|| typed.value(i)));
                }
            }
            Ok(ColumnData::Boolean(cells))
        }
        DataType::Int8 => gather_ints!(Int8Array),
        DataType::Int16 => gather_ints!(Int16Array),
        DataType::Int32 => gather_ints!(Int32Array),
        DataType::Int64 => gather_ints!(Int64Array),
        DataType::UInt8 => gather_ints!(UInt8Array),
        DataType::UInt16 => gather_ints!(UInt16Array),
        DataType::UInt32 => gather_ints!(UInt32Array),
        DataType::UInt64 => gather_ints!(UInt64Array),
        DataType::Float16 => gather_floats!(Float16Array),
        DataType::Float32 => gather_floats!(Float32Array),
        DataType::Float64 => gather_floats!(Float64Array),
        DataType::Utf8 => {
            let mut cells: Vec<Option<String>> = Vec::new();
            for array in arrays {
                let typed = downcast::<StringArray>(array)?;
                for i in 0..typed.len() {
                    cells.push((!typed.is_null(i)).then(|| typed.value(i).to_string()));
                }
            }
            Ok(ColumnData::Text(cells))
        }
        DataType::LargeUtf8 => {
            let mut cells: Vec<Option<String>> = Vec::new();
            for array in arrays {
                let typed = downcast::<LargeStringArray>(array)?;
                for i in 0..typed.len() {
                    cells.push((!typed.is_null(i)).then(|| typed.value(i).to_string()));
                }
            }
            Ok(ColumnData::Text(cells))
        }
        DataType::Timestamp(TimeUnit::Second, _) => gather_timestamps!(TimestampSecondArray),
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            gather_timestamps!(TimestampMillisecondArray)
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            gather_timestamps!(TimestampMicrosecondArray)
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            gather_timestamps!(TimestampNanosecondArray)
        }
        DataType::Date32 => {
            let mut cells: Vec<Option<NaiveDateTime>> = Vec::new();
            for array in arrays {
                let typed = downcast::<Date32Array>(array)?;
                for i in 0..typed.len() {
                    if typed.is_null(i) {
                        cells.push(None);
                    } else {
                        cells.push(
                            typed
                                .value_as_date(i)
                                .and_then(|d| d.and_hms_opt(0, 0, 0)),
                        );
                    }
                }
            }
            Ok(ColumnData::DateTime(cells))
        }
        DataType::Date64 => gather_timestamps!(Date64Array),
        other => Err(DataLensError::Load(format!(
            "unsupported parquet column type: {other}"
        ))),
    }
}

fn downcast<'a, T: 'static>(array: &'a dyn Array) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DataLensError::Load("parquet column type mismatch".to_string()))
}

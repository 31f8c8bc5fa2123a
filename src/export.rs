use crate::error::Error;
use clap::ValueEnum;
use datafusion::arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{DataType, Float64Type, SchemaRef, UInt64Type};
use datafusion::arrow::util::pretty::print_batches;
use datafusion::common::config::CsvOptions;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::datasource::MemTable;
use datafusion::prelude::{DataFrame, SessionContext};
use log::{info, warn};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

/// `<output_dir>/<name>.<extension>`
pub fn output_path(output_dir: &Path, name: &str, format: ExportFormat) -> PathBuf {
    output_dir.join(format!("{}.{}", name, format.extension()))
}

/// The final report, materialized once so printing and writing share the same rows.
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    pub async fn collect(df: DataFrame) -> Result<Self, Error> {
        let schema = df.schema().inner().clone();
        let batches = df.collect().await?;
        Ok(Table { schema, batches })
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|batch| batch.num_rows()).sum()
    }
}

/// Prints the table to stdout.
pub fn print_table(table: &Table) -> Result<(), Error> {
    print_batches(&table.batches)?;
    Ok(())
}

/// Writes the table to `path` as a single file with one header row.
///
/// # Arguments
/// * `ctx` - The [`SessionContext`] used for the CSV writer
/// * `table` - The collected report
/// * `path` - Target file, overwritten when it exists
/// * `format` - CSV or Excel
///
/// # Returns
/// A Result containing either the number of data rows written or an [`Error`]
pub async fn write_table(
    ctx: &SessionContext,
    table: Table,
    path: &Path,
    format: ExportFormat,
) -> Result<usize, Error> {
    let rows = table.num_rows();

    match format {
        ExportFormat::Csv => write_csv(ctx, table, path).await?,
        ExportFormat::Xlsx => write_xlsx(&table, path)?,
    };

    if rows == 0 {
        warn!("{} was written without data rows", path.display());
    } else {
        info!("Wrote {} rows to {}", rows, path.display());
    }

    Ok(rows)
}

async fn write_csv(ctx: &SessionContext, table: Table, path: &Path) -> Result<(), Error> {
    let mem_table = MemTable::try_new(table.schema, vec![table.batches])?;

    ctx.read_table(Arc::new(mem_table))?
        .write_csv(
            &path.to_string_lossy(),
            DataFrameWriteOptions::new().with_single_file_output(true),
            Some(CsvOptions::default().with_has_header(true)),
        )
        .await?;

    Ok(())
}

fn write_xlsx(table: &Table, path: &Path) -> Result<(), Error> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, field) in table.schema.fields().iter().enumerate() {
        worksheet.write_string(0, col as u16, field.name())?;
    }

    let mut row: u32 = 1;
    for batch in &table.batches {
        write_batch(worksheet, batch, row)?;
        row += batch.num_rows() as u32;
    }

    workbook.save(path)?;

    Ok(())
}

/// Numbers and booleans keep their cell type, everything else is written as text.
fn write_batch(worksheet: &mut Worksheet, batch: &RecordBatch, first_row: u32) -> Result<(), Error> {
    let columns = batch
        .columns()
        .iter()
        .map(|column| match column.data_type() {
            DataType::Utf8 | DataType::Float64 | DataType::UInt64 | DataType::Boolean => {
                Ok(column.clone())
            }
            _ => cast(column, &DataType::Utf8),
        })
        .collect::<Result<Vec<ArrayRef>, _>>()?;

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        for i in 0..batch.num_rows() {
            if column.is_null(i) {
                continue;
            }

            let row = first_row + i as u32;
            match column.data_type() {
                DataType::Float64 => {
                    worksheet.write_number(row, col, column.as_primitive::<Float64Type>().value(i))?;
                }
                DataType::UInt64 => {
                    let value = column.as_primitive::<UInt64Type>().value(i);
                    worksheet.write_number(row, col, value as f64)?;
                }
                DataType::Boolean => {
                    worksheet.write_boolean(row, col, column.as_boolean().value(i))?;
                }
                _ => {
                    worksheet.write_string(row, col, column.as_string::<i32>().value(i))?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::{ad_group_rows, campaign_rows};
    use crate::data::{ad_group_schema, ad_groups_to_df, campaigns_to_df, fill_missing};
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use datafusion::arrow::compute::concat_batches;
    use std::fs;
    use tempfile::TempDir;

    async fn ad_group_batch(ctx: &SessionContext, ids: &[&str]) -> Result<RecordBatch, Error> {
        let df = fill_missing(ad_groups_to_df(&ad_group_rows("1", ids), ctx)?)?;
        let batches = df.collect().await?;
        Ok(concat_batches(&batches[0].schema(), &batches)?)
    }

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("/tmp/reports"), "campaigns_data", ExportFormat::Csv);
        assert_eq!(path, PathBuf::from("/tmp/reports/campaigns_data.csv"));

        let path = output_path(Path::new("/tmp/reports"), "creative_sets", ExportFormat::Xlsx);
        assert_eq!(path, PathBuf::from("/tmp/reports/creative_sets.xlsx"));
    }

    #[tokio::test]
    async fn test_write_csv_single_header() -> Result<(), Error> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("campaigns_data.csv");
        let ctx = SessionContext::new();
        let df = fill_missing(campaigns_to_df(&campaign_rows(&[(1, "US"), (2, "GB")]), &ctx)?)?;
        let table = Table::collect(df).await?;

        let rows = write_table(&ctx, table, &path, ExportFormat::Csv).await?;

        assert_eq!(rows, 2);
        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("campaign_id,campaign_name,"));
        assert_eq!(
            lines.iter().filter(|line| line.starts_with("campaign_id")).count(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_write_csv_from_collected_batches() -> Result<(), Error> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ad_groups.csv");
        let ctx = SessionContext::new();
        let first = ad_group_batch(&ctx, &["10", "11"]).await?;
        let second = ad_group_batch(&ctx, &["12"]).await?;
        let table = Table {
            schema: first.schema(),
            batches: vec![first, second],
        };
        assert_eq!(table.num_rows(), 3);

        let rows = write_table(&ctx, table, &path, ExportFormat::Csv).await?;

        assert_eq!(rows, 3);
        let content = fs::read_to_string(&path)?;
        let ad_group_ids: Vec<&str> = content
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(1).unwrap())
            .collect();
        assert_eq!(ad_group_ids, vec!["10", "11", "12"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_xlsx_cells() -> Result<(), Error> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ad_groups.xlsx");
        let ctx = SessionContext::new();
        let first = ad_group_batch(&ctx, &["10", "11"]).await?;
        let second = ad_group_batch(&ctx, &["12"]).await?;
        let table = Table {
            schema: first.schema(),
            batches: vec![first, second],
        };

        let rows = write_table(&ctx, table, &path, ExportFormat::Xlsx).await?;
        assert_eq!(rows, 3);

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let sheets = workbook.worksheets();
        assert_eq!(sheets.len(), 1);
        let range = &sheets[0].1;
        assert_eq!(range.height(), 4);

        for (col, field) in ad_group_schema().fields().iter().enumerate() {
            assert_eq!(range.get((0, col)), Some(&Data::String(field.name().to_string())));
        }

        // Rows of the second batch follow the first one.
        let ad_group_ids: Vec<_> = (1..4).map(|row| range.get((row, 1)).cloned()).collect();
        assert_eq!(
            ad_group_ids,
            vec![
                Some(Data::String("10".into())),
                Some(Data::String("11".into())),
                Some(Data::String("12".into())),
            ]
        );

        // deleted, impressions
        assert_eq!(range.get((3, 6)), Some(&Data::Bool(false)));
        assert_eq!(range.get((3, 8)), Some(&Data::Float(0.0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_xlsx_empty_table() -> Result<(), Error> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.xlsx");
        let ctx = SessionContext::new();
        let table = Table::collect(ad_groups_to_df(&[], &ctx)?).await?;

        let rows = write_table(&ctx, table, &path, ExportFormat::Xlsx).await?;

        assert_eq!(rows, 0);
        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let sheets = workbook.worksheets();
        assert_eq!(sheets[0].1.height(), 1);
        Ok(())
    }
}

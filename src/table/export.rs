// src/table/export.rs

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{fs, fs::File, path::Path};
use tracing::info;

use super::WideTable;

impl WideTable {
    /// Text rendering of the first `n` rows, for the console.
    pub fn preview(&self, n: usize) -> Result<String> {
        let head = self.record_batch().slice(0, n.min(self.num_rows()));
        Ok(pretty_format_batches(&[head])
            .context("formatting table preview")?
            .to_string())
    }

    /// Write the whole table as a single Snappy-compressed Parquet file.
    pub fn write_parquet(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {:?}", parent))?;
        }

        let batch = self.record_batch();
        let file = File::create(path).with_context(|| format!("creating table file {:?}", path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("creating Arrow writer for wide table")?;
        writer.write(batch).context("writing wide table batch")?;
        writer.close().context("closing wide table writer")?;

        info!(path = %path.display(), rows = batch.num_rows(), "wrote wide table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::table::testing::table;
    use crate::table::{WideTable, FERTILITY_RATE, TEEN_BIRTH_RATE};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;
    use tempfile::tempdir;

    fn sample() -> WideTable {
        table(&[
            ("Denmark", 1960, FERTILITY_RATE, 2.57),
            ("Denmark", 2022, FERTILITY_RATE, 1.55),
            ("Denmark", 2022, TEEN_BIRTH_RATE, 1.8),
            ("Finland", 1960, FERTILITY_RATE, 2.72),
        ])
    }

    #[test]
    fn preview_shows_header_and_head_rows() {
        let text = sample().preview(2).unwrap();
        assert!(text.contains("country"));
        assert!(text.contains(FERTILITY_RATE));
        assert!(text.contains("Denmark"));
        assert!(!text.contains("Finland"));
    }

    #[test]
    fn parquet_roundtrip_keeps_rows() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out").join("table.parquet");
        let t = sample();
        t.write_parquet(&path).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 1);
        let back = WideTable::from_batch(batches[0].clone()).unwrap();
        assert_eq!(back.num_rows(), t.num_rows());
        assert_eq!(back.indicator_columns(), t.indicator_columns());
        assert_eq!(back.value("Denmark", 2022, TEEN_BIRTH_RATE), Some(1.8));
        assert_eq!(back.value("Finland", 2022, FERTILITY_RATE), None);
    }
}

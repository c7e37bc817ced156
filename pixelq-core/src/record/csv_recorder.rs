//! A recorder that writes aggregated scalar metrics to a CSV file.
use super::{Record, RecordValue, Recorder};
use anyhow::Result;
use std::{collections::BTreeMap, fs::File, path::Path};

/// Writes scalar metrics to a CSV file with columns `step,key,value`.
///
/// Stored records are aggregated per key: on [`Recorder::flush`], the mean
/// of every scalar collected since the last flush is written in one row per
/// key. Non-scalar record values are skipped, they have no CSV representation.
pub struct CsvRecorder {
    wtr: csv::Writer<File>,
    storage: BTreeMap<String, Vec<f32>>,
}

impl CsvRecorder {
    /// Creates a recorder writing to the CSV file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&["step", "key", "value"])?;

        Ok(Self {
            wtr,
            storage: BTreeMap::new(),
        })
    }

    fn store_scalars(&mut self, record: &Record) {
        for (k, v) in record.iter() {
            if let RecordValue::Scalar(v) = v {
                self.storage.entry(k.clone()).or_insert_with(Vec::new).push(*v);
            }
        }
    }
}

impl Recorder for CsvRecorder {
    /// Equivalent to [`Recorder::store`]; rows only appear on flush.
    fn write(&mut self, record: Record) {
        self.store_scalars(&record);
    }

    fn store(&mut self, record: Record) {
        self.store_scalars(&record);
    }

    fn flush(&mut self, step: i64) {
        for (k, vs) in self.storage.iter() {
            if vs.is_empty() {
                continue;
            }
            let mean = vs.iter().sum::<f32>() / vs.len() as f32;
            // A failed row is logged and skipped; metrics are best-effort.
            if let Err(e) =
                self.wtr
                    .write_record(&[step.to_string(), k.clone(), mean.to_string()])
            {
                log::warn!("Failed to write a record to the CSV file: {}", e);
            }
        }
        self.storage.clear();

        if let Err(e) = self.wtr.flush() {
            log::warn!("Failed to flush the CSV file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn aggregates_scalars_by_mean() -> Result<()> {
        let dir = TempDir::new("csv_recorder")?;
        let path = dir.path().join("metrics.csv");

        let mut recorder = CsvRecorder::new(&path)?;
        recorder.store(Record::from_scalar("loss", 1.0));
        recorder.store(Record::from_scalar("loss", 3.0));
        recorder.flush(10);
        drop(recorder);

        let content = std::fs::read_to_string(&path)?;
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("step,key,value"));
        assert_eq!(lines.next(), Some("10,loss,2"));
        Ok(())
    }
}

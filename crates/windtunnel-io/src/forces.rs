use std::{fs::{File, OpenOptions}, io::{BufRead, BufReader, Write}, path::{Path, PathBuf}};

use glam::DVec3;

use crate::{DecodingError, EncodingError};

/// Column header of the force time series.
pub const HEADER: &str = "t_lbm,t_si,Fx_lbm,Fy_lbm,Fz_lbm,Fx_siN,Fy_siN,Fz_siN";

/// One row of the force time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceRecord {
    /// Time step.
    pub t: u64,
    /// Simulated time, in seconds.
    pub t_si: f64,
    /// Total force on solid cells, in lattice units.
    pub force: DVec3,
    /// Total force on solid cells, in newtons.
    pub force_si: DVec3,
}

impl ForceRecord {
    pub fn to_row(&self) -> String {
        let Self { t, t_si, force: f, force_si: s } = self;
        format!("{t},{t_si},{},{},{},{},{},{}", f.x, f.y, f.z, s.x, s.y, s.z)
    }

    pub fn parse(row: &str, line: usize) -> Result<ForceRecord, DecodingError> {
        let bad = || DecodingError::Syntax { line };
        let mut cols = row.trim_end().split(',');

        let t = cols.next().and_then(|c| c.parse().ok()).ok_or_else(bad)?;
        let mut v = [0.0; 7];
        for x in &mut v {
            *x = cols.next().and_then(|c| c.parse().ok()).ok_or_else(bad)?;
        }

        if cols.next().is_some() {
            return Err(bad());
        }

        Ok(ForceRecord {
            t,
            t_si: v[0],
            force: DVec3::new(v[1], v[2], v[3]),
            force_si: DVec3::new(v[4], v[5], v[6]),
        })
    }
}

/// Appends rows to a force time series file.
///
/// Every row is written with its own open/write/flush, so nothing is held back between steps.
#[derive(Debug, Clone)]
pub struct ForceLogEncoder {
    path: PathBuf,
}

impl ForceLogEncoder {
    /// Creates the file fresh, truncating any previous run, and writes the header.
    pub fn create(path: PathBuf) -> Result<ForceLogEncoder, EncodingError> {
        let mut file = File::create(&path)?;
        writeln!(file, "{HEADER}")?;
        file.flush()?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &ForceRecord) -> Result<(), EncodingError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", record.to_row())?;
        file.flush()?;

        Ok(())
    }
}

/// Reads back a force time series written by [`ForceLogEncoder`].
pub fn read_forces(path: impl AsRef<Path>) -> Result<Vec<ForceRecord>, DecodingError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines.next().transpose()?;
    if header.as_deref().map(str::trim_end) != Some(HEADER) {
        return Err(DecodingError::Header);
    }

    let mut records = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        records.push(ForceRecord::parse(&line, i + 2)?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(t: u64) -> ForceRecord {
        ForceRecord {
            t,
            t_si: t as f64 * 0.25,
            force: DVec3::new(0.5, -1.25, 0.0),
            force_si: DVec3::new(1e-7, 3.0, -0.125),
        }
    }

    #[test]
    fn test_row_format() {
        assert_eq!(record(4).to_row(), "4,1,0.5,-1.25,0,0.0000001,3,-0.125");
    }

    #[test]
    fn test_create_truncates_and_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forces.csv");
        std::fs::write(&path, "stale\n").unwrap();

        let log = ForceLogEncoder::create(path.clone()).unwrap();
        log.append(&record(2)).unwrap();
        log.append(&record(4)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{HEADER}\n{}\n{}\n", record(2).to_row(), record(4).to_row()));
        assert_eq!(read_forces(&path).unwrap(), vec![record(2), record(4)]);
    }

    #[test]
    fn test_append_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = ForceLogEncoder::create(dir.path().join("forces.csv")).unwrap();
        std::fs::remove_file(log.path()).unwrap();

        assert!(log.append(&record(1)).is_err());
    }

    #[test]
    fn test_rejects_bad_rows() {
        assert!(matches!(ForceRecord::parse("1,2,3", 5), Err(DecodingError::Syntax { line: 5 })));
        assert!(ForceRecord::parse("1,2,3,4,5,6,7,8,9", 1).is_err());
        assert!(ForceRecord::parse("x,2,3,4,5,6,7,8", 1).is_err());
    }
}

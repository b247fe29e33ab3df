//! Reading dumps of measured ground-truth boxes.
//!
//! A dump is a list of `(x, y, w, h)` records, pickled by the dataset tooling
//! or written as a JSON array. Only the relative size `(w / x, h / y)` is kept.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{FitError, Result};
use crate::geometry::AnchorBox;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    /// Pick by extension: `.json` is JSON, anything else is pickle.
    #[default]
    Auto,
    Pickle,
    Json,
}

impl DumpFormat {
    fn resolve(self, path: &Path) -> DumpFormat {
        match self {
            DumpFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => DumpFormat::Json,
                _ => DumpFormat::Pickle,
            },
            f => f,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub format: DumpFormat,
    /// Drop records whose relative size is not positive instead of failing.
    pub skip_degenerate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRecord {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoxRecord {
    pub fn to_relative(&self) -> (f64, f64) {
        (self.w / self.x, self.h / self.y)
    }
}

#[derive(Debug, Clone)]
pub struct BoxDump {
    pub records: usize,
    pub skipped: usize,
    pub boxes: Vec<AnchorBox>,
}

pub fn load_boxes(path: impl AsRef<Path>, opts: &LoadOptions) -> Result<BoxDump> {
    let path = path.as_ref();
    let records = read_records(path, opts.format)?;
    let total = records.len();

    let mut boxes = Vec::with_capacity(total);
    let mut skipped = 0usize;
    for (index, rec) in records.iter().enumerate() {
        let (width, height) = rec.to_relative();
        match AnchorBox::new(width, height) {
            Ok(b) => boxes.push(b),
            Err(_) if opts.skip_degenerate => {
                debug!(index, width, height, "skipping degenerate box");
                skipped += 1;
            }
            Err(_) => return Err(FitError::DegenerateBox { index, width, height }),
        }
    }

    if skipped > 0 {
        warn!(skipped, total, "dropped degenerate boxes from dump");
    }
    if boxes.is_empty() {
        return Err(FitError::Format { path: path.to_path_buf(), reason: "no usable boxes".into() });
    }
    info!(path = %path.display(), boxes = boxes.len(), "loaded box dump");

    Ok(BoxDump { records: total, skipped, boxes })
}

pub fn read_records(path: &Path, format: DumpFormat) -> Result<Vec<BoxRecord>> {
    let io_err = |source| FitError::Io { path: path.to_path_buf(), source };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);

    let format = format.resolve(path);
    let raw: Vec<Vec<f64>> = match format {
        DumpFormat::Json => serde_json::from_reader(reader).map_err(|e| format_err(path, e))?,
        _ => serde_pickle::from_reader(reader, serde_pickle::DeOptions::new()).map_err(|e| format_err(path, e))?,
    };
    debug!(?format, records = raw.len(), "decoded dump");

    raw.into_iter()
        .enumerate()
        .map(|(i, r)| match r.as_slice() {
            &[x, y, w, h] => Ok(BoxRecord { x, y, w, h }),
            other => Err(FitError::Format {
                path: path.to_path_buf(),
                reason: format!("record {i} has {} values, expected 4", other.len()),
            }),
        })
        .collect()
}

fn format_err(path: &Path, e: impl std::fmt::Display) -> FitError {
    FitError::Format { path: path.to_path_buf(), reason: e.to_string() }
}

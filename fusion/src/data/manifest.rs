use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{FusionErr, Result, model::INPUT_NAMES};

pub const LABEL_COLUMN: &str = "person_id";

/// A sample listed in a manifest: one array file per model input and the person it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub paths: [PathBuf; 4],
    pub person_id: usize,
}

/// The samples of a CSV manifest.
///
/// The first non blank line is a header naming the `face`, `palm_print`, `audio`, `signature`
/// and `person_id` columns in any order, other columns are ignored. Relative paths are resolved
/// against the manifest's directory.
///
/// Values are split on every comma, quoting isn't supported and quoted values are rejected.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    records: Vec<Record>,
}

impl Manifest {
    /// Reads and parses the manifest at `path`.
    ///
    /// # Arguments
    /// * `path` - The CSV file.
    /// * `num_classes` - Every `person_id` must be lower than this.
    pub fn read<P: AsRef<Path>>(path: P, num_classes: usize) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| FusionErr::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(path, &content, num_classes)
    }

    /// Parses the content of a manifest, `path` is only used to resolve relative paths and to
    /// report errors.
    pub fn parse(path: &Path, content: &str, num_classes: usize) -> Result<Self> {
        let base = path.parent().unwrap_or(Path::new(""));
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let Some((header_line, header)) = lines.next() else {
            return Err(FusionErr::manifest(path, 1, "missing header"));
        };

        let header: Vec<&str> = header.split(',').map(str::trim).collect();
        let column = |name: &str| {
            header.iter().position(|c| *c == name).ok_or_else(|| {
                FusionErr::manifest(path, header_line, format!("missing column '{name}'"))
            })
        };

        let mut input_columns = [0; 4];
        for (col, name) in input_columns.iter_mut().zip(INPUT_NAMES) {
            *col = column(name)?;
        }
        let label_column = column(LABEL_COLUMN)?;

        let mut records = Vec::new();
        for (n, line) in lines {
            let values: Vec<&str> = line.split(',').map(str::trim).collect();
            if values.iter().any(|v| v.starts_with('"')) {
                return Err(FusionErr::manifest(path, n, "quoted values aren't supported"));
            }
            if values.len() < header.len() {
                return Err(FusionErr::manifest(
                    path,
                    n,
                    format!("expected {} values, got {}", header.len(), values.len()),
                ));
            }

            let label = values[label_column];
            let person_id = label.parse::<usize>().map_err(|_| {
                FusionErr::manifest(path, n, format!("can't parse person_id '{label}'"))
            })?;
            if person_id >= num_classes {
                return Err(FusionErr::manifest(
                    path,
                    n,
                    format!("person_id {person_id} out of range for {num_classes} classes"),
                ));
            }

            let paths = input_columns.map(|col| base.join(values[col]));
            records.push(Record { paths, person_id });
        }

        if records.is_empty() {
            return Err(FusionErr::manifest(path, header_line, "no samples"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

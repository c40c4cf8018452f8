//! Datasets
//!
//! Adapters that read LibSVM and CSV files into a dense [`Dataset`], mapping the
//! raw class labels of each file onto `{-1, 1}`.
use crate::data::Dataset;
use crate::errors::GrowNetError;
use crate::utils::items_to_strings;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Training rows used for the LibSVM HIGGS dataset.
pub const HIGGS_TRAIN_ROWS: usize = 1_000_000;

/// On-disk layout of a dataset file.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub enum DataFormat {
    /// `label idx:value idx:value ...` with 1-based indices.
    LibSvm,
    /// Comma separated, label first.
    Csv,
}

impl FromStr for DataFormat {
    type Err = GrowNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "libsvm" => Ok(DataFormat::LibSvm),
            "csv" => Ok(DataFormat::Csv),
            _ => Err(GrowNetError::ParseString(
                s.to_string(),
                "DataFormat".to_string(),
                items_to_strings(vec!["libsvm", "csv"]),
            )),
        }
    }
}

/// Raw label values that map to the positive and negative class.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct LabelMap {
    pub positive: f64,
    pub negative: f64,
}

impl Default for LabelMap {
    fn default() -> Self {
        LabelMap {
            positive: 1.0,
            negative: -1.0,
        }
    }
}

impl LabelMap {
    pub fn new(positive: f64, negative: f64) -> Self {
        LabelMap { positive, negative }
    }

    /// Map a raw label onto `{-1, 1}`, `None` if it belongs to neither class.
    pub fn map(&self, raw: f64) -> Option<f32> {
        if raw == self.positive {
            Some(1.0)
        } else if raw == self.negative {
            Some(-1.0)
        } else {
            None
        }
    }
}

/// Named datasets with a known file format and label encoding.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum DatasetPreset {
    A9a,
    Ijcnn1,
    RealSim,
    Covtype,
    Mnist28,
    Higgs,
    Criteo,
    Criteo2,
    HiggsCsv,
    Allstate,
    YahooPair,
    Custom,
}

impl FromStr for DatasetPreset {
    type Err = GrowNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a9a" => Ok(DatasetPreset::A9a),
            "ijcnn1" => Ok(DatasetPreset::Ijcnn1),
            "real-sim" => Ok(DatasetPreset::RealSim),
            "covtype" => Ok(DatasetPreset::Covtype),
            "mnist28" => Ok(DatasetPreset::Mnist28),
            "higgs" => Ok(DatasetPreset::Higgs),
            "criteo" => Ok(DatasetPreset::Criteo),
            "criteo2" => Ok(DatasetPreset::Criteo2),
            "Higgs" => Ok(DatasetPreset::HiggsCsv),
            "Allstate" => Ok(DatasetPreset::Allstate),
            "yahoo.pair" => Ok(DatasetPreset::YahooPair),
            "custom" => Ok(DatasetPreset::Custom),
            _ => Err(GrowNetError::ParseString(
                s.to_string(),
                "DatasetPreset".to_string(),
                items_to_strings(vec![
                    "a9a",
                    "ijcnn1",
                    "real-sim",
                    "covtype",
                    "mnist28",
                    "higgs",
                    "criteo",
                    "criteo2",
                    "Higgs",
                    "Allstate",
                    "yahoo.pair",
                    "custom",
                ]),
            )),
        }
    }
}

impl DatasetPreset {
    /// File format of the preset, `None` for `Custom`.
    pub fn format(&self) -> Option<DataFormat> {
        match self {
            DatasetPreset::A9a
            | DatasetPreset::Ijcnn1
            | DatasetPreset::RealSim
            | DatasetPreset::Covtype
            | DatasetPreset::Mnist28
            | DatasetPreset::Higgs => Some(DataFormat::LibSvm),
            DatasetPreset::Criteo
            | DatasetPreset::Criteo2
            | DatasetPreset::HiggsCsv
            | DatasetPreset::Allstate
            | DatasetPreset::YahooPair => Some(DataFormat::Csv),
            DatasetPreset::Custom => None,
        }
    }

    /// Rows the original HIGGS experiment trained on, drawn once from the full file.
    pub fn train_subsample(&self) -> Option<usize> {
        match self {
            DatasetPreset::Higgs => Some(HIGGS_TRAIN_ROWS),
            _ => None,
        }
    }

    pub fn label_map(&self) -> LabelMap {
        match self {
            DatasetPreset::Covtype => LabelMap::new(1.0, 2.0),
            DatasetPreset::Mnist28 => LabelMap::new(2.0, 8.0),
            DatasetPreset::Higgs => LabelMap::new(0.0, 1.0),
            DatasetPreset::Criteo
            | DatasetPreset::Criteo2
            | DatasetPreset::HiggsCsv
            | DatasetPreset::Allstate => LabelMap::new(1.0, 0.0),
            _ => LabelMap::default(),
        }
    }
}

/// Options for CSV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvOptions {
    /// Skip the first record.
    pub has_header: bool,
    /// Column holding a per-row sample weight. It is excluded from the features.
    pub weight_column: Option<usize>,
}

fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, GrowNetError> {
    fs::read_to_string(path.as_ref())
        .map_err(|e| GrowNetError::UnableToRead(format!("{}: {}", path.as_ref().display(), e)))
}

fn map_label(raw: f64, label_map: &LabelMap, line: usize, source: &str) -> Result<f32, GrowNetError> {
    label_map.map(raw).ok_or_else(|| {
        GrowNetError::ParseData(
            line,
            source.to_string(),
            format!(
                "label {} is neither positive ({}) nor negative ({})",
                raw, label_map.positive, label_map.negative
            ),
        )
    })
}

/// Parse LibSVM text into a dense dataset with `feature_dim` columns.
pub fn parse_libsvm(contents: &str, feature_dim: usize, label_map: &LabelMap, source: &str) -> Result<Dataset, GrowNetError> {
    let mut features = Vec::new();
    let mut labels = Vec::new();
    for (n, raw_line) in contents.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let label_token = tokens.next().unwrap_or("");
        let raw = label_token
            .parse::<f64>()
            .map_err(|e| GrowNetError::ParseData(n + 1, source.to_string(), format!("label {}: {}", label_token, e)))?;
        labels.push(map_label(raw, label_map, n + 1, source)?);

        let start = features.len();
        features.resize(start + feature_dim, 0.0);
        for token in tokens {
            let (idx, value) = token.split_once(':').ok_or_else(|| {
                GrowNetError::ParseData(n + 1, source.to_string(), format!("expected idx:value, found {}", token))
            })?;
            let idx = idx
                .parse::<usize>()
                .map_err(|e| GrowNetError::ParseData(n + 1, source.to_string(), format!("index {}: {}", idx, e)))?;
            let value = value
                .parse::<f32>()
                .map_err(|e| GrowNetError::ParseData(n + 1, source.to_string(), format!("value {}: {}", value, e)))?;
            if idx == 0 || idx > feature_dim {
                return Err(GrowNetError::ParseData(
                    n + 1,
                    source.to_string(),
                    format!("feature index {} outside 1..={}", idx, feature_dim),
                ));
            }
            features[start + idx - 1] = value;
        }
    }
    Dataset::new(features, labels, feature_dim)
}

/// Load a LibSVM file into a dense dataset with `feature_dim` columns.
pub fn load_libsvm<P: AsRef<Path>>(path: P, feature_dim: usize, label_map: &LabelMap) -> Result<Dataset, GrowNetError> {
    let contents = read_to_string(path.as_ref())?;
    parse_libsvm(&contents, feature_dim, label_map, &path.as_ref().display().to_string())
}

/// Parse CSV records: the label in column 0, followed by `feature_dim` feature columns.
pub fn parse_csv<R: std::io::Read>(
    reader: R,
    feature_dim: usize,
    label_map: &LabelMap,
    options: CsvOptions,
    source: &str,
) -> Result<Dataset, GrowNetError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(options.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut weights = Vec::new();
    for (n, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| GrowNetError::ParseData(n + 1, source.to_string(), e.to_string()))?;
        let parse = |col: usize| -> Result<f64, GrowNetError> {
            let field = record.get(col).ok_or_else(|| {
                GrowNetError::ParseData(n + 1, source.to_string(), format!("missing column {}", col))
            })?;
            field
                .parse::<f64>()
                .map_err(|e| GrowNetError::ParseData(n + 1, source.to_string(), format!("column {}: {}", col, e)))
        };
        labels.push(map_label(parse(0)?, label_map, n + 1, source)?);

        let mut taken = 0;
        let mut col = 1;
        while taken < feature_dim {
            if Some(col) != options.weight_column {
                features.push(parse(col)? as f32);
                taken += 1;
            }
            col += 1;
        }
        if let Some(wc) = options.weight_column {
            weights.push(parse(wc)? as f32);
        }
    }
    let data = Dataset::new(features, labels, feature_dim)?;
    if options.weight_column.is_some() {
        data.with_weights(weights)
    } else {
        Ok(data)
    }
}

/// Load a CSV file; see [`parse_csv`].
pub fn load_csv<P: AsRef<Path>>(
    path: P,
    feature_dim: usize,
    label_map: &LabelMap,
    options: CsvOptions,
) -> Result<Dataset, GrowNetError> {
    let file = fs::File::open(path.as_ref())
        .map_err(|e| GrowNetError::UnableToRead(format!("{}: {}", path.as_ref().display(), e)))?;
    parse_csv(file, feature_dim, label_map, options, &path.as_ref().display().to_string())
}

/// Load a dataset file in the given format.
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    format: DataFormat,
    feature_dim: usize,
    label_map: &LabelMap,
    csv_options: CsvOptions,
) -> Result<Dataset, GrowNetError> {
    let data = match format {
        DataFormat::LibSvm => load_libsvm(path.as_ref(), feature_dim, label_map)?,
        DataFormat::Csv => load_csv(path.as_ref(), feature_dim, label_map, csv_options)?,
    };
    let (positive, negative) = data.class_counts();
    info!(
        "Loaded {} rows from {} ({} positive, {} negative).",
        data.len(),
        path.as_ref().display(),
        positive,
        negative
    );
    Ok(data)
}

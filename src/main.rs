use clap::Parser;
use grownet::booster::config::BoosterConfig;
use grownet::datasets::{load_dataset, CsvOptions, DataFormat, DatasetPreset};
use grownet::objective::ModelOrder;
use grownet::sampler::SampleMethod;
use grownet::{GrowNetBooster, GrowNetError};
use log::info;
use std::fs;
use std::path::PathBuf;

/// Train a GrowNet ensemble on a binary classification dataset.
#[derive(Parser, Debug, Clone)]
#[command(name = "grownet", version)]
pub struct Args {
    /// Number of input features
    #[arg(long)]
    pub feat_d: usize,

    /// Hidden layer width of every weak learner
    #[arg(long)]
    pub hidden_d: usize,

    /// Initial boost rate
    #[arg(long)]
    pub boost_rate: f32,

    /// Learning rate
    #[arg(long)]
    pub lr: f32,

    /// Number of boosting stages
    #[arg(long)]
    pub num_nets: usize,

    /// Dataset name, selecting file format and label encoding (e.g. a9a, covtype, criteo, custom)
    #[arg(long)]
    pub data: String,

    /// Training file
    #[arg(long)]
    pub tr: PathBuf,

    /// Test file
    #[arg(long)]
    pub te: PathBuf,

    #[arg(long)]
    pub batch_size: usize,

    /// Epochs to fit each new learner
    #[arg(long)]
    pub epochs_per_stage: usize,

    /// Epochs of the fully-corrective step
    #[arg(long)]
    pub correct_epoch: usize,

    /// L2 weight decay
    #[arg(long, alias = "L2")]
    pub l2: f32,

    /// Min-max scale features with training statistics
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub normalization: bool,

    /// Hold out 5% of the training rows as a validation set
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub cv: bool,

    /// Gradient direction the learners are fit to: first or second
    #[arg(long, default_value = "second")]
    pub model_order: String,

    /// Checkpoint written after every stage
    #[arg(long)]
    pub out_f: PathBuf,

    /// File format (libsvm or csv), required for custom datasets
    #[arg(long)]
    pub format: Option<String>,

    /// CSV files start with a header row
    #[arg(long, default_value_t = false)]
    pub has_header: bool,

    /// CSV column holding sample weights
    #[arg(long)]
    pub weight_column: Option<usize>,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Threads used for training, all cores when omitted
    #[arg(long)]
    pub num_threads: Option<usize>,

    /// Train on a fixed number of randomly drawn rows, dropping incomplete batches
    #[arg(long)]
    pub train_subsample: Option<usize>,

    /// Directory for the training report
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,
}

fn main() -> Result<(), GrowNetError> {
    pretty_env_logger::init();
    let args = Args::parse();

    let preset: DatasetPreset = args.data.parse()?;
    let format = match &args.format {
        Some(f) => f.parse::<DataFormat>()?,
        None => preset.format().ok_or_else(|| {
            GrowNetError::InvalidParameter(
                "format".to_string(),
                "libsvm or csv for a custom dataset".to_string(),
                "nothing".to_string(),
            )
        })?,
    };
    let label_map = preset.label_map();
    let csv_options = CsvOptions {
        has_header: args.has_header,
        weight_column: args.weight_column,
    };
    let model_order: ModelOrder = args.model_order.parse()?;
    let sample_method = match args.train_subsample.or(preset.train_subsample()) {
        Some(n) => SampleMethod::FixedSize(n),
        None => SampleMethod::None,
    };

    let cfg = BoosterConfig {
        feature_dim: args.feat_d,
        hidden_dim: args.hidden_d,
        boost_rate: args.boost_rate,
        lr: args.lr,
        num_nets: args.num_nets,
        batch_size: args.batch_size,
        epochs_per_stage: args.epochs_per_stage,
        correct_epoch: args.correct_epoch,
        l2: args.l2,
        model_order,
        normalization: args.normalization,
        cv: args.cv,
        drop_last: sample_method != SampleMethod::None,
        sample_method,
        seed: args.seed,
        num_threads: args.num_threads,
        checkpoint_path: Some(args.out_f.clone()),
        ..Default::default()
    };
    let mut model = GrowNetBooster::new(cfg)?;

    let train = load_dataset(&args.tr, format, args.feat_d, &label_map, csv_options)?;
    let test = load_dataset(&args.te, format, args.feat_d, &label_map, csv_options)?;
    let (train, test, validation) = model.prepare(train, test)?;
    info!("{} training and test datasets are loaded!", args.data);

    let report = model.fit(&train, &test, validation.as_ref())?;

    fs::create_dir_all(&args.results_dir).map_err(|e| GrowNetError::UnableToWrite(e.to_string()))?;
    let order = match model_order {
        ModelOrder::First => "first",
        ModelOrder::Second => "second",
    };
    let report_path = args
        .results_dir
        .join(format!("{}_cls_{}u_1hl_{}.json", args.data, args.hidden_d, order));
    report.save_report(&report_path)?;
    info!("Report written to {}.", report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_original_arguments() {
        let args = Args::try_parse_from([
            "grownet",
            "--feat-d",
            "123",
            "--hidden-d",
            "16",
            "--boost-rate",
            "1",
            "--lr",
            "0.005",
            "--num-nets",
            "40",
            "--data",
            "a9a",
            "--tr",
            "a9a.train",
            "--te",
            "a9a.test",
            "--batch-size",
            "2048",
            "--epochs-per-stage",
            "1",
            "--correct-epoch",
            "1",
            "--L2",
            "0.001",
            "--normalization",
            "true",
            "--model-order",
            "first",
            "--out-f",
            "a9a_cls.json",
        ])
        .unwrap();
        assert_eq!(args.feat_d, 123);
        assert!(args.normalization);
        assert!(!args.cv);
        assert_eq!(args.l2, 0.001);
        assert_eq!(args.model_order, "first");
        assert_eq!(args.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_missing_required_argument() {
        assert!(Args::try_parse_from(["grownet", "--feat-d", "4"]).is_err());
    }
}

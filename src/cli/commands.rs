// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `preprocess`, `train`, `infer`
// and all their configurable flags.
//
// Flags are snake_case (`--data_path`); kebab-case spellings
// (`--data-path`) are accepted as aliases.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    infer_use_case::InferConfig,
    preprocess_use_case::PreprocessConfig,
    train_use_case::TrainConfig,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tokenize SQuAD-style corpora into feature tables
    Preprocess(PreprocessArgs),

    /// Train the Q&A model on preprocessed features
    Train(TrainArgs),

    /// Predict answers for a preprocessed test table
    Infer(InferArgs),
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Directory containing the train and test corpora
    #[arg(long = "data_path", alias = "data-path")]
    pub data_path: String,

    /// Directory to write feature tables into
    #[arg(long = "save_path", alias = "save-path")]
    pub save_path: String,

    /// Tokenizer: Hub id, model directory or tokenizer.json path
    #[arg(long = "pretrained_model_name", alias = "pretrained-model-name")]
    pub pretrained_model_name: String,

    /// Fraction of the training corpus held out for validation
    #[arg(long = "test_size", alias = "test-size", default_value_t = 0.2)]
    pub test_size: f64,

    /// Tokens per window: [CLS] question [SEP] context [SEP] + padding
    #[arg(long = "max_length", alias = "max-length", default_value_t = 384)]
    pub max_length: usize,

    /// Context tokens shared by consecutive windows
    #[arg(long, default_value_t = 50)]
    pub stride: usize,

    #[arg(long = "train_name", alias = "train-name", default_value = "train.json")]
    pub train_name: String,

    #[arg(long = "test_name", alias = "test-name", default_value = "test.json")]
    pub test_name: String,

    /// Seed for the train/validation shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<PreprocessArgs> for PreprocessConfig {
    fn from(a: PreprocessArgs) -> Self {
        PreprocessConfig {
            data_path:             a.data_path,
            save_path:             a.save_path,
            pretrained_model_name: a.pretrained_model_name,
            test_size:             a.test_size,
            max_length:            a.max_length,
            stride:                a.stride,
            train_name:            a.train_name,
            test_name:             a.test_name,
            seed:                  a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory written by `preprocess`
    #[arg(long = "file_path", alias = "file-path")]
    pub file_path: String,

    /// Where to save the final model weights
    #[arg(long = "model_fn", alias = "model-fn")]
    pub model_fn: String,

    #[arg(long = "pretrained_model_name", alias = "pretrained-model-name")]
    pub pretrained_model_name: String,

    /// Number of features processed together in one step
    #[arg(long = "batch_size_per_device", alias = "batch-size-per-device", default_value_t = 16)]
    pub batch_size_per_device: usize,

    /// Number of full passes through the training data
    #[arg(long = "n_epochs", alias = "n-epochs", default_value_t = 2)]
    pub n_epochs: usize,

    /// Fraction of all steps spent warming the learning rate up
    #[arg(long = "warmup_ratio", alias = "warmup-ratio", default_value_t = 0.1)]
    pub warmup_ratio: f64,

    /// Longest answer, in tokens, considered during evaluation
    #[arg(long = "max_answer_length", alias = "max-answer-length", default_value_t = 40)]
    pub max_answer_length: usize,

    /// Peak learning rate
    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    #[arg(long = "weight_decay", alias = "weight-decay", default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Directory for per-epoch checkpoints and metrics.csv
    #[arg(long = "checkpoint_dir", alias = "checkpoint-dir", default_value = ".checkpoints")]
    pub checkpoint_dir: String,

    /// Hidden dimension of the transformer
    #[arg(long = "d_model", alias = "d-model", default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long = "num_heads", alias = "num-heads", default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long = "num_layers", alias = "num-layers", default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long = "d_ff", alias = "d-ff", default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Seed for shuffling training batches
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            file_path:             a.file_path,
            model_fn:              a.model_fn,
            pretrained_model_name: a.pretrained_model_name,
            checkpoint_dir:        a.checkpoint_dir,
            batch_size:            a.batch_size_per_device,
            n_epochs:              a.n_epochs,
            warmup_ratio:          a.warmup_ratio,
            max_answer_length:     a.max_answer_length,
            lr:                    a.lr,
            weight_decay:          a.weight_decay,
            d_model:               a.d_model,
            num_heads:             a.num_heads,
            num_layers:            a.num_layers,
            d_ff:                  a.d_ff,
            dropout:               a.dropout,
            seed:                  a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct InferArgs {
    /// Trained model weights (config is read from beside it)
    #[arg(long = "model_fn", alias = "model-fn")]
    pub model_fn: String,

    #[arg(long = "pretrained_model_name", alias = "pretrained-model-name")]
    pub pretrained_model_name: String,

    /// Preprocessed test feature table
    #[arg(long = "test_file", alias = "test-file")]
    pub test_file: String,

    /// Test Examples JSON; defaults to test_examples.json beside test_file
    #[arg(long = "examples_file", alias = "examples-file")]
    pub examples_file: Option<String>,

    #[arg(long = "output_file", alias = "output-file", default_value = "predictions.json")]
    pub output_file: String,

    #[arg(long = "batch_size", alias = "batch-size", default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long = "max_answer_length", alias = "max-answer-length", default_value_t = 40)]
    pub max_answer_length: usize,
}

impl From<InferArgs> for InferConfig {
    fn from(a: InferArgs) -> Self {
        InferConfig {
            model_fn:              a.model_fn,
            pretrained_model_name: a.pretrained_model_name,
            test_file:             a.test_file,
            examples_file:         a.examples_file,
            output_file:           a.output_file,
            batch_size:            a.batch_size,
            max_answer_length:     a.max_answer_length,
        }
    }
}

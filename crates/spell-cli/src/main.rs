//! `spells` CLI — reconcile sick note episodes into spells from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Reconcile a cohort file (stdin → stdout)
//! spells reconcile < cohort.csv
//!
//! # File to file, carrying all input columns through
//! spells reconcile -i cohort.csv -o spells.csv --keep-columns
//!
//! # Sick note columns (sick_note_1_date, ...) with a 7-day window
//! spells --label sick_note --window 7 reconcile -i cohort.csv
//!
//! # Original cohort layout: output/cohorts/input_2020.csv → output/cohorts/input_2020_with_duration.csv
//! spells --label sick_note cohort _2020
//!
//! # Batch statistics
//! spells summary -i cohort.csv
//! ```

mod logging;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use spell_engine::table::{DEFAULT_ID_COLUMN, DEFAULT_LABEL, DEFAULT_OUTPUT_COLUMN};
use spell_engine::{
    read_table, reconcile_batch, write_json, write_table, BatchSummary, InputTable,
    OutputOptions, SpellConfig, TableLayout,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "spells",
    version,
    about = "Reconcile sick note episodes into merged spells"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    layout: LayoutArgs,
}

/// Run-start constants shared by every subcommand.
#[derive(Args)]
struct LayoutArgs {
    /// Grouping tolerance window in days
    #[arg(long, global = true, default_value_t = spell_engine::config::DEFAULT_TOLERANCE_WINDOW_DAYS)]
    window: u32,
    /// Number of episode slots per row
    #[arg(long, global = true, default_value_t = spell_engine::config::DEFAULT_MAX_EPISODES)]
    max_episodes: usize,
    /// Episode column label (columns are <label>_<i>_date, <label>_<i>_duration_days, ...)
    #[arg(long, global = true, default_value = DEFAULT_LABEL)]
    label: String,
    /// Entity identifier column
    #[arg(long, global = true, default_value = DEFAULT_ID_COLUMN)]
    id_column: String,
    /// Name of the derived first spell duration column
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_COLUMN)]
    output_column: String,
}

impl LayoutArgs {
    fn config(&self) -> Result<SpellConfig> {
        SpellConfig::new(self.window, self.max_episodes).context("Invalid spell configuration")
    }

    fn layout(&self) -> Result<TableLayout> {
        TableLayout::builder(self.label.as_str())
            .id_column(self.id_column.as_str())
            .output_column(self.output_column.as_str())
            .episodes(self.max_episodes)
            .build()
            .context("Invalid table layout")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a cohort CSV into one first spell duration per entity
    Reconcile {
        /// Input CSV file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Carry input columns through, replacing raw unit columns with canonical durations
        #[arg(long)]
        keep_columns: bool,
        /// Add the number of merged spells per entity
        #[arg(long)]
        all_spells: bool,
    },
    /// Reconcile <dir>/<prefix><name>.csv into <dir>/input<name>_with_duration.csv
    Cohort {
        /// Cohort name, e.g. "_2020"
        name: String,
        /// Input file name prefix
        #[arg(long, default_value = "input")]
        prefix: String,
        /// Directory holding cohort files
        #[arg(long, default_value = "output/cohorts")]
        dir: PathBuf,
    },
    /// Show batch statistics (computed, missing, flagged, mean duration)
    Summary {
        /// Input CSV file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let config = cli.layout.config()?;
    let layout = cli.layout.layout()?;

    match cli.command {
        Commands::Reconcile {
            input,
            output,
            format,
            keep_columns,
            all_spells,
        } => {
            let table = load(input.as_deref(), &layout)?;
            let results = reconcile_batch(&table.records, &config);
            let writer = open_output(output.as_deref())?;
            match format {
                Format::Csv => {
                    let options = OutputOptions {
                        keep_columns,
                        spell_count: all_spells,
                    };
                    write_table(writer, &layout, &table, &results, options)
                        .context("Failed to write output table")?;
                }
                Format::Json => {
                    write_json(writer, &results).context("Failed to write JSON output")?;
                }
            }
        }
        Commands::Cohort { name, prefix, dir } => {
            let (input, output) = cohort_paths(&dir, &prefix, &name);
            let table = load(Some(&input), &layout)?;
            let results = reconcile_batch(&table.records, &config);
            let options = OutputOptions {
                keep_columns: true,
                spell_count: false,
            };
            write_table(open_output(Some(&output))?, &layout, &table, &results, options)
                .context("Failed to write output table")?;
            info!(input = %input.display(), output = %output.display(), "cohort reconciled");
        }
        Commands::Summary { input } => {
            let table = load(input.as_deref(), &layout)?;
            let results = reconcile_batch(&table.records, &config);
            print_summary(&BatchSummary::from_results(&results));
        }
    }

    Ok(())
}

/// Input and output paths for a named cohort.
fn cohort_paths(dir: &Path, prefix: &str, name: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{}{}.csv", prefix, name)),
        dir.join(format!("input{}_with_duration.csv", name)),
    )
}

fn print_summary(summary: &BatchSummary) {
    println!("Entities:              {}", summary.entities);
    println!("Computed:              {}", summary.computed);
    println!("Missing primary:       {}", summary.missing_primary);
    println!("Negative spell:        {}", summary.negative_spell);
    println!("Boundary overflow:     {}", summary.boundary_overflow);
    println!("Inconsistent episodes: {}", summary.inconsistent_episodes);
    match summary.mean_first_spell_days {
        Some(mean) => println!("Mean first spell:      {:.1} days", mean),
        None => println!("Mean first spell:      n/a"),
    }
}

fn load(path: Option<&Path>, layout: &TableLayout) -> Result<InputTable> {
    let reader: Box<dyn Read> = match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to read file: {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdin".to_string());
    read_table(reader, layout).with_context(|| format!("Failed to parse cohort table from {}", source))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

//! mal2ms CLI: translate MonetDB MAL programs to MorphStore C++ programs.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mal2ms_analysis::AnalysisResult;
use mal2ms_core::config::{parse_bool, CandidateIntersect, Objective, Strategy, TranslatorConfig};
use mal2ms_core::style::{OperatorFamily, ProcessingStyle};
use mal2ms_emit::Renderer;
use mal2ms_exec::Pipeline;
use mal2ms_io::FROM_STDIN;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "mal2ms")]
#[command(about = "Translates MonetDB MAL plans to MorphStore C++ query programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a MAL program to a C++ program
    Translate {
        /// MAL file, or `-` for stdin
        #[arg(default_value = FROM_STDIN)]
        input: String,

        /// Write the C++ program here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// C++ template with placeholder lines (default: embedded template)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Measure the query and every operator with monitoring intervals
        #[arg(long)]
        monitoring: bool,

        /// Write the JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        cfg: ConfigArgs,
    },

    /// Print the inferred properties of every column
    Analyze {
        #[arg(default_value = FROM_STDIN)]
        input: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        cfg: ConfigArgs,
    },

    /// Show the translated program with the chosen formats (EXPLAIN)
    Explain {
        #[arg(default_value = FROM_STDIN)]
        input: String,

        #[command(flatten)]
        cfg: ConfigArgs,
    },

    /// Check that a MAL program can be parsed
    Validate {
        #[arg(default_value = FROM_STDIN)]
        input: String,

        #[command(flatten)]
        cfg: ConfigArgs,
    },
}

fn flag(s: &str) -> Result<bool, String> {
    parse_bool(s).map_err(|e| e.to_string())
}

/// Overrides of the translator config. Applied after the YAML file and the
/// `MAL2MS_*` environment variables.
#[derive(Args, Debug, Default, Clone)]
struct ConfigArgs {
    /// YAML file with translator settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Processing style: scalar, sse, avx2, avx512 or neon
    #[arg(long, short = 'p')]
    style: Option<ProcessingStyle>,

    /// Operator family: handcoded (1) or vector_lib (2)
    #[arg(long)]
    family: Option<OperatorFamily>,

    /// Translate range selections to the between operator
    #[arg(long, value_name = "BOOL", value_parser = flag)]
    use_between: Option<bool>,

    /// Intersection with candidate lists: merge or search
    #[arg(long)]
    candidate_intersect: Option<CandidateIntersect>,

    /// Use left-semi joins where the build side's positions are never read
    #[arg(long, value_name = "BOOL", value_parser = flag)]
    semi_join: Option<bool>,

    /// Translate `>` to equality like older translators
    #[arg(long, value_name = "BOOL", value_parser = flag)]
    greater_as_equal: Option<bool>,

    /// Echo every MAL assignment as a comment
    #[arg(long)]
    echo_mal: bool,

    /// Base column known to be unique, as table.column (repeatable)
    #[arg(long = "unique", value_name = "COLUMN")]
    unique_columns: Vec<String>,

    /// Infer cardinalities and bit widths from the base statistics
    #[arg(long)]
    cardinalities: bool,

    /// Directory with <table>.json statistics files
    #[arg(long)]
    stat_dir: Option<PathBuf>,

    /// Column infos (bit-width histograms) of a prior uncompressed run
    #[arg(long)]
    col_infos: Option<PathBuf>,

    /// Compression strategy: uncompr, rulebased, costbased, realbest, realworst or manual
    #[arg(long, short = 'c')]
    strategy: Option<Strategy>,

    /// Objective of the cost-based strategy: mem or perf
    #[arg(long)]
    objective: Option<Objective>,

    /// Rule-based format of randomly accessed columns
    #[arg(long)]
    rnd_format: Option<String>,

    /// Rule-based format of sequentially read, unsorted columns
    #[arg(long)]
    seq_unsorted_format: Option<String>,

    /// Rule-based format of sequentially read, sorted columns
    #[arg(long)]
    seq_sorted_format: Option<String>,

    /// Block size of cascaded formats
    #[arg(long)]
    casc_block_size: Option<u32>,

    /// Keep all base columns uncompressed
    #[arg(long)]
    uncompr_base: bool,

    /// Keep all intermediates uncompressed
    #[arg(long)]
    uncompr_interm: bool,

    /// Directory with calibration profiles (*.csv)
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Measured sizes of every column in every format
    #[arg(long)]
    sizes_file: Option<PathBuf>,

    /// Format per column for the manual strategy
    #[arg(long)]
    manual_file: Option<PathBuf>,
}

impl ConfigArgs {
    fn apply(&self, cfg: &mut TranslatorConfig) {
        if let Some(v) = self.style {
            cfg.style = v;
        }
        if let Some(v) = self.family {
            cfg.family = v;
        }
        if let Some(v) = self.use_between {
            cfg.use_between = v;
        }
        if let Some(v) = self.candidate_intersect {
            cfg.candidate_intersect = v;
        }
        if let Some(v) = self.semi_join {
            cfg.semi_join = v;
        }
        if let Some(v) = self.greater_as_equal {
            cfg.greater_as_equal = v;
        }
        cfg.echo_mal |= self.echo_mal;
        cfg.unique_columns.extend(self.unique_columns.iter().cloned());
        cfg.cardinality_analysis |= self.cardinalities;
        if let Some(p) = &self.stat_dir {
            cfg.stat_dir = Some(p.clone());
        }
        if let Some(p) = &self.col_infos {
            cfg.col_infos_file = Some(p.clone());
        }

        let compr = &mut cfg.compr;
        if let Some(v) = self.strategy {
            compr.strategy = v;
        }
        if let Some(v) = self.objective {
            compr.objective = v;
        }
        if let Some(v) = &self.rnd_format {
            compr.rnd_format = Some(v.clone());
        }
        if let Some(v) = &self.seq_unsorted_format {
            compr.seq_unsorted_format = Some(v.clone());
        }
        if let Some(v) = &self.seq_sorted_format {
            compr.seq_sorted_format = Some(v.clone());
        }
        if let Some(v) = self.casc_block_size {
            compr.casc_block_size = v;
        }
        compr.uncompr_base |= self.uncompr_base;
        compr.uncompr_interm |= self.uncompr_interm;
        if let Some(p) = &self.profile_dir {
            compr.profile_dir = Some(p.clone());
        }
        if let Some(p) = &self.sizes_file {
            compr.sizes_file = Some(p.clone());
        }
        if let Some(p) = &self.manual_file {
            compr.manual_file = Some(p.clone());
        }
    }

    /// Defaults, then the YAML file, then the environment, then these flags.
    fn load(&self) -> Result<TranslatorConfig, Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => TranslatorConfig::from_yaml_file(path)?,
            None => TranslatorConfig::default(),
        };
        cfg.apply_env();
        self.apply(&mut cfg);
        tracing::debug!(?cfg, "effective configuration");
        Ok(cfg)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let res = match cli.command {
        Commands::Translate {
            input,
            output,
            template,
            monitoring,
            report,
            cfg,
        } => translate(&input, output, template, monitoring, report, &cfg),
        Commands::Analyze { input, json, cfg } => analyze(&input, json, &cfg),
        Commands::Explain { input, cfg } => explain(&input, &cfg),
        Commands::Validate { input, cfg } => validate(&input, &cfg),
    };
    if let Err(e) = res {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn translate(
    input: &str,
    output: Option<PathBuf>,
    template: Option<PathBuf>,
    monitoring: bool,
    report: Option<PathBuf>,
    args: &ConfigArgs,
) -> CliResult {
    let mal = mal2ms_io::read_mal(input)?;
    let mut pipeline = Pipeline::new(args.load()?)?.monitoring(monitoring);
    if let Some(path) = template {
        pipeline = pipeline.template(fs::read_to_string(path)?);
    }
    let out = pipeline.run(&mal)?;

    match output {
        Some(path) => fs::write(path, &out.code)?,
        None => print!("{}", out.code),
    }
    if let Some(path) = report {
        fs::write(path, out.report.to_json()?)?;
    }
    Ok(())
}

fn analyze(input: &str, json: bool, args: &ConfigArgs) -> CliResult {
    let mal = mal2ms_io::read_mal(input)?;
    let (_, facts) = Pipeline::new(args.load()?)?.analyze(&mal)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&facts)?);
    } else {
        print_facts(&facts);
    }
    Ok(())
}

fn print_facts(facts: &AnalysisResult) {
    let width = facts.props.keys().map(String::len).max().unwrap_or(0).max(6);
    println!(
        "{:<width$}  unique  sorted  {:<15}  seq  {:>10}  bw  forced",
        "column", "access", "max card"
    );
    for (col, p) in &facts.props {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        println!(
            "{col:<width$}  {:<6}  {:<6}  {:<15}  {:>3}  {:>10}  {:>2}  {}",
            yes_no(p.is_unique),
            yes_no(p.is_sorted),
            format!("{:?}", p.access),
            p.seq_access_count,
            p.max_card.map_or_else(|| "?".to_string(), |c| c.to_string()),
            p.max_bw.map_or_else(|| "?".to_string(), |b| b.to_string()),
            yes_no(p.forced_uncompr),
        );
    }
    if !facts.never_used.is_empty() {
        println!();
        println!("Never used: {}", facts.never_used.join(", "));
    }
}

fn explain(input: &str, args: &ConfigArgs) -> CliResult {
    let mal = mal2ms_io::read_mal(input)?;
    let pipeline = Pipeline::new(args.load()?)?;
    let compiled = pipeline.compile(&mal)?;
    let cfg = pipeline.config();
    let renderer = Renderer::new(cfg.style, cfg.family);

    println!("Translated Program");
    println!("==================");
    println!();
    println!("Processing style: {}", cfg.style);
    println!("Strategy: {}", cfg.compr.strategy);
    println!();
    println!("Formats:");
    for (col, fmt) in compiled.assignment.iter() {
        println!("  {col}: {}", fmt.simple_name());
    }
    println!();
    println!(
        "Nodes ({} morphs inserted):",
        compiled.morphs_inserted
    );
    for (i, op) in compiled.tr.ops().enumerate() {
        let stmt = renderer.render(op, i)?;
        for (j, line) in stmt.lines().enumerate() {
            if j == 0 {
                println!("  {:>3}. {line}", i);
            } else {
                println!("       {line}");
            }
        }
    }
    println!();
    println!("Result columns: {}", compiled.tr.result_cols.join(", "));
    for lim in &compiled.tr.limitations {
        println!("Limitation: {lim}");
    }
    Ok(())
}

fn validate(input: &str, args: &ConfigArgs) -> CliResult {
    let mal = mal2ms_io::read_mal(input)?;
    let tr = mal2ms_translate::parse(&mal, &args.load()?)?;
    println!(
        "✓ MAL program is valid ({} nodes, {} result columns)",
        tr.op_count(),
        tr.result_cols.len()
    );
    Ok(())
}

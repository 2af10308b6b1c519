use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use killflow_analysis::{
    memory_operations, resolve_inst, resolve_loop, AliasOracle, AnalysisConfig,
    CallsiteDepthCombinator, ModRefResult, TemporalRelation,
};
use killflow_core::{InstId, Loop, Program, ProgramAnalyses};
use killflow_emit::{
    render, EmitterConfig, FlowEntry, FlowsReport, IrEmitter, OutputFormat, PairVerdict,
    QueryReport, StructureEmitter, VerbosityLevel,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "killflow")]
#[command(about = "Prove loop-carried memory flows between call sites impossible")]
#[command(version)]
#[command(author = "Gianluca Brigandi <gbrigand@gmail.com>")]
struct Cli {
    /// Debug logging and extra facts in text output. `RUST_LOG` takes precedence for logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file, or every `.kir` file below a directory.
    Validate { input: PathBuf },

    /// Print a program back with its dominators, post-dominators and loops.
    Dump {
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Ask the combinator about one pair of operations in a loop.
    Query {
        input: PathBuf,

        #[arg(long)]
        function: String,

        #[arg(long = "loop")]
        loop_header: String,

        #[arg(long)]
        src: String,

        #[arg(long)]
        dst: String,

        #[arg(long, value_enum, default_value = "before")]
        relation: Relation,

        #[command(flatten)]
        analysis: AnalysisArgs,

        #[arg(long)]
        json: bool,
    },

    /// Ask the combinator about every ordered pair of memory operations in a loop.
    Flows {
        input: PathBuf,

        #[arg(long)]
        function: String,

        #[arg(long = "loop")]
        loop_header: String,

        #[command(flatten)]
        analysis: AnalysisArgs,

        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct AnalysisArgs {
    /// Seconds per query; 0 disables the limit. Overrides the configuration file.
    #[arg(long)]
    timeout: Option<u64>,

    /// JSON analysis configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Relation {
    Before,
    Same,
    After,
}

impl From<Relation> for TemporalRelation {
    fn from(relation: Relation) -> Self {
        match relation {
            Relation::Before => TemporalRelation::Before,
            Relation::Same => TemporalRelation::Same,
            Relation::After => TemporalRelation::After,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let emit_config = emitter_config(cli.verbose);

    match cli.command {
        Commands::Validate { input } => cmd_validate(&input, cli.verbose),
        Commands::Dump { input, json } => cmd_dump(&input, json, &emit_config),
        Commands::Query {
            input,
            function,
            loop_header,
            src,
            dst,
            relation,
            analysis,
            json,
        } => {
            let request = QueryRequest {
                function,
                loop_header,
                src,
                dst,
                relation: relation.into(),
            };
            cmd_query(&input, &request, &analysis, format(json), &emit_config)
        }
        Commands::Flows {
            input,
            function,
            loop_header,
            analysis,
            json,
        } => cmd_flows(
            &input,
            &function,
            &loop_header,
            &analysis,
            format(json),
            &emit_config,
        ),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn emitter_config(verbose: bool) -> EmitterConfig {
    let config = if std::io::stdout().is_terminal() {
        EmitterConfig::for_terminal()
    } else {
        EmitterConfig::default()
    };
    if verbose {
        config.with_verbosity(VerbosityLevel::Verbose)
    } else {
        config
    }
}

fn format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    }
}

fn load_program(input: &Path) -> Result<Program> {
    let program = killflow_parser::parse_program_file(input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    debug!(
        functions = program.functions.len(),
        insts = program.insts.len(),
        "loaded {}",
        input.display()
    );
    Ok(program)
}

fn load_config(args: &AnalysisArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(secs) = args.timeout {
        config = config.with_timeout_secs(secs);
    }
    Ok(config)
}

fn cmd_validate(input: &Path, verbose: bool) -> Result<()> {
    let results = if input.is_dir() {
        killflow_parser::parse_directory(input)
    } else {
        vec![(input.to_path_buf(), killflow_parser::parse_program_file(input))]
    };
    if results.is_empty() {
        anyhow::bail!("no .kir files below {}", input.display());
    }

    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(program) => {
                println!("{} {}", "VALID".bright_green().bold(), path.display());
                if verbose {
                    println!(
                        "   {} functions, {} blocks, {} instructions",
                        program.functions.len(),
                        program.blocks.len(),
                        program.insts.len()
                    );
                }
            }
            Err(e) => {
                failures += 1;
                println!("{} {}", "INVALID".bright_red().bold(), path.display());
                println!("{}", e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("validation failed for {} file(s)", failures);
    }
    Ok(())
}

fn cmd_dump(input: &Path, json: bool, config: &EmitterConfig) -> Result<()> {
    let program = load_program(input)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let emitter = IrEmitter::new(config.clone());
    print!("{}", emitter.program_to_string(&program)?);

    let analyses = ProgramAnalyses::build(&program);
    let structure = StructureEmitter::new(&program, &analyses, config.clone());
    print!("{}", structure.emit_to_string()?);
    Ok(())
}

struct QueryRequest {
    function: String,
    loop_header: String,
    src: String,
    dst: String,
    relation: TemporalRelation,
}

fn cmd_query(
    input: &Path,
    request: &QueryRequest,
    args: &AnalysisArgs,
    format: OutputFormat,
    config: &EmitterConfig,
) -> Result<()> {
    let program = load_program(input)?;
    let analyses = ProgramAnalyses::build(&program);
    let analysis_config = load_config(args)?;

    let lp = resolve_loop(&program, &analyses, &request.function, &request.loop_header)?;
    let src = resolve_inst(&program, &request.function, &request.src)?;
    let dst = resolve_inst(&program, &request.function, &request.dst)?;

    let mut combinator =
        CallsiteDepthCombinator::with_basic_oracle(&program, &analyses, analysis_config);
    let lower = combinator
        .kill_flow_mut()
        .modref(src, request.relation, dst, Some(lp));
    let result = combinator.modref(src, request.relation, dst, Some(lp));
    info!(%lower, %result, "answered {} {} {}", request.src, request.relation, request.dst);

    let flows = surviving_flows(&mut combinator, src, request.relation, dst, lp, result)
        .iter()
        .map(|flow| FlowEntry::from_flow(&program, flow))
        .collect();

    let report = QueryReport {
        function: request.function.clone(),
        loop_header: program.block(lp.header).name.clone(),
        src: program.inst_label(src),
        dst: program.inst_label(dst),
        relation: request.relation,
        lower,
        result,
        flows,
        kill_flow: combinator.kill_flow().stats().clone(),
        combinator: combinator.stats().clone(),
    };
    print!("{}", render(&report, format, config)?);
    Ok(())
}

/// The flows that kept a verdict from being refined. Only call sites can have them, and only
/// across iterations.
fn surviving_flows(
    combinator: &mut CallsiteDepthCombinator<'_>,
    src: InstId,
    relation: TemporalRelation,
    dst: InstId,
    lp: &Loop,
    result: ModRefResult,
) -> Vec<killflow_analysis::Flow> {
    if result == ModRefResult::NoModRef
        || !(combinator.is_eligible(src) || combinator.is_eligible(dst))
    {
        return Vec::new();
    }
    match relation {
        TemporalRelation::Before => combinator.all_flows_cross_iter(src, dst, lp),
        TemporalRelation::After => combinator.all_flows_cross_iter(dst, src, lp),
        TemporalRelation::Same => Vec::new(),
    }
}

fn cmd_flows(
    input: &Path,
    function: &str,
    loop_header: &str,
    args: &AnalysisArgs,
    format: OutputFormat,
    config: &EmitterConfig,
) -> Result<()> {
    let program = load_program(input)?;
    let analyses = ProgramAnalyses::build(&program);
    let analysis_config = load_config(args)?;

    let lp = resolve_loop(&program, &analyses, function, loop_header)?;
    let operations = memory_operations(&program, lp);
    debug!(count = operations.len(), "memory operations in loop");

    let mut combinator =
        CallsiteDepthCombinator::with_basic_oracle(&program, &analyses, analysis_config);
    let mut verdicts = Vec::new();
    for &src in &operations {
        for &dst in &operations {
            let relation = TemporalRelation::Before;
            let lower = combinator
                .kill_flow_mut()
                .modref(src, relation, dst, Some(lp));
            let result = combinator.modref(src, relation, dst, Some(lp));
            verdicts.push(PairVerdict {
                src: program.inst_label(src),
                dst: program.inst_label(dst),
                relation,
                lower,
                result,
            });
        }
    }

    let report = FlowsReport {
        function: function.to_string(),
        loop_header: program.block(lp.header).name.clone(),
        operations: operations
            .iter()
            .map(|&inst| program.inst_label(inst))
            .collect(),
        verdicts,
        kill_flow: combinator.kill_flow().stats().clone(),
        combinator: combinator.stats().clone(),
    };
    print!("{}", render(&report, format, config)?);
    Ok(())
}

//! # Command Line Interface for the Solver Binary

use std::io::Error as IOError;
use std::path::PathBuf;
use std::time::Duration;
use std::{
    fmt::{self},
    io::Write,
};

use btsp_core::{
    fio::FileFormat, graph::Weight, BottleneckResult, Limits, Options, SearchStrategy, Stats,
    Termination, Tour, WriteSolverLog,
};
use clap::{crate_name, crate_version, Args, Parser, ValueEnum};
use cpu_time::ProcessTime;
use rustsat::solvers::SolverResult;
use termcolor::{Buffer, BufferWriter, Color, ColorSpec, WriteColor};

macro_rules! none_if_zero {
    ($val:expr) => {
        if $val == 0 {
            None
        } else {
            Some($val)
        }
    };
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// The strategy for searching the optimal threshold
    #[arg(long, value_enum, default_value_t = Options::default().strategy)]
    strategy: SearchStrategy,
    /// Start the search at the lower bound derived from the incident edge weights
    #[arg(long, default_value_t = Bool::from(Options::default().seed_lower_bound))]
    seed_lower_bound: Bool,
    /// Accept graphs that are not complete
    #[arg(long)]
    allow_incomplete: bool,
    /// The CaDiCaL profile to use
    #[arg(long, default_value_t = CadicalConfig::Default)]
    cadical_config: CadicalConfig,
    #[command(flatten)]
    limits: LimitArgs,
    #[command(flatten)]
    file: FileArgs,
    #[command(flatten)]
    log: LogArgs,
}

#[derive(Args)]
struct LimitArgs {
    /// Limit the solving time in seconds, checked before every threshold (0 is no limit)
    #[arg(long, default_value_t = 0.)]
    time_limit: f64,
    /// Limit the number of SAT oracle calls (0 is no limit)
    #[arg(long, default_value_t = 0)]
    oracle_call_limit: usize,
}

impl From<&LimitArgs> for Limits {
    fn from(args: &LimitArgs) -> Self {
        Limits {
            time: if args.time_limit > 0. {
                Duration::try_from_secs_f64(args.time_limit).ok()
            } else {
                None
            },
            oracle_calls: none_if_zero!(args.oracle_call_limit),
        }
    }
}

#[derive(Args)]
struct FileArgs {
    /// The file format of the input file. With infer, the file format is
    /// inferred from the file extension.
    #[arg(long, value_enum, default_value_t = FileFormat::Infer)]
    file_format: FileFormat,
    /// The path to the instance file to load
    inst_path: PathBuf,
}

#[derive(Args)]
struct LogArgs {
    #[command(flatten)]
    color: concolor_clap::Color,
    /// Print the solver configuration
    #[arg(long)]
    print_solver_config: bool,
    /// Don't print the vertex sequence of the tour
    #[arg(long)]
    no_print_tour: bool,
    /// Don't print statistics
    #[arg(long)]
    no_print_stats: bool,
    /// Verbosity of the solver output
    #[arg(short, long, default_value_t = 0)]
    verbosity: u8,
    /// Log tested thresholds
    #[arg(long)]
    log_thresholds: bool,
    /// Log tours as they are discovered
    #[arg(long)]
    log_tours: bool,
    /// Log SAT oracle calls
    #[arg(long)]
    log_oracle_calls: bool,
    /// Log connectivity cuts
    #[arg(long)]
    log_cuts: bool,
    /// Log routine starts and ends till a given depth
    #[arg(long, default_value_t = 0)]
    log_routines: usize,
}

impl From<&LogArgs> for LoggerConfig {
    fn from(args: &LogArgs) -> Self {
        LoggerConfig {
            log_thresholds: args.log_thresholds || args.verbosity >= 1,
            log_tours: args.log_tours || args.verbosity >= 1,
            log_messages: args.verbosity >= 1,
            log_cuts: args.log_cuts || args.verbosity >= 2,
            log_oracle_calls: args.log_oracle_calls || args.verbosity >= 3,
            log_routines: std::cmp::max(args.log_routines, args.verbosity as usize),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Bool {
    /// Turn on feature
    True,
    /// Turn off feature
    False,
}

impl From<Bool> for bool {
    fn from(val: Bool) -> Self {
        val == Bool::True
    }
}

impl fmt::Display for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bool::True => write!(f, "true"),
            Bool::False => write!(f, "false"),
        }
    }
}

impl From<bool> for Bool {
    fn from(val: bool) -> Self {
        if val {
            Bool::True
        } else {
            Bool::False
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CadicalConfig {
    /// Set default advanced internal options
    Default,
    /// Disable all internal preprocessing options
    Plain,
    /// Set internal options to target satisfiable instances
    Sat,
    /// Set internal options to target unsatisfiable instances
    Unsat,
}

impl fmt::Display for CadicalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CadicalConfig::Default => write!(f, "default"),
            CadicalConfig::Plain => write!(f, "plain"),
            CadicalConfig::Sat => write!(f, "sat"),
            CadicalConfig::Unsat => write!(f, "unsat"),
        }
    }
}

pub struct Cli {
    pub limits: Limits,
    pub options: Options,
    pub allow_incomplete: bool,
    pub file_format: FileFormat,
    pub inst_path: PathBuf,
    pub cadical_config: CadicalConfig,
    stdout: BufferWriter,
    stderr: BufferWriter,
    print_solver_config: bool,
    print_tour: bool,
    print_stats: bool,
    color: concolor_clap::Color,
    logger_config: LoggerConfig,
}

fn color_choice(color: concolor_clap::Color, stream: atty::Stream) -> termcolor::ColorChoice {
    match color.color {
        concolor_clap::ColorChoice::Always => termcolor::ColorChoice::Always,
        concolor_clap::ColorChoice::Never => termcolor::ColorChoice::Never,
        concolor_clap::ColorChoice::Auto => {
            if atty::is(stream) {
                termcolor::ColorChoice::Auto
            } else {
                termcolor::ColorChoice::Never
            }
        }
    }
}

impl Cli {
    pub fn init() -> Self {
        let args = CliArgs::parse();
        Cli {
            limits: (&args.limits).into(),
            options: Options {
                strategy: args.strategy,
                seed_lower_bound: args.seed_lower_bound.into(),
            },
            allow_incomplete: args.allow_incomplete,
            file_format: args.file.file_format,
            inst_path: args.file.inst_path.clone(),
            cadical_config: args.cadical_config,
            stdout: BufferWriter::stdout(color_choice(args.log.color, atty::Stream::Stdout)),
            stderr: BufferWriter::stderr(color_choice(args.log.color, atty::Stream::Stderr)),
            print_solver_config: args.log.print_solver_config,
            print_tour: !args.log.no_print_tour,
            print_stats: !args.log.no_print_stats,
            color: args.log.color,
            logger_config: (&args.log).into(),
        }
    }

    pub fn new_cli_logger(&self) -> CliLogger {
        CliLogger {
            stdout: BufferWriter::stdout(color_choice(self.color, atty::Stream::Stdout)),
            config: self.logger_config.clone(),
            routine_stack: vec![],
        }
    }

    pub fn warning(&self, msg: &str) -> Result<(), IOError> {
        let mut buffer = self.stderr.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Yellow)))?;
        write!(buffer, "warning")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, ": ")?;
        buffer.reset()?;
        writeln!(buffer, "{}", msg)?;
        self.stderr.print(&buffer)?;
        Ok(())
    }

    pub fn error(&self, msg: &str) -> Result<(), IOError> {
        let mut buffer = self.stderr.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Red)))?;
        write!(buffer, "error")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, ": ")?;
        buffer.reset()?;
        writeln!(buffer, "{}", msg)?;
        self.stderr.print(&buffer)?;
        Ok(())
    }

    pub fn info(&self, msg: &str) -> Result<(), IOError> {
        let mut buffer = self.stdout.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
        write!(buffer, "info")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, ": ")?;
        buffer.reset()?;
        writeln!(buffer, "{}", msg)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn log_termination(&self, term: &Termination) -> Result<(), IOError> {
        self.warning(&format!("{}", term))
    }

    pub fn print_header(&self) -> Result<(), IOError> {
        let mut buffer = self.stdout.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Green)))?;
        write!(buffer, "{}", crate_name!())?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(buffer, " ({})", crate_version!())?;
        buffer.reset()?;
        write!(buffer, "strategy: ")?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(buffer, "{}", self.options.strategy)?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, "==============================")?;
        buffer.reset()?;
        writeln!(buffer)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn print_solver_config(&self) -> Result<(), IOError> {
        if self.print_solver_config {
            let mut buffer = self.stdout.buffer();
            Self::start_block(&mut buffer)?;
            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
            write!(buffer, "Solver Config")?;
            buffer.reset()?;
            buffer.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(buffer, ": ")?;
            buffer.reset()?;
            Self::print_parameter(&mut buffer, "strategy", self.options.strategy)?;
            Self::print_parameter(
                &mut buffer,
                "seed-lower-bound",
                self.options.seed_lower_bound,
            )?;
            Self::print_parameter(&mut buffer, "allow-incomplete", self.allow_incomplete)?;
            Self::print_parameter(&mut buffer, "cadical-config", self.cadical_config)?;
            Self::print_parameter(
                &mut buffer,
                "time-limit",
                OptVal::new(self.limits.time.map(DurPrinter::new)),
            )?;
            Self::print_parameter(
                &mut buffer,
                "oracle-call-limit",
                OptVal::new(self.limits.oracle_calls),
            )?;
            Self::end_block(&mut buffer)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    pub fn print_result(&self, result: &BottleneckResult) -> Result<(), IOError> {
        let mut buffer = self.stdout.buffer();
        Self::start_block(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
        write!(buffer, "Bottleneck Tour")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(buffer, ": ")?;
        buffer.reset()?;
        let status = match result {
            BottleneckResult::Optimal(_) => "optimal",
            BottleneckResult::Infeasible => "infeasible",
            BottleneckResult::Partial { best: Some(_), .. } => "feasible",
            BottleneckResult::Partial { best: None, .. } => "unknown",
        };
        Self::print_parameter(&mut buffer, "status", status)?;
        if let Some(tour) = result.tour() {
            self.print_tour(&mut buffer, tour)?;
        }
        Self::end_block(&mut buffer)?;
        self.stdout.print(&buffer)?;
        Ok(())
    }

    pub fn print_stats(&self, stats: Stats) -> Result<(), IOError> {
        if self.print_stats {
            let mut buffer = self.stdout.buffer();
            Self::start_block(&mut buffer)?;
            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Blue)))?;
            write!(buffer, "Solver Stats")?;
            buffer.reset()?;
            buffer.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(buffer, ": ")?;
            buffer.reset()?;
            Self::print_parameter(&mut buffer, "n-solve-calls", stats.n_solve_calls)?;
            Self::print_parameter(&mut buffer, "n-thresholds", stats.n_thresholds)?;
            Self::print_parameter(&mut buffer, "n-oracle-calls", stats.n_oracle_calls)?;
            Self::print_parameter(&mut buffer, "n-refinements", stats.n_refinements)?;
            Self::print_parameter(&mut buffer, "n-cuts", stats.n_cuts)?;
            Self::print_parameter(&mut buffer, "n-tours", stats.n_tours)?;
            Self::print_parameter(&mut buffer, "n-clauses", stats.n_clauses)?;
            Self::print_parameter(&mut buffer, "n-card-constraints", stats.n_card_constraints)?;
            Self::end_block(&mut buffer)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn print_tour(&self, buffer: &mut Buffer, tour: &Tour) -> Result<(), IOError> {
        Self::print_parameter(buffer, "bottleneck", tour.bottleneck())?;
        Self::print_parameter(buffer, "total-weight", tour.total_weight())?;
        Self::print_parameter(buffer, "n-vertices", tour.len())?;
        if self.print_tour {
            Self::print_parameter(buffer, "tour", tour)?;
        }
        Ok(())
    }

    fn print_parameter<V: fmt::Display>(
        buffer: &mut Buffer,
        name: &str,
        val: V,
    ) -> Result<(), IOError> {
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(buffer, "{}", name)?;
        buffer.reset()?;
        writeln!(buffer, ": {}", val)?;
        Ok(())
    }

    fn start_block(buffer: &mut Buffer) -> Result<(), IOError> {
        buffer.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(buffer, ">>>>>")?;
        buffer.reset()?;
        writeln!(buffer)?;
        Ok(())
    }

    fn end_block(buffer: &mut Buffer) -> Result<(), IOError> {
        buffer.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(buffer, "<<<<<")?;
        buffer.reset()?;
        writeln!(buffer)?;
        Ok(())
    }
}

#[derive(Clone)]
struct LoggerConfig {
    log_thresholds: bool,
    log_tours: bool,
    log_messages: bool,
    log_cuts: bool,
    log_oracle_calls: bool,
    log_routines: usize,
}

pub struct CliLogger {
    stdout: BufferWriter,
    config: LoggerConfig,
    routine_stack: Vec<(&'static str, ProcessTime)>,
}

impl WriteSolverLog for CliLogger {
    fn log_threshold(&mut self, idx: usize, weight: Weight, feasible: bool) -> anyhow::Result<()> {
        if self.config.log_thresholds {
            let mut buffer = self.stdout.buffer();
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(buffer, "threshold")?;
            buffer.reset()?;
            writeln!(
                buffer,
                ": index: {}; weight: {}; feasible: {}; cpu-time: {}",
                idx,
                weight,
                feasible,
                DurPrinter::new(ProcessTime::now().as_duration()),
            )?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn log_oracle_call(&mut self, result: SolverResult) -> anyhow::Result<()> {
        if self.config.log_oracle_calls {
            let mut buffer = self.stdout.buffer();
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(buffer, "oracle call")?;
            buffer.reset()?;
            writeln!(
                buffer,
                ": result: {}; cpu-time: {}",
                result,
                DurPrinter::new(ProcessTime::now().as_duration()),
            )?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn log_cuts(&mut self, n_cuts: usize) -> anyhow::Result<()> {
        if self.config.log_cuts {
            let mut buffer = self.stdout.buffer();
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(buffer, "connectivity cuts")?;
            buffer.reset()?;
            writeln!(buffer, ": n-components: {}", n_cuts)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn log_tour(&mut self, tour: &Tour) -> anyhow::Result<()> {
        if self.config.log_tours {
            let mut buffer = self.stdout.buffer();
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(buffer, "tour")?;
            buffer.reset()?;
            writeln!(
                buffer,
                ": bottleneck: {}; total-weight: {}; cpu-time: {}",
                tour.bottleneck(),
                tour.total_weight(),
                DurPrinter::new(ProcessTime::now().as_duration()),
            )?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn log_routine_start(&mut self, desc: &'static str) -> anyhow::Result<()> {
        self.routine_stack.push((desc, ProcessTime::now()));

        if self.config.log_routines >= self.routine_stack.len() {
            let mut buffer = self.stdout.buffer();
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(buffer, ">>> routine start")?;
            buffer.reset()?;
            writeln!(buffer, ": {}", desc)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn log_routine_end(&mut self) -> anyhow::Result<()> {
        let Some((desc, start)) = self.routine_stack.pop() else {
            anyhow::bail!("routine stack out of sync");
        };

        if self.config.log_routines > self.routine_stack.len() {
            let duration = ProcessTime::now().duration_since(start);

            let mut buffer = self.stdout.buffer();
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            write!(buffer, "<<< routine end")?;
            buffer.reset()?;
            writeln!(
                buffer,
                ": {}; duration: {}",
                desc,
                DurPrinter::new(duration)
            )?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }

    fn log_end_solve(&mut self) -> anyhow::Result<()> {
        while !self.routine_stack.is_empty() {
            self.log_routine_end()?;
        }
        Ok(())
    }

    fn log_message(&mut self, msg: &str) -> anyhow::Result<()> {
        if self.config.log_messages {
            let mut buffer = self.stdout.buffer();
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(buffer, "message")?;
            buffer.reset()?;
            writeln!(buffer, ": {}", msg)?;
            self.stdout.print(&buffer)?;
        }
        Ok(())
    }
}

struct OptVal<T> {
    val: Option<T>,
}

impl<T> OptVal<T> {
    fn new(val: Option<T>) -> Self {
        OptVal { val }
    }
}

impl<T: fmt::Display> fmt::Display for OptVal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.val {
            Some(t) => fmt::Display::fmt(&t, f),
            None => write!(f, "none"),
        }
    }
}

struct DurPrinter {
    dur: Duration,
}

impl DurPrinter {
    fn new(dur: Duration) -> Self {
        Self { dur }
    }
}

impl fmt::Display for DurPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dur)
    }
}

#[test]
fn verify_cli_args() {
    use clap::CommandFactory;
    CliArgs::command().debug_assert()
}

use std::thread;

use btsp_core::{
    fio, BottleneckResult, BottleneckSolver, MaybeTerminatedError, RustSatOracle,
};
use rustsat::solvers::{DefaultInitializer, Initialize};
use rustsat_cadical::CaDiCaL;

mod cli;
use cli::{CadicalConfig, Cli};

/// The SAT oracle used
type Oracle = RustSatOracle<CaDiCaL<'static, 'static>>;

fn main() {
    let cli = Cli::init();

    if let Err(err) = sub_main(&cli) {
        // nothing left to report to if stderr is gone
        let _ = cli.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn sub_main(cli: &Cli) -> anyhow::Result<()> {
    cli.print_header()?;
    cli.print_solver_config()?;

    cli.info(&format!("solving instance {:?}", cli.inst_path))?;

    let graph = fio::parse(&cli.inst_path, cli.file_format)?;
    if cli.allow_incomplete {
        graph.validate()?;
    } else {
        graph.validate_complete()?;
    }
    cli.info(&format!(
        "graph with {} vertices and {} edges",
        graph.n_vertices(),
        graph.n_edges()
    ))?;

    match cli.cadical_config {
        CadicalConfig::Default => run::<DefaultInitializer>(cli, graph),
        CadicalConfig::Plain => run::<CaDiCaLPlainInit>(cli, graph),
        CadicalConfig::Sat => run::<CaDiCaLSatInit>(cli, graph),
        CadicalConfig::Unsat => run::<CaDiCaLUnsatInit>(cli, graph),
    }
}

fn run<OInit>(cli: &Cli, graph: btsp_core::Graph) -> anyhow::Result<()>
where
    OInit: Initialize<Oracle>,
{
    let mut solver = BottleneckSolver::<Oracle, OInit>::new(graph, cli.options)?;

    // === Set up CLI interaction ===
    // Set up signal handling
    let mut interrupter = solver.interrupter();
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGXCPU,
        signal_hook::consts::SIGABRT,
    ])?;
    // Thread for catching incoming signals
    thread::spawn(move || {
        for _ in signals.forever() {
            interrupter.interrupt();
        }
    });

    solver.attach_logger(cli.new_cli_logger());

    match solver.lower_bound() {
        Some(bound) => cli.info(&format!("bottleneck lower bound: {bound}"))?,
        None => cli.warning("some vertex has fewer than two incident edges")?,
    }

    let ret = solver.solve(cli.limits);
    if let MaybeTerminatedError::Terminated(term) = &ret {
        cli.log_termination(term)?;
    }
    let result = BottleneckResult::from_solve(ret, solver.take_best_tour())?;

    cli.print_result(&result)?;
    cli.print_stats(solver.stats())?;

    Ok(())
}

struct CaDiCaLPlainInit;

impl Initialize<Oracle> for CaDiCaLPlainInit {
    fn init() -> Oracle {
        let mut slv = CaDiCaL::default();
        slv.set_configuration(rustsat_cadical::Config::Plain)
            .expect("failed to set cadical config");
        RustSatOracle::new(slv)
    }
}

struct CaDiCaLSatInit;

impl Initialize<Oracle> for CaDiCaLSatInit {
    fn init() -> Oracle {
        let mut slv = CaDiCaL::default();
        slv.set_configuration(rustsat_cadical::Config::Sat)
            .expect("failed to set cadical config");
        RustSatOracle::new(slv)
    }
}

struct CaDiCaLUnsatInit;

impl Initialize<Oracle> for CaDiCaLUnsatInit {
    fn init() -> Oracle {
        let mut slv = CaDiCaL::default();
        slv.set_configuration(rustsat_cadical::Config::Unsat)
            .expect("failed to set cadical config");
        RustSatOracle::new(slv)
    }
}

//! # Bottleneck TSP Solver
//!
//! Finds a Hamiltonian cycle minimizing the maximum edge weight. Edges are
//! sorted by weight and the prefix of the first `i + 1` edges is the threshold
//! subgraph of index `i`. Feasibility of threshold subgraphs is monotone in
//! `i`, the solver searches for the smallest feasible index with one of the
//! [`SearchStrategy`] variants, deciding each threshold subgraph with a fresh
//! [`HamiltonianOracle`].

use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use rustsat::{
    solvers::{DefaultInitializer, Initialize},
    types::RsHashMap,
};

use crate::{
    done,
    graph::{Edge, Graph, Vertex, Weight},
    hamiltonian::{Decision, HamiltonianOracle},
    oracle::{RustSatOracle, SatOracle},
    options::{Limits, Options, SearchStrategy},
    termination::ensure,
    MaybeTerminated, MaybeTerminatedError, Stats, Termination, Tour, WriteSolverLog,
};

/// Result of [`solve_bottleneck_tsp`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BottleneckResult {
    /// The tour has the minimum bottleneck weight
    Optimal(Tour),
    /// The graph has no Hamiltonian cycle
    Infeasible,
    /// The search stopped early, the tour is the best one found so far
    Partial {
        best: Option<Tour>,
        reason: Termination,
    },
}

impl BottleneckResult {
    /// Classifies the return value of [`BottleneckSolver::solve`] together with
    /// the best tour the solver found
    pub fn from_solve(ret: MaybeTerminatedError, best: Option<Tour>) -> anyhow::Result<Self> {
        match ret {
            MaybeTerminatedError::Done(()) => Ok(match best {
                Some(tour) => BottleneckResult::Optimal(tour),
                None => BottleneckResult::Infeasible,
            }),
            MaybeTerminatedError::Terminated(reason) => {
                Ok(BottleneckResult::Partial { best, reason })
            }
            MaybeTerminatedError::Error(err) => Err(err),
        }
    }

    /// The tour contained in the result, if any
    pub fn tour(&self) -> Option<&Tour> {
        match self {
            BottleneckResult::Optimal(tour) => Some(tour),
            BottleneckResult::Infeasible => None,
            BottleneckResult::Partial { best, .. } => best.as_ref(),
        }
    }
}

/// Interrupts a running [`BottleneckSolver`] from another thread
pub struct Interrupter {
    /// Termination flag of the solver
    term_flag: Arc<AtomicBool>,
}

impl Interrupter {
    /// Interrupts the solver asynchronously. The solver stops before testing
    /// the next threshold.
    pub fn interrupt(&mut self) {
        self.term_flag.store(true, Ordering::Relaxed);
    }
}

/// The bottleneck threshold search
///
/// # Generics
///
/// - `O`: the SAT oracle
/// - `OInit`: the oracle initializer
pub struct BottleneckSolver<O = RustSatOracle, OInit = DefaultInitializer> {
    /// The input graph
    graph: Graph,
    /// The edges sorted by weight, ties broken by endpoints
    sorted: Vec<Edge>,
    /// Position of every edge in `sorted`
    ranks: RsHashMap<(Vertex, Vertex), usize>,
    /// Configuration options
    opts: Options,
    /// Running statistics
    stats: Stats,
    /// Limits for the current solving run
    lims: Limits,
    /// The point in time when the time limit is reached
    deadline: Option<Instant>,
    /// The best tour found so far
    best: Option<Tour>,
    /// Logger to log with
    logger: Option<Box<dyn WriteSolverLog>>,
    /// Termination flag
    term_flag: Arc<AtomicBool>,
    /// Phantom marker for oracle factory
    _factory: PhantomData<(O, OInit)>,
}

impl<O, OInit> BottleneckSolver<O, OInit>
where
    O: SatOracle,
    OInit: Initialize<O>,
{
    /// Initializes the solver for a graph. Graphs that are not complete are
    /// accepted and may turn out to be infeasible.
    pub fn new(graph: Graph, opts: Options) -> anyhow::Result<Self> {
        graph.validate()?;
        let mut sorted = graph.edges().to_vec();
        sorted.sort_unstable_by_key(|e| (e.weight, e.u, e.v));
        let ranks = sorted
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.key(), idx))
            .collect();
        Ok(BottleneckSolver {
            graph,
            sorted,
            ranks,
            opts,
            stats: Stats::default(),
            lims: Limits::none(),
            deadline: None,
            best: None,
            logger: None,
            term_flag: Arc::new(AtomicBool::new(false)),
            _factory: PhantomData,
        })
    }

    /// Searches for the optimal threshold. Returns [`MaybeTerminatedError::Done`]
    /// once the search is complete, in which case [`Self::best_tour`] is
    /// optimal or the graph has no Hamiltonian cycle if there is no tour.
    pub fn solve(&mut self, limits: Limits) -> MaybeTerminatedError {
        self.stats.n_solve_calls += 1;
        self.lims = limits;
        // budgets beyond what `Instant` can represent never run out
        self.deadline = limits
            .time
            .and_then(|budget| Instant::now().checked_add(budget));
        let strategy = self.opts.strategy;
        done!(self.log_routine_start(match strategy {
            SearchStrategy::SequentialUp => "sequential-up",
            SearchStrategy::SequentialDown => "sequential-down",
            SearchStrategy::BinarySearch => "binary-search",
        }));
        let res = match strategy {
            SearchStrategy::SequentialUp => self.sequential_up(),
            SearchStrategy::SequentialDown => self.sequential_down(),
            SearchStrategy::BinarySearch => self.binary_search(),
        };
        done!(res);
        done!(self.log_routine_end());
        if let Some(logger) = &mut self.logger {
            done!(logger.log_end_solve().context("logger failed"));
        }
        MaybeTerminatedError::Done(())
    }

    /// The best tour found so far
    pub fn best_tour(&self) -> Option<&Tour> {
        self.best.as_ref()
    }

    /// Takes the best tour out of the solver
    pub fn take_best_tour(&mut self) -> Option<Tour> {
        self.best.take()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The edges in the order thresholds are built from
    pub fn sorted_edges(&self) -> &[Edge] {
        &self.sorted
    }

    /// A lower bound on the bottleneck weight of any tour: every vertex needs
    /// two tour edges, so the bottleneck is at least the second-smallest
    /// incident weight of every vertex. Returns `None` if some vertex has
    /// fewer than two incident edges, in which case there is no tour.
    pub fn lower_bound(&self) -> Option<Weight> {
        let mut bound = 0;
        for v in self.graph.vertices() {
            let mut weights: Vec<Weight> = self.graph.incident(v).map(|(_, e)| e.weight).collect();
            if weights.len() < 2 {
                return None;
            }
            weights.select_nth_unstable(1);
            bound = std::cmp::max(bound, weights[1]);
        }
        Some(bound)
    }

    /// The smallest threshold index whose bottleneck weight reaches
    /// [`Self::lower_bound`]
    pub fn lower_bound_index(&self) -> Option<usize> {
        let bound = self.lower_bound()?;
        Some(self.sorted.partition_point(|e| e.weight < bound))
    }

    /// Decides whether the threshold subgraph of index `idx` has a
    /// Hamiltonian cycle. Does not count against limits and does not update
    /// the best tour.
    pub fn decide_threshold(&mut self, idx: usize) -> anyhow::Result<Decision> {
        anyhow::ensure!(
            idx < self.sorted.len(),
            "threshold index {idx} out of range for {} edges",
            self.sorted.len()
        );
        let sub = self.graph.edge_subgraph(&self.sorted[..=idx]);
        let mut oracle = HamiltonianOracle::with_oracle(sub, OInit::init())?;
        let decision = oracle.decide_logged(self.logger.as_deref_mut())?;
        self.stats.n_thresholds += 1;
        self.stats += oracle.stats();
        if let Some(logger) = &mut self.logger {
            logger
                .log_threshold(idx, self.sorted[idx].weight, decision.is_cycle())
                .context("logger failed")?;
        }
        Ok(decision)
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Attaches a logger to the solver
    pub fn attach_logger<L: WriteSolverLog + 'static>(&mut self, logger: L) {
        self.logger = Some(Box::new(logger));
    }

    /// Detaches a logger from the solver
    pub fn detach_logger(&mut self) -> Option<Box<dyn WriteSolverLog>> {
        self.logger.take()
    }

    /// Gets an interrupter to the solver
    pub fn interrupter(&mut self) -> Interrupter {
        Interrupter {
            term_flag: self.term_flag.clone(),
        }
    }

    /// Index of the first threshold the upward searches start at. Returns
    /// `None` if the graph can not have a tour.
    fn start_index(&mut self, seed: bool) -> anyhow::Result<Option<usize>> {
        let n = self.graph.n_vertices();
        if self.sorted.len() < n {
            self.log_message("fewer edges than vertices")?;
            return Ok(None);
        }
        if !seed {
            return Ok(Some(n - 1));
        }
        match self.lower_bound_index() {
            Some(idx) => {
                self.log_message(&format!(
                    "lower bound {} at index {idx}",
                    self.sorted[idx].weight
                ))?;
                Ok(Some(std::cmp::max(idx, n - 1)))
            }
            None => {
                self.log_message("vertex with fewer than two incident edges")?;
                Ok(None)
            }
        }
    }

    /// Bisects the interval of threshold indices
    fn binary_search(&mut self) -> MaybeTerminatedError {
        let Some(mut lo) = done!(self.start_index(self.opts.seed_lower_bound)) else {
            return MaybeTerminatedError::Done(());
        };
        let mut hi = self.sorted.len() - 1;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if done!(self.test_threshold(mid, lo)) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        if self.best.is_none() {
            // index `lo` has not been tested yet
            done!(self.test_threshold(lo, lo));
        }
        MaybeTerminatedError::Done(())
    }

    /// Tests thresholds in increasing order until one is feasible
    fn sequential_up(&mut self) -> MaybeTerminatedError {
        let Some(start) = done!(self.start_index(true)) else {
            return MaybeTerminatedError::Done(());
        };
        for idx in start..self.sorted.len() {
            if done!(self.test_threshold(idx, idx)) {
                break;
            }
        }
        MaybeTerminatedError::Done(())
    }

    /// Starts from the full edge set and requires a strictly smaller
    /// bottleneck until infeasible
    fn sequential_down(&mut self) -> MaybeTerminatedError {
        let Some(floor) = done!(self.start_index(self.opts.seed_lower_bound)) else {
            return MaybeTerminatedError::Done(());
        };
        let mut n_allowed = self.sorted.len();
        while n_allowed > floor {
            if !done!(self.test_threshold(n_allowed - 1, floor)) {
                break;
            }
            let bottleneck = match &self.best {
                Some(tour) => tour.bottleneck(),
                None => break,
            };
            n_allowed = self.sorted.partition_point(|e| e.weight < bottleneck);
        }
        MaybeTerminatedError::Done(())
    }

    /// Tests the threshold of index `idx`, all thresholds below
    /// `infeasible_below` are known to be infeasible. Returns whether the
    /// threshold is feasible and records the tour as the new best tour.
    fn test_threshold(&mut self, idx: usize, infeasible_below: usize) -> MaybeTerminatedError<bool> {
        done!(self.check_termination());
        let calls_before = self.stats.n_oracle_calls;
        let decision = done!(self.decide_threshold(idx));
        if let Some(calls) = &mut self.lims.oracle_calls {
            *calls = calls.saturating_sub(self.stats.n_oracle_calls - calls_before);
        }
        let Decision::Cycle(tour) = decision else {
            return MaybeTerminatedError::Done(false);
        };
        let max_rank = tour
            .edges()
            .iter()
            .filter_map(|e| self.ranks.get(&e.key()).copied())
            .max();
        ensure!(
            max_rank.is_some_and(|r| r <= idx),
            "tour at threshold {} uses an edge above the threshold",
            idx
        );
        ensure!(
            max_rank.is_some_and(|r| r >= infeasible_below),
            "tour at threshold {} contradicts infeasible threshold {}",
            idx,
            infeasible_below
        );
        self.stats.n_tours += 1;
        if let Some(logger) = &mut self.logger {
            done!(logger.log_tour(&tour).context("logger failed"));
        }
        self.best = Some(tour);
        MaybeTerminatedError::Done(true)
    }

    /// Checks the termination flag and the limits
    fn check_termination(&self) -> MaybeTerminated {
        if self.term_flag.load(Ordering::Relaxed) {
            return MaybeTerminated::Terminated(Termination::Interrupted);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return MaybeTerminated::Terminated(Termination::TimeLimit);
        }
        if self.lims.oracle_calls == Some(0) {
            return MaybeTerminated::Terminated(Termination::OracleCallsLimit);
        }
        MaybeTerminated::Done(())
    }

    fn log_routine_start(&mut self, desc: &'static str) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_routine_start(desc).context("logger failed")?;
        }
        Ok(())
    }

    fn log_routine_end(&mut self) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_routine_end().context("logger failed")?;
        }
        Ok(())
    }

    fn log_message(&mut self, msg: &str) -> anyhow::Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.log_message(msg).context("logger failed")?;
        }
        Ok(())
    }
}

/// Solves the bottleneck TSP on a complete graph with the default SAT oracle
/// and search strategy. If the time budget runs out, the best tour found so
/// far is returned as a partial result.
pub fn solve_bottleneck_tsp(
    graph: &Graph,
    time_budget: Option<Duration>,
) -> anyhow::Result<BottleneckResult> {
    graph.validate_complete()?;
    let mut solver: BottleneckSolver = BottleneckSolver::new(graph.clone(), Options::default())?;
    let limits = Limits {
        time: time_budget,
        ..Limits::none()
    };
    let ret = solver.solve(limits);
    BottleneckResult::from_solve(ret, solver.take_best_tour())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rustsat::solvers::SolverResult;

    use super::{solve_bottleneck_tsp, BottleneckResult, BottleneckSolver};
    use crate::{
        graph::{Graph, Weight},
        options::{Limits, Options, SearchStrategy},
        InputError, MaybeTerminatedError, Termination, Tour, WriteSolverLog,
    };

    /// K4 on A, B, C, D with AB=1, AC=2, AD=3, BC=4, BD=5, CD=6
    fn k4() -> Graph {
        Graph::from_edges([
            (0, 1, 1),
            (0, 2, 2),
            (0, 3, 3),
            (1, 2, 4),
            (1, 3, 5),
            (2, 3, 6),
        ])
        .unwrap()
    }

    fn k6() -> Graph {
        Graph::complete(6, |u, v| u64::from((u * 7 + v * 13) % 17) + 1).unwrap()
    }

    fn solver(graph: Graph, strategy: SearchStrategy, seed_lower_bound: bool) -> BottleneckSolver {
        BottleneckSolver::new(
            graph,
            Options {
                strategy,
                seed_lower_bound,
            },
        )
        .unwrap()
    }

    const STRATEGIES: [SearchStrategy; 3] = [
        SearchStrategy::SequentialUp,
        SearchStrategy::SequentialDown,
        SearchStrategy::BinarySearch,
    ];

    #[test]
    fn k4_example() {
        match solve_bottleneck_tsp(&k4(), None).unwrap() {
            BottleneckResult::Optimal(tour) => {
                assert_eq!(tour.bottleneck(), 5);
                assert_eq!(tour.vertices(), &[0, 2, 1, 3]);
            }
            res => panic!("unexpected result {res:?}"),
        }
    }

    #[test]
    fn lower_bound() {
        let solver = solver(k4(), SearchStrategy::BinarySearch, true);
        assert_eq!(solver.lower_bound(), Some(5));
        assert_eq!(solver.lower_bound_index(), Some(4));
        let path = Graph::from_edges([(0, 1, 1), (1, 2, 2)]).unwrap();
        let solver = self::solver(path, SearchStrategy::BinarySearch, true);
        assert_eq!(solver.lower_bound(), None);
    }

    #[test]
    fn strategies_agree() {
        for graph in [k4(), k6()] {
            let mut bottlenecks = vec![];
            for strategy in STRATEGIES {
                for seed in [false, true] {
                    let mut solver = solver(graph.clone(), strategy, seed);
                    solver.solve(Limits::none()).unwrap();
                    let tour = solver.best_tour().unwrap();
                    assert_eq!(tour.len(), graph.n_vertices());
                    bottlenecks.push(tour.bottleneck());
                }
            }
            assert!(bottlenecks.windows(2).all(|w| w[0] == w[1]), "{bottlenecks:?}");
        }
    }

    #[test]
    fn zero_budget() {
        let res = solve_bottleneck_tsp(&k6(), Some(Duration::ZERO)).unwrap();
        assert_eq!(
            res,
            BottleneckResult::Partial {
                best: None,
                reason: Termination::TimeLimit
            }
        );
    }

    #[test]
    fn unbounded_budget() {
        let res = solve_bottleneck_tsp(&k4(), Some(Duration::MAX)).unwrap();
        assert_eq!(res.tour().map(|t| t.bottleneck()), Some(5));
        assert!(matches!(res, BottleneckResult::Optimal(_)));
    }

    /// Logger that stalls whenever a tour is found
    struct SlowTours(Duration);

    impl WriteSolverLog for SlowTours {
        fn log_threshold(&mut self, _: usize, _: Weight, _: bool) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_oracle_call(&mut self, _: SolverResult) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_cuts(&mut self, _: usize) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_tour(&mut self, _: &Tour) -> anyhow::Result<()> {
            std::thread::sleep(self.0);
            Ok(())
        }
        fn log_routine_start(&mut self, _: &'static str) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_routine_end(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_end_solve(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_message(&mut self, _: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn budget_runs_out_after_tour() {
        // binary search over indices 3..=5 first finds a tour at index 4, the
        // budget is gone before index 3 is tested
        let mut solver = solver(k4(), SearchStrategy::BinarySearch, false);
        solver.attach_logger(SlowTours(Duration::from_millis(600)));
        let ret = solver.solve(Limits {
            time: Some(Duration::from_millis(300)),
            ..Limits::none()
        });
        let res = BottleneckResult::from_solve(ret, solver.take_best_tour()).unwrap();
        let BottleneckResult::Partial {
            best: Some(tour),
            reason: Termination::TimeLimit,
        } = res
        else {
            panic!("unexpected result {res:?}")
        };
        assert_eq!(tour.bottleneck(), 5);
        assert_eq!(solver.stats().n_thresholds, 1);
    }

    #[test]
    fn oracle_call_limit() {
        let mut solver = solver(k4(), SearchStrategy::BinarySearch, false);
        let res = solver.solve(Limits {
            oracle_calls: Some(1),
            ..Limits::none()
        });
        // the first threshold (index 4) is feasible, the second is never tested
        assert!(matches!(
            res,
            MaybeTerminatedError::Terminated(Termination::OracleCallsLimit)
        ));
        assert_eq!(solver.best_tour().map(|t| t.bottleneck()), Some(5));
        assert_eq!(solver.stats().n_thresholds, 1);
    }

    #[test]
    fn interrupted() {
        let mut solver = solver(k6(), SearchStrategy::SequentialUp, true);
        solver.interrupter().interrupt();
        let res = solver.solve(Limits::none());
        assert!(matches!(
            res,
            MaybeTerminatedError::Terminated(Termination::Interrupted)
        ));
        assert!(solver.best_tour().is_none());
        assert_eq!(solver.stats().n_oracle_calls, 0);
    }

    #[test]
    fn petersen_infeasible() {
        let mut edges = vec![];
        for i in 0..5 {
            edges.push((i, (i + 1) % 5, u64::from(i) + 1));
            edges.push((i, i + 5, u64::from(i) + 6));
            edges.push((i + 5, (i + 2) % 5 + 5, u64::from(i) + 11));
        }
        let graph = Graph::from_edges(edges).unwrap();
        for strategy in STRATEGIES {
            let mut solver = solver(graph.clone(), strategy, true);
            solver.solve(Limits::none()).unwrap();
            assert!(solver.best_tour().is_none());
        }
        let err = solve_bottleneck_tsp(&graph, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref(),
            Some(&InputError::NotComplete(_, _))
        ));
    }

    #[test]
    fn decide_threshold_range() {
        let mut solver = solver(k4(), SearchStrategy::BinarySearch, true);
        assert!(!solver.decide_threshold(3).unwrap().is_cycle());
        assert!(solver.decide_threshold(4).unwrap().is_cycle());
        assert!(solver.decide_threshold(6).is_err());
        assert_eq!(solver.stats().n_thresholds, 2);
    }
}

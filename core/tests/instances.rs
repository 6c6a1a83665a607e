use btsp_core::{
    fio::{self, FileFormat},
    graph::Weight,
    BottleneckSolver, Limits, MaybeTerminatedError, Options, SearchStrategy,
};
use libtest_mimic::{Arguments, Failed};

use setup::{Expected, TestSetup};

fn main() {
    let args = Arguments::from_args();
    let mut tests = vec![];

    for strategy in [
        SearchStrategy::SequentialUp,
        SearchStrategy::SequentialDown,
        SearchStrategy::BinarySearch,
    ] {
        for (variant, seed_lower_bound) in [("", true), ("no-seed", false)] {
            tests.extend(
                TestSetup::new(
                    strategy,
                    variant,
                    Options {
                        strategy,
                        seed_lower_bound,
                    },
                )
                .collect_tests(),
            );
        }
    }

    libtest_mimic::run(&args, tests).exit();
}

fn run_test(path: &std::path::Path, opts: Options, expected: Expected) -> Result<(), Failed> {
    let graph = fio::parse(path, FileFormat::Infer)?;
    let mut solver: BottleneckSolver = BottleneckSolver::new(graph.clone(), opts)?;
    match solver.solve(Limits::none()) {
        MaybeTerminatedError::Done(_) => (),
        MaybeTerminatedError::Terminated(t) => {
            return Err(format!("solving terminated early: {t}").into())
        }
        MaybeTerminatedError::Error(e) => return Err(format!("solving error: {e}").into()),
    }
    let found: Option<Weight> = solver.best_tour().map(|tour| tour.bottleneck());
    let expected = match expected {
        Expected::Bottleneck(w) => Some(w),
        Expected::Infeasible => None,
    };
    if found != expected {
        return Err(format!("expected bottleneck {expected:?}, found {found:?}").into());
    }
    if let Some(tour) = solver.best_tour() {
        if tour.len() != graph.n_vertices() {
            return Err(format!("tour visits {} of {} vertices", tour.len(), graph.n_vertices()).into());
        }
        for e in tour.edges() {
            if graph.edge(e.u, e.v) != Some(e) {
                return Err(format!("tour uses unknown edge {e:?}").into());
            }
        }
    }
    Ok(())
}

mod setup {
    use std::{
        ffi::OsStr,
        fs::File,
        io::{BufRead, BufReader},
        path::{Path, PathBuf},
    };

    use btsp_core::{graph::Weight, Options, SearchStrategy};
    use libtest_mimic::Trial;

    /// The outcome recorded in the header comments of an instance
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Expected {
        Bottleneck(Weight),
        Infeasible,
    }

    pub struct TestSetup<'a> {
        strategy: SearchStrategy,
        variant: &'a str,
        opts: Options,
    }

    impl<'a> TestSetup<'a> {
        pub fn new(strategy: SearchStrategy, variant: &'a str, opts: Options) -> Self {
            Self {
                strategy,
                variant,
                opts,
            }
        }

        fn kind(&self) -> String {
            format!(
                "{}{}{}",
                self.strategy,
                if self.variant.is_empty() { "" } else { ":" },
                self.variant
            )
        }

        /// Reads the expected outcome and whether the test is ignored for
        /// this setup
        fn meta(&self, path: &Path) -> (Option<Expected>, bool) {
            let mut expected = None;
            let mut ignore = false;
            for line in
                BufReader::new(File::open(path).expect("failed to open instance file")).lines()
            {
                let line = line.expect("failed to read test config");
                let Some(line) = line.strip_prefix('c') else {
                    break;
                };
                let line = line.trim();
                if line == "infeasible" {
                    expected = Some(Expected::Infeasible);
                } else if let Some(w) = line.strip_prefix("bottleneck ") {
                    expected = Some(Expected::Bottleneck(
                        w.trim().parse().expect("invalid bottleneck weight"),
                    ));
                } else if let Some(kind) = line.strip_prefix("ignore-test:") {
                    let kind = kind.trim();
                    ignore |= kind == self.strategy.to_string() || kind == self.kind();
                }
            }
            (expected, ignore)
        }

        pub fn collect_tests(self) -> Vec<Trial> {
            let manifest_dir = env!("CARGO_MANIFEST_DIR");
            let mut tests = vec![];
            for entry in std::fs::read_dir(format!("{manifest_dir}/data/"))
                .expect("failed to find test instances")
            {
                let entry = entry.unwrap();
                let path: PathBuf = entry.path();
                if !entry.file_type().unwrap().is_file() {
                    eprintln!("skipping `{path:?}`");
                    continue;
                }
                match path.extension().and_then(OsStr::to_str) {
                    Some("graph" | "edges" | "matrix" | "mat") => {
                        let (Some(expected), ignore) = self.meta(&path) else {
                            eprintln!("no expected outcome in `{path:?}`");
                            continue;
                        };
                        let name = path.file_name().unwrap().to_str().unwrap().to_string();
                        let opts = self.opts;
                        tests.push(
                            Trial::test(name, move || super::run_test(&path, opts, expected))
                                .with_kind(self.kind())
                                .with_ignored_flag(ignore),
                        );
                    }
                    _ => eprintln!("skipping file `{path:?}`"),
                }
            }
            tests
        }
    }
}

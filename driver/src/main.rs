use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use kernel::{
    Literal,
    Reasoner,
};
use log::LevelFilter;
use std::path::PathBuf;

/// Naive DPLL branching loop driving the CDCL reasoning kernel.
#[derive(Parser, Debug)]
#[clap(name = "cdcl-driver", about = "Decides a DIMACS CNF file using the CDCL kernel")]
struct Opt {
    /// Path to a DIMACS CNF input file.
    input: PathBuf,

    /// Log verbosity: unset is warnings only, -v is info, -vv is debug.
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,
}

/// Maps a repeated `-v` count to a level filter, defaulting to warnings-only
/// so a plain run stays quiet on stderr.
fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Picks the first unassigned variable and decides it positively. A
/// production branching heuristic (VSIDS or similar) lives entirely outside
/// this kernel; this is the simplest possible consumer of its API.
fn pick_branching_literal(reasoner: &Reasoner) -> Option<Literal> {
    (1..=reasoner.variable_count()).find_map(|index| {
        let variable = reasoner.index_to_variable(index)?;
        (!reasoner.instantiated_var(variable)).then(|| reasoner.pos_literal(variable))
    })
}

/// Walks the conflict up to its assertion level, asserting the learned
/// clause once reached. Returns `true` if the formula is proven unsatisfiable
/// (the conflict could not be backed away from even at the start level).
fn resolve_conflict(reasoner: &mut Reasoner, mut conflict: kernel::clause_db::ClauseId) -> bool {
    loop {
        if reasoner.at_assertion_level(conflict) {
            match reasoner.assert_clause(conflict) {
                // Same clause handed back: every literal is already assigned
                // and there is no level left to undo. Unsatisfiable.
                Some(next) if next == conflict => return true,
                Some(next) => conflict = next,
                None => return false,
            }
        } else {
            reasoner.undo_decide_literal();
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    env_logger::Builder::new().filter_level(level_filter(opt.verbose)).init();

    let mut reasoner = Reasoner::from_dimacs_path(&opt.input)
        .with_context(|| format!("failed to load DIMACS input from {}", opt.input.display()))?;

    if reasoner.conflict_exists() {
        let conflict = reasoner.asserting_clause().expect("conflict_exists implies a published clause");
        let unsat = resolve_conflict(&mut reasoner, conflict);
        debug_assert!(unsat, "a start-level construction conflict must be unresolvable");
        println!("UNSAT");
        return Ok(())
    }

    loop {
        match pick_branching_literal(&reasoner) {
            None => {
                println!("SAT");
                print_model(&reasoner);
                return Ok(())
            }
            Some(literal) => match reasoner.decide_literal(literal) {
                None => continue,
                Some(conflict) => {
                    if resolve_conflict(&mut reasoner, conflict) {
                        println!("UNSAT");
                        return Ok(())
                    }
                }
            },
        }
    }
}

fn print_model(reasoner: &Reasoner) {
    let assignments: Vec<String> = (1..=reasoner.variable_count())
        .filter_map(|index| {
            let variable = reasoner.index_to_variable(index)?;
            let value = reasoner.literal_value(reasoner.pos_literal(variable))?;
            Some(if value {
                format!("{}", index)
            } else {
                format!("-{}", index)
            })
        })
        .collect();
    println!("model = {}", assignments.join(" "));
}

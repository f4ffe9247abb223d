use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

mod fixture;
mod oracle;
mod params;
mod pipeline;
mod scenario;

use fixture::Fixture;
use params::{ParamRow, ParamTable};
use scenario::{FileMeta, Scenario};

#[derive(Parser, Debug)]
#[command(author, version, about = "sort combinatorial test harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scenario table against the sort binary (default)
    Tests {
        /// Only run cases whose name or value summary contains this filter
        #[arg(short, long)]
        filter: Option<String>,
        /// Print per-case execution details
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
        /// Seed scenario randomness for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,
        /// Parameter table to read scenarios from
        #[arg(short, long, default_value = "cases.csv")]
        cases: PathBuf,
        /// Sort binary under test (defaults to `sort` on PATH)
        #[arg(long)]
        sort_bin: Option<PathBuf>,
    },
    /// Print the registered parameter names and values
    Params,
}

static VERBOSE: AtomicBool = AtomicBool::new(false);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tests {
        filter: None,
        verbose: false,
        seed: None,
        cases: PathBuf::from("cases.csv"),
        sort_bin: None,
    });

    match command {
        Commands::Tests {
            filter,
            verbose,
            seed,
            cases,
            sort_bin,
        } => {
            VERBOSE.store(verbose, Ordering::Relaxed);
            run_tests(filter, seed, &cases, sort_bin)
        }
        Commands::Params => print_params(),
    }
}

fn print_params() -> Result<()> {
    for (name, values) in pipeline::build().parameters() {
        println!("{name}: {}", values.join(" "));
    }
    Ok(())
}

// --------------------- Shared harness --------------------------------------
struct Harness {
    sort: PathBuf,
    pipeline: pipeline::Pipeline,
    running_as_root: bool,
}

impl Harness {
    fn new(sort_bin: Option<PathBuf>) -> Result<Self> {
        let sort = match sort_bin {
            Some(path) => path,
            None => which::which("sort").context("sort binary not found on PATH")?,
        };
        Ok(Self {
            sort,
            pipeline: pipeline::build(),
            running_as_root: nix::unistd::geteuid().is_root(),
        })
    }
}

enum Outcome {
    Pass,
    Skipped(&'static str),
}

// --------------------- Test runner ----------------------------------------
fn run_tests(
    filter: Option<String>,
    seed: Option<u64>,
    cases: &Path,
    sort_bin: Option<PathBuf>,
) -> Result<()> {
    let harness = Harness::new(sort_bin)?;
    let table = ParamTable::load(cases)?;
    if table.is_empty() {
        bail!("no scenario rows in {}", cases.display());
    }

    let mut passed = 0usize;
    let mut skipped = 0usize;
    let mut executed = 0usize;
    for (index, row) in table.rows().enumerate() {
        let name = format!("case {:03} [{}]", index, row.summary());
        if let Some(f) = &filter {
            if !name.contains(f.as_str()) {
                continue;
            }
        }
        executed += 1;
        if VERBOSE.load(Ordering::Relaxed) {
            println!("[RUN ] {name}");
        }
        // Per-row seeds keep a seeded run reproducible case by case.
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };
        match run_scenario(&harness, &row, &mut rng) {
            Ok(Outcome::Pass) => {
                passed += 1;
                println!("[PASS] {name}");
            }
            Ok(Outcome::Skipped(reason)) => {
                skipped += 1;
                println!("[SKIP] {name}: {reason}");
            }
            Err(e) => {
                println!("[FAIL] {name}: {e:#}");
            }
        }
    }
    println!(
        "\n{passed}/{executed} cases passed, {skipped} skipped{}.",
        if filter.is_some() { " (filtered)" } else { "" }
    );
    if passed + skipped == executed {
        return Ok(());
    }
    bail!("failures encountered");
}

fn run_scenario(h: &Harness, row: &ParamRow, rng: &mut StdRng) -> Result<Outcome> {
    let mut scenario = Scenario::new();
    h.pipeline.apply(&mut scenario, row, rng)?;
    let fixture = Fixture::stage(&mut scenario)?;

    let stdin_payload = match &scenario.stdin_file {
        Some(file) => Some(fs::read(fixture.path(&file.name))?),
        None => None,
    };
    let mut operands: Vec<String> = scenario.filenames().iter().map(|s| s.to_string()).collect();
    if scenario.stdin_file.is_some() {
        operands.push("-".to_string());
    }

    let out = run_sort(
        &h.sort,
        fixture.dir(),
        &scenario.args,
        &operands,
        stdin_payload.as_deref(),
    )?;

    match predict_failure(h, &scenario) {
        Prediction::Skip(reason) => Ok(Outcome::Skipped(reason)),
        Prediction::Failure(diagnostics) => {
            if out.status_code == Some(0) {
                bail!(
                    "expected a failure ({}) but sort exited 0",
                    diagnostics.join(", ")
                );
            }
            let stderr = String::from_utf8_lossy(&out.stderr);
            // With a single predicted cause the diagnostic must name it;
            // with several, which one surfaces first is the utility's call.
            if let [only] = diagnostics.as_slice() {
                if !stderr.contains(only.as_str()) {
                    bail!("stderr missing {only:?}: {stderr}");
                }
            }
            Ok(Outcome::Pass)
        }
        Prediction::Success => {
            if out.status_code != Some(0) {
                bail!(
                    "sort exited {:?}: {}",
                    out.status_code,
                    String::from_utf8_lossy(&out.stderr)
                );
            }
            check_output(&scenario, &fixture, &out.stdout)?;
            Ok(Outcome::Pass)
        }
    }
}

enum Prediction {
    Success,
    /// Non-zero exit expected; each entry is a substring the diagnostic
    /// should carry when it is the only predicted cause.
    Failure(Vec<String>),
    Skip(&'static str),
}

fn predict_failure(h: &Harness, scenario: &Scenario) -> Prediction {
    let mut diagnostics = Vec::new();

    if scenario.has_incompatible_args() {
        diagnostics.push("incompatible".to_string());
    }
    if let Some(file) = scenario.find_file_with(FileMeta::NonExistent) {
        diagnostics.push(file.name.clone());
    }
    if let Some(file) = scenario.find_file_with(FileMeta::ReadProtected) {
        if h.running_as_root {
            // Mode 0 does not deny reads to root, so the scenario cannot
            // observe its permission error.
            return Prediction::Skip("read-protected fixture unavailable as root");
        }
        diagnostics.push(file.name.clone());
    }
    if let Some(source) = &scenario.random_source {
        let uses_source = scenario.args.iter().any(|a| a == "--random-sort");
        match source.meta {
            FileMeta::NonExistent if uses_source => diagnostics.push(source.name.clone()),
            FileMeta::ReadProtected if uses_source => {
                if h.running_as_root {
                    return Prediction::Skip("read-protected random source unavailable as root");
                }
                diagnostics.push(source.name.clone());
            }
            FileMeta::Readable if uses_source && scenario.random_source_content.is_empty() => {
                diagnostics.push(source.name.clone());
            }
            _ => {}
        }
    }

    if diagnostics.is_empty() {
        Prediction::Success
    } else {
        Prediction::Failure(diagnostics)
    }
}

fn check_output(scenario: &Scenario, fixture: &Fixture, stdout: &[u8]) -> Result<()> {
    if !scenario.encoding.is_byte_oriented() {
        // The utility is byte-oriented; UTF-16 output carries no decodable
        // line structure to compare. Exit code has been checked already.
        return Ok(());
    }
    let actual = scenario.encoding.decode(stdout);
    let transform_active = scenario.ignore_leading_blanks
        || scenario.dictionary_order
        || scenario.ignore_case
        || scenario.ignore_non_printable;
    let shuffled = scenario.args.iter().any(|a| a == "--random-sort");

    if transform_active || shuffled {
        // Ordering depends on options the oracle deliberately ignores;
        // the output must still be a permutation of the staged lines.
        let mut actual_lines: Vec<&str> = actual.lines().collect();
        let mut expected_lines: Vec<&str> =
            fixture.written_lines().iter().map(|s| s.as_str()).collect();
        actual_lines.sort_unstable();
        expected_lines.sort_unstable();
        if actual_lines != expected_lines {
            bail!("output is not a permutation of the staged lines\n=== actual ===\n{actual}");
        }
        return Ok(());
    }

    let expected = scenario::join_lines(&oracle::sorted(
        fixture.written_lines(),
        scenario.sort_key,
        scenario.reverse,
    ));
    if actual != expected {
        bail!("output mismatch\n=== expected ===\n{expected}=== actual ===\n{actual}");
    }
    Ok(())
}

// --------------------- Subprocess plumbing ---------------------------------
struct SortOutput {
    status_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn run_sort(
    sort: &Path,
    cwd: &Path,
    args: &[String],
    operands: &[String],
    stdin_data: Option<&[u8]>,
) -> Result<SortOutput> {
    let mut command = Command::new(sort);
    command
        .current_dir(cwd)
        .env("LC_ALL", "C")
        .args(args)
        .args(operands)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    let mut child = command
        .spawn()
        .with_context(|| format!("spawning {sort:?}"))?;
    let stdin_writer = stdin_data.map(|data| {
        let mut stdin = child.stdin.take().unwrap();
        let owned = data.to_vec();
        std::thread::spawn(move || -> std::io::Result<()> { stdin.write_all(&owned) })
    });
    let output = child.wait_with_output()?;
    if let Some(writer) = stdin_writer {
        // A failing sort may exit before draining stdin; the resulting
        // broken pipe is not the scenario's concern.
        let _ = writer.join().unwrap();
    }
    if VERBOSE.load(Ordering::Relaxed) {
        println!(
            "[CMD ] {:?} {:?} {:?} -> status {:?}, stdout {}B, stderr {}B",
            sort,
            args,
            operands,
            output.status.code(),
            output.stdout.len(),
            output.stderr.len()
        );
    }
    Ok(SortOutput {
        status_code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

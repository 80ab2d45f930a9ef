use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufWriter, Read, Write};
use std::time::{Duration, Instant};

use hason::filter::{self, Filter};
use hason::output::{OutputConfig, OutputMode};
use hason::value::Value;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit status when any input failed to evaluate (matches jq).
const EXIT_EVAL_ERROR: i32 = 5;

#[derive(Parser)]
#[command(name = "hason", about = "A jq-style JSON filter", version)]
struct Cli {
    /// jq filter expression
    filter: String,

    /// Input file(s); defaults to stdin
    files: Vec<String>,

    /// Compact output (no pretty-printing)
    #[arg(short = 'c', long = "compact-output")]
    compact: bool,

    /// Raw output (strings without quotes)
    #[arg(short = 'r', long = "raw-output")]
    raw: bool,

    /// Use tab for indentation
    #[arg(long)]
    tab: bool,

    /// Number of spaces for indentation (0 means compact)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(0..=7))]
    indent: u32,

    /// Sort object keys
    #[arg(short = 'S', long = "sort-keys")]
    sort_keys: bool,

    /// No newline after each output
    #[arg(short = 'j', long = "join-output")]
    join_output: bool,

    /// Set exit status based on output
    #[arg(short = 'e', long = "exit-status")]
    exit_status: bool,

    /// Null input: don't read any input, use `null` as the sole input
    #[arg(short = 'n', long = "null-input")]
    null_input: bool,

    /// Emit only the first output for each input
    #[arg(long)]
    first: bool,

    /// Print timing breakdown to stderr (for profiling)
    #[arg(long = "debug-timing", hide = true)]
    debug_timing: bool,
}

impl Cli {
    fn output_config(&self) -> OutputConfig {
        let mode = if self.raw || self.join_output {
            OutputMode::Raw
        } else if self.compact || (!self.tab && self.indent == 0) {
            OutputMode::Compact
        } else {
            OutputMode::Pretty
        };
        OutputConfig {
            mode,
            indent: if self.tab {
                "\t".to_string()
            } else {
                " ".repeat(self.indent as usize)
            },
            sort_keys: self.sort_keys,
            join_output: self.join_output,
        }
    }
}

/// Running state across all inputs.
#[derive(Default)]
struct RunState {
    had_output: bool,
    last_truthy: bool,
    had_error: bool,
    timing: Timing,
}

#[derive(Default)]
struct Timing {
    bytes: usize,
    read: Duration,
    parse: Duration,
    eval: Duration,
    output: Duration,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let t0 = Instant::now();
    let filter = filter::parse(&cli.filter)
        .with_context(|| format!("failed to parse filter: {}", cli.filter))?;
    let t_filter = t0.elapsed();

    let config = cli.output_config();
    let stdout = io::stdout().lock();
    let mut out = BufWriter::with_capacity(128 * 1024, stdout);
    let mut state = RunState::default();

    if cli.null_input {
        emit_results(&filter, &[Value::Null], &cli, &config, &mut out, &mut state)?;
    } else if cli.files.is_empty() {
        let t = Instant::now();
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        state.timing.read += t.elapsed();
        process_buffer(buf, "<stdin>", &filter, &cli, &config, &mut out, &mut state)?;
    } else {
        for path in &cli.files {
            let t = Instant::now();
            let buf = std::fs::read(path).with_context(|| format!("failed to read file: {path}"))?;
            state.timing.read += t.elapsed();
            process_buffer(buf, path, &filter, &cli, &config, &mut out, &mut state)?;
        }
    }

    out.flush()?;

    if cli.debug_timing {
        print_timing(&state.timing, t_filter);
    }

    if state.had_error {
        std::process::exit(EXIT_EVAL_ERROR);
    }
    if cli.exit_status {
        if !state.had_output {
            std::process::exit(4);
        }
        if !state.last_truthy {
            std::process::exit(1);
        }
    }

    Ok(())
}

fn process_buffer(
    mut buf: Vec<u8>,
    name: &str,
    filter: &Filter,
    cli: &Cli,
    config: &OutputConfig,
    out: &mut impl Write,
    state: &mut RunState,
) -> Result<()> {
    hason::input::strip_bom(&mut buf);
    state.timing.bytes += buf.len();

    if hason::parallel::ndjson::is_ndjson(&buf) {
        let t = Instant::now();
        let result = hason::parallel::ndjson::process_ndjson(&buf, filter, config, cli.first)
            .with_context(|| format!("failed to process {name}"))?;
        state.timing.eval += t.elapsed();

        let t = Instant::now();
        out.write_all(&result.bytes)?;
        state.timing.output += t.elapsed();
        if result.had_output {
            state.had_output = true;
            state.last_truthy = result.last_truthy;
        }
        for (line, e) in &result.errors {
            eprintln!("hason: error ({name}:{line}): {e}");
            state.had_error = true;
        }
        return Ok(());
    }

    let t = Instant::now();
    let mut values = Vec::new();
    hason::input::collect_values_from_buf(&buf, false, &mut values)
        .with_context(|| format!("failed to parse JSON from {name}"))?;
    state.timing.parse += t.elapsed();

    emit_results(filter, &values, cli, config, out, state)
}

fn emit_results(
    filter: &Filter,
    inputs: &[Value],
    cli: &Cli,
    config: &OutputConfig,
    out: &mut impl Write,
    state: &mut RunState,
) -> Result<()> {
    let t = Instant::now();
    let results = if inputs.len() > 1 {
        hason::parallel::evaluate_many(filter, inputs)
    } else {
        inputs.iter().map(|v| filter::evaluate(filter, v)).collect()
    };
    state.timing.eval += t.elapsed();

    let t = Instant::now();
    for result in results {
        match result {
            Ok(values) => {
                let take = if cli.first { 1 } else { values.len() };
                for v in values.iter().take(take) {
                    hason::output::write_value(out, v, config)?;
                    state.had_output = true;
                    state.last_truthy = v.is_truthy();
                }
            }
            Err(e) => {
                // Flush so the error lands after the outputs that preceded it
                out.flush()?;
                eprintln!("hason: error: {e}");
                state.had_error = true;
            }
        }
    }
    state.timing.output += t.elapsed();
    Ok(())
}

fn print_timing(timing: &Timing, t_filter: Duration) {
    let total = t_filter + timing.read + timing.parse + timing.eval + timing.output;
    let pct = |d: Duration| d.as_secs_f64() / total.as_secs_f64() * 100.0;
    let mb = timing.bytes as f64 / (1024.0 * 1024.0);
    eprintln!("--- debug-timing ({mb:.1} MB) ---");
    eprintln!(
        "  filter: {:>8.2}ms  ({:.0}%)",
        t_filter.as_secs_f64() * 1000.0,
        pct(t_filter)
    );
    eprintln!(
        "  read:   {:>8.2}ms  ({:.0}%)",
        timing.read.as_secs_f64() * 1000.0,
        pct(timing.read)
    );
    eprintln!(
        "  parse:  {:>8.2}ms  ({:.0}%)",
        timing.parse.as_secs_f64() * 1000.0,
        pct(timing.parse)
    );
    eprintln!(
        "  eval:   {:>8.2}ms  ({:.0}%)",
        timing.eval.as_secs_f64() * 1000.0,
        pct(timing.eval)
    );
    eprintln!(
        "  output: {:>8.2}ms  ({:.0}%)",
        timing.output.as_secs_f64() * 1000.0,
        pct(timing.output)
    );
    eprintln!(
        "  total:  {:>8.2}ms  ({:.0} MB/s)",
        total.as_secs_f64() * 1000.0,
        mb / total.as_secs_f64()
    );
}

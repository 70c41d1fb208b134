use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use zscan::kernel::services::adapters::search::open_shared;
use zscan::kernel::services::adapters::{
    get_settings_path, load_or_init_settings, load_settings_or_default, LineFilter, SearchRuntime,
};
use zscan::kernel::services::ports::{PipelineMessage, SearchError, SearchSettings};
use zscan::kernel::SearchSnapshot;

const USAGE: &str = "usage: zscan <file> <pattern> [--regex] [--ignore-case] [--cap N] \
                     [--settings PATH] [--follow]";
const REPORT_INTERVAL: Duration = Duration::from_millis(200);

struct Args {
    path: PathBuf,
    pattern: String,
    regex: bool,
    ignore_case: bool,
    cap: Option<usize>,
    settings: Option<PathBuf>,
    follow: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut parsed = Args {
            path: PathBuf::new(),
            pattern: String::new(),
            regex: false,
            ignore_case: false,
            cap: None,
            settings: None,
            follow: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--regex" | "-e" => parsed.regex = true,
                "--ignore-case" | "-i" => parsed.ignore_case = true,
                "--follow" | "-f" => parsed.follow = true,
                "--cap" => {
                    let value = args.next().ok_or("--cap needs a value")?;
                    let cap = value
                        .parse()
                        .map_err(|_| format!("invalid --cap value: {}", value))?;
                    parsed.cap = Some(cap);
                }
                "--settings" => {
                    let value = args.next().ok_or("--settings needs a path")?;
                    parsed.settings = Some(PathBuf::from(value));
                }
                "-h" | "--help" => return Err(String::new()),
                _ if arg.starts_with('-') => return Err(format!("unknown option: {}", arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        match (positional.next(), positional.next(), positional.next()) {
            (Some(path), Some(pattern), None) => {
                parsed.path = PathBuf::from(path);
                parsed.pattern = pattern;
                Ok(parsed)
            }
            _ => Err("expected <file> and <pattern>".to_string()),
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("zscan: {}", msg);
            }
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let _logging = zscan::logging::init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "zscan failed");
            eprintln!("zscan: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), SearchError> {
    let mut settings = match &args.settings {
        Some(path) => load_settings_or_default(path)?,
        None => match get_settings_path() {
            Some(path) => load_or_init_settings(&path)?,
            None => SearchSettings::default(),
        },
    };
    if let Some(cap) = args.cap {
        settings.match_cap = cap;
    }

    let filter = if args.regex {
        LineFilter::regex(&args.pattern, !args.ignore_case)?
    } else {
        LineFilter::literal(&args.pattern, !args.ignore_case)
    };

    let runtime = SearchRuntime::new()?;
    let (pipeline, stop) = runtime.watch_file(args.path.clone(), Arc::new(filter), &settings)?;

    let mut latest: Option<Arc<SearchSnapshot>> = None;
    let mut reported = 0usize;
    let outcome = loop {
        match pipeline.recv_timeout(REPORT_INTERVAL) {
            Ok(PipelineMessage::Snapshot(snapshot)) => latest = Some(snapshot),
            Ok(PipelineMessage::Error(e)) => break Err(e),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break Ok(()),
        }

        let Some(snapshot) = &latest else { continue };
        if args.follow {
            if snapshot.total_matches() != reported {
                reported = snapshot.total_matches();
                eprintln!(
                    "{} matches in {} segments",
                    reported,
                    snapshot.segment_count()
                );
            }
        } else if !snapshot.is_empty() && !snapshot.is_searching() {
            break Ok(());
        }
    };

    stop.store(true, Ordering::Relaxed);
    pipeline.cancel();
    outcome?;

    if let Some(snapshot) = latest {
        print_matches(&args.path, &snapshot, settings.encoding)?;
    }
    Ok(())
}

fn print_matches(
    path: &Path,
    snapshot: &SearchSnapshot,
    encoding: zscan::kernel::services::ports::TextEncoding,
) -> io::Result<()> {
    let mut reader = BufReader::new(open_shared(path)?);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut line = Vec::new();

    for offset in snapshot.match_offsets() {
        reader.seek(SeekFrom::Start(offset))?;
        line.clear();
        reader.read_until(b'\n', &mut line)?;
        let text = encoding.decode(&line);
        writeln!(out, "{}:{}", offset, text.trim_end_matches(['\r', '\n']))?;
    }

    writeln!(
        out,
        "-- {} matches, {} segments, {} failed",
        snapshot.total_matches(),
        snapshot.segment_count(),
        snapshot.failed_count()
    )?;
    Ok(())
}

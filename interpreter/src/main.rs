use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::{CommandFactory, Parser};
use log::{debug, warn, Level, LevelFilter, Log, Metadata, Record};
use renzmc::{format_error, Config, Diagnostic, DirectoryResolver, ErrorKind, Interpreter};

#[derive(Parser)]
#[command(
    name = "renzmc",
    version,
    about = "RenzmcLang - Bahasa pemrograman berbasis Bahasa Indonesia"
)]
struct Cli {
    /// File RenzmcLang untuk dijalankan
    file: Option<PathBuf>,

    /// Jalankan kode RenzmcLang
    #[arg(short, long)]
    code: Option<String>,

    /// Matikan pemeriksaan petunjuk tipe
    #[arg(long = "no-type-check")]
    no_type_check: bool,

    /// Tolak konversi longgar seperti int untuk float
    #[arg(long)]
    strict: bool,

    /// Batas kedalaman pemanggilan fungsi
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,

    /// Tampilkan log interpreter di stderr
    #[arg(long)]
    verbose: bool,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

// A script that fails exits non-zero. Inline code only reports its error, and an
// interrupt exits the way a shell expects after SIGINT.
fn exit_status(error: &Diagnostic, inline: bool) -> Option<i32> {
    match error.kind {
        ErrorKind::Interrupted => Some(130),
        _ if inline => None,
        _ => Some(1),
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose && log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }

    let (source, root) = match (&cli.code, &cli.file) {
        (Some(code), _) => (code.clone(), PathBuf::from(".")),
        (None, Some(file)) => match fs::read_to_string(file) {
            Ok(source) => {
                let root = file
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                (source, root)
            }
            Err(_) => {
                eprintln!("Error: File '{}' tidak ditemukan.", file.display());
                process::exit(1);
            }
        },
        (None, None) => {
            let _ = Cli::command().print_help();
            process::exit(2);
        }
    };

    let mut config = Config {
        type_checking: !cli.no_type_check,
        strict: cli.strict,
        ..Config::default()
    };
    if let Some(depth) = cli.max_depth {
        config.max_call_depth = depth;
    }

    let mut resolver = DirectoryResolver::new(root);
    resolver.add_search_path(".");

    let stdout: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));
    let mut interpreter = Interpreter::with_config(Rc::clone(&stdout), config);
    interpreter.set_module_resolver(Rc::new(resolver));

    let interrupt = interpreter.interrupt_handle();
    if let Err(error) = ctrlc::set_handler(move || interrupt.interrupt()) {
        warn!("penangan Ctrl+C tidak dapat dipasang: {}", error);
    }

    debug!("menjalankan {} byte kode", source.len());
    let result = interpreter.run(&source);
    let _ = stdout.borrow_mut().flush();

    if let Err(error) = result {
        eprintln!("{}", format_error(&error, Some(&source)));
        if let Some(status) = exit_status(&error, cli.code.is_some()) {
            process::exit(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use renzmc::{Diagnostic, ErrorKind};

    use crate::exit_status;

    #[test]
    fn test_exit_status() {
        let failure = Diagnostic::at(ErrorKind::DivisionByZero, "Pembagian dengan nol", 1, 3);
        assert_eq!(exit_status(&failure, false), Some(1));
        assert_eq!(exit_status(&failure, true), None);

        let interrupted = Diagnostic::interrupted();
        assert_eq!(exit_status(&interrupted, false), Some(130));
        assert_eq!(exit_status(&interrupted, true), Some(130));
    }
}

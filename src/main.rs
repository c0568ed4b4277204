use gradebook::{
    config,
    core::db::Gradebook,
    repl::{self, Repl},
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    // Log to stderr so the REPL output on stdout stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    info!("Starting gradebook...");

    let mut config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // An optional positional argument overrides the configured database
    if let Some(db_path) = std::env::args().nth(1) {
        config.database.path = PathBuf::from(db_path);
    }

    println!("Welcome to gradebook! Use _ instead of spaces in course and student names.");

    let mut input = io::stdin().lock();
    let mut stdout = io::stdout();
    let credentials =
        match repl::prompt_credentials(&mut input, &mut stdout, &config.credentials) {
            Ok(credentials) => credentials,
            Err(e) => {
                eprintln!("Failed to read credentials: {}", e);
                return ExitCode::FAILURE;
            }
        };

    let gradebook = match Gradebook::connect(&config.database, &credentials) {
        Ok(gradebook) => gradebook,
        Err(e) => {
            error!("Connection to {:?} failed: {}", config.database.path, e);
            eprintln!(
                "Failed to connect to database {}: {}",
                config.database.path.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    println!("Type h to see the available commands.");

    let mut repl = Repl::new(gradebook, stdout.lock());
    if let Err(e) = repl.run(&mut input) {
        eprintln!("Terminal error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

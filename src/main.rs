// STD Dependencies -----------------------------------------------------------
use std::env;
use std::process;

// External Dependencies ------------------------------------------------------
use file_io::Logger;
use project::{ProjectConfig, ProjectReader, PROJECT_FILE};

// Modules --------------------------------------------------------------------
mod cli;

// CLI Interface --------------------------------------------------------------
fn main() {
    let mut logger = Logger::new();
    let matches = cli::app().get_matches();

    // Support Silent Flag
    if matches.occurrences_of("silent") > 0 {
        logger.set_silent();
    }

    // Resolve the project directory relative to the working directory
    let base = match matches.value_of("PROJECT_DIR") {
        Some(dir) => env::current_dir().unwrap().join(dir),
        None => env::current_dir().unwrap()
    };
    if !base.join(PROJECT_FILE).is_file() {
        logger.error(Logger::format_error(format!(
            "No \"{}\" found in \"{}\"", PROJECT_FILE, base.display()
        )));
        process::exit(2);
    }

    let mut reader = ProjectReader::from_absolute(base);
    let config = ProjectConfig::load(&mut logger, &reader);
    if ProjectConfig::build(&config, &mut logger, &mut reader).is_err() {
        process::exit(1);
    }
}

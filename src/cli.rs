// External Dependencies ------------------------------------------------------
use clap::{App, Arg};


// CLI Definition --------------------------------------------------------------
pub fn app() -> App<'static> {
    App::new("agbc")
        .version("0.3.0")
        .about("Compiles tile art and level maps into runtime data")
        .arg(Arg::new("PROJECT_DIR")
            .index(1)
            .help("Project directory containing agbc.toml, defaults to the current directory")
        )
        .arg(Arg::new("silent")
            .long("silent")
            .help("Suppresses all log output")
        )
}

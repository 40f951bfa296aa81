use clap::Parser;
use judgebox::cli::{run, Cli};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("judgebox: {e:#}");
            std::process::exit(74);
        }
    }
}

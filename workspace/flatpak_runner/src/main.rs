use cli::cli::run_cli;

fn main() {
    match run_cli() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Failed to run: {}", err);
            std::process::exit(1);
        }
    }
}

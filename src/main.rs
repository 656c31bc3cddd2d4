// src/main.rs

use buildpool::{cli, exit_on_failure, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("buildpool error: {err:?}");
        std::process::exit(1);
    }

    let code = exit_on_failure(run(args).await);
    std::process::exit(code);
}

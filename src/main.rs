use factory_runner::cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    factory_runner::init();

    match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

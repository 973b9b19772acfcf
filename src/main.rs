use cassandra_loader::{do_main, error::DataLoadingError, loader::TcpDataLoader, RunStatus};

#[tokio::main]
async fn main() -> Result<(), DataLoadingError> {
    env_logger::init();
    let loader = TcpDataLoader::default();
    let status = do_main(std::env::args_os().skip(1), &loader, &mut std::io::stdout()).await?;
    if status == RunStatus::Rejected {
        std::process::exit(status.exit_code());
    }
    Ok(())
}

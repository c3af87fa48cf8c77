#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizmaster::run_worker().await {
        eprintln!("quizmaster-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

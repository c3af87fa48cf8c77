#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizmaster::run().await {
        eprintln!("quizmaster fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

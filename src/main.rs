#[tokio::main]
async fn main() {
    if let Err(e) = hillcrest_lib::run().await {
        eprintln!("hillcrest: {e}");
        std::process::exit(1);
    }
}

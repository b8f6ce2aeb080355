#[tokio::main]
async fn main() {
    let code = reposec::app::startup::startup().await;
    std::process::exit(code);
}

#[tokio::main]
async fn main() {
    bitvote_consensus::start(std::env::args()).await;
}

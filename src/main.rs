#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fieldsafe_lib::run().await
}

use anyhow::Result;

fn main() -> Result<()> {
    rendverify::cli::run()
}

use anyhow::Result;

fn main() -> Result<()> {
    navgate_cli::cli::app::run()
}

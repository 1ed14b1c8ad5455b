fn main() -> anyhow::Result<()> {
    misc_income_sync_cli::run(std::env::args())
}

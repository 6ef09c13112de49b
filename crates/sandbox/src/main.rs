fn main() -> anyhow::Result<()> {
    sandbox::cli::run()
}

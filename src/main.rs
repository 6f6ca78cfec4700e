use clap::Parser;
use cmdflow::app::{handle_fatal_error, init_logging, AppConfig};
use cmdflow::cli::{execute_command, Cli, CliContext};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = run(cli).await {
        handle_fatal_error(e, verbose);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let app = AppConfig::new(cli.verbose)?;
    let ctx = CliContext::load(app, cli.data_dir).await?;
    init_logging(&ctx.app);
    execute_command(cli.command, &ctx).await
}

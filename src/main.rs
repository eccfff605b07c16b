use clap::Parser;
use qvault::cli::{commands, output, Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qvault=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Set {
            ref key,
            ref value,
            value_type,
        } => commands::set::execute(&cli, key, value.as_deref(), value_type),
        Commands::Get { ref key } => commands::get::execute(&cli, key),
        Commands::Remove { ref key } => commands::remove::execute(&cli, key),
        Commands::List => commands::list::execute(&cli),
        Commands::Clear { force } => commands::clear::execute(&cli, force),
        Commands::Passwd => commands::passwd::execute(&cli),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

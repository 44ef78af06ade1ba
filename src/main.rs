fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = nlscrape::cli::Args::parse();
    nlscrape::logging::init(args.log_level());
    if let Err(e) = nlscrape::cli::run(&args) {
        tracing::error!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                tracing::error!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}

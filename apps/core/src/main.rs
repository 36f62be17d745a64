fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match quicksearch_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("[quicksearch-core] {error}");
            std::process::exit(2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("[quicksearch-core] failed to start async runtime: {error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = runtime.block_on(quicksearch_core::runtime::run_with_options(options)) {
        eprintln!("[quicksearch-core] runtime failed: {error}");
        std::process::exit(1);
    }
}

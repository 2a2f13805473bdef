//! reconcile — command-line driver for two-party set/string reconciliation.

use anyhow::Result;

mod cmd;

use cmd::args::SessionArgs;

fn print_usage() {
    println!("Usage: reconcile <command> [options]");
    println!();
    println!("Commands");
    println!("  server --port <port> [options]  Listen for one peer and sync");
    println!("  client --port <port> [options]  Connect to a listening peer and sync");
    println!("  version                         Print the crate version");
    println!("  help                            Show this message");
    println!();
    println!("Options");
    println!("  --host <addr>                   Address to bind/connect to (default: 127.0.0.1)");
    println!("  --port <port>                   TCP port (default from config, see RECONCILE_CONFIG)");
    println!("  --algorithm <rcds|iblt|full>     Reconciliation algorithm (default: full)");
    println!("  --symmetric-diff <n>            Expected symmetric set difference (iblt/rcds)");
    println!("  --table-size-constant <f>        IBLT table size multiplier (default: 2.5)");
    println!("  --max-retry <n>                  IBLT decode retry-escalation attempts (default: 0)");
    println!("  --chunk-h <n>                    RCDS chunker look-ahead/behind distance");
    println!("  --chunk-r <n>                    RCDS chunker rolling window width (default: 4)");
    println!("  --chunk-hs <n>                   RCDS chunker hash space (default: 1024)");
    println!("  --freeze-local                   Don't adopt the remote's additions this session");
    println!("  --input <path>                   RCDS: file to read as the local string");
    println!("                                   full/iblt: newline-delimited elements to seed the set");
    println!();
    println!("Examples:");
    println!("  reconcile server --port 9001 --algorithm full --input seed.txt");
    println!("  reconcile client --host 10.0.0.2 --port 9001 --algorithm full --input seed.txt");
    println!("  reconcile server --port 9002 --algorithm iblt --symmetric-diff 20 --input a.txt");
    println!("  reconcile client --port 9002 --algorithm rcds --chunk-h 4 --chunk-r 3 --input b.txt");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let result = match args.first().map(String::as_str) {
        Some("server") => match SessionArgs::parse(&args[1..]) {
            Ok(opts) => cmd::server::run(opts).await,
            Err(e) => Err(e),
        },
        Some("client") => match SessionArgs::parse(&args[1..]) {
            Ok(opts) => cmd::client::run(opts).await,
            Err(e) => Err(e),
        },
        Some("version") => {
            println!("reconcile {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some("help") | Some("--help") | Some("-h") | None => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }

    Ok(())
}

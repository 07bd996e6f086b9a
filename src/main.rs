//! Command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Parser;

use tiny_serve::{Server, ServerConfig};

/// Minimal sandboxed HTTP/1.1 GET file server
#[derive(Debug, Parser)]
#[command(name = "tiny-serve", version, about)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    addr: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 80)]
    port: u16,

    /// Directory files are served from
    #[arg(short, long, default_value = "./root")]
    root: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    let addr = match format!("{}:{}", args.addr, args.port).parse() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("error: invalid address \"{}\": {err}", args.addr);
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig {
        addr,
        document_root: args.root,
        ..ServerConfig::default()
    };

    let mut server = match Server::new(&config) {
        Ok(server) => server,
        Err(err) => {
            eprintln!(
                "error: could not serve {} on {}: {err}",
                config.document_root.display(),
                config.addr
            );
            return ExitCode::FAILURE;
        }
    };

    println!(
        "[document root: '{}' -- addr: '{}' -- ready]",
        server.config().document_root.display(),
        config.addr
    );

    while server.is_running() {
        server.accept();
        thread::sleep(config.poll_interval);
    }

    println!("exiting...");
    ExitCode::SUCCESS
}

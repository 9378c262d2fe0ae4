use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use chrono_tz::Tz;
use events_ics::config::{parse_time_zone, DEFAULT_PRODUCT_ID, DEFAULT_TIME_ZONE};
use getopts::Options;
use tokio::time::Duration;

const DEFAULT_EXPORT_LIMIT: usize = 500;

#[derive(Debug)]
pub struct Args {
    pub address: SocketAddr,
    pub enable_cache: bool,
    pub cache_ttl: Duration,
    pub time_zone: Tz,
    pub product_id: String,
    pub export_dir: Option<PathBuf>,
    pub export_limit: usize,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optflag(
        "c",
        "enable-cache",
        "Enable caching of fetched events [Default: false]",
    );
    opts.optopt(
        "t",
        "cache-ttl",
        "Time-to-live for cached events [Default: 600]",
        "SECONDS",
    );
    opts.optopt(
        "z",
        "time-zone",
        "Zone for event dates and times [Default: Europe/Berlin]",
        "IANA_NAME",
    );
    opts.optopt(
        "p",
        "product-id",
        concat!("PRODID of generated calendars [Default: -//", env!("CARGO_PKG_NAME"), "//DE]"),
        "PRODID",
    );
    opts.optopt(
        "e",
        "export",
        "Write upcoming events as .ics files into DIRECTORY and exit",
        "DIRECTORY",
    );
    opts.optopt(
        "l",
        "export-limit",
        "Maximum number of events to export [Default: 500]",
        "COUNT",
    );
    opts
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    match try_parse(&opts, args) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
            process::exit(0);
        }
        Err(message) => {
            eprintln!("{message}");
            process::exit(1);
        }
    }
}

/// `Ok(None)` means help was requested.
fn try_parse(opts: &Options, args: Vec<String>) -> Result<Option<Args>, String> {
    let matches = opts.parse(args).map_err(|fail| fail.to_string())?;

    if matches.opt_present("help") {
        return Ok(None);
    }

    let address = matches
        .opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
        .map_err(|err| format!("Provided value for option 'address' is invalid: {err}"))?;

    let enable_cache = matches.opt_present("enable-cache");

    let cache_ttl = matches
        .opt_get_default("cache-ttl", 600)
        .map(Duration::from_secs)
        .map_err(|err| format!("Provided value for option 'cache-ttl' is invalid: {err}"))?;

    let time_zone = match matches.opt_str("time-zone") {
        Some(name) => parse_time_zone(&name).map_err(|err| err.to_string())?,
        None => DEFAULT_TIME_ZONE,
    };

    let product_id = matches
        .opt_str("product-id")
        .unwrap_or_else(|| DEFAULT_PRODUCT_ID.to_string());

    let export_dir = matches.opt_str("export").map(PathBuf::from);

    let export_limit = matches
        .opt_get_default("export-limit", DEFAULT_EXPORT_LIMIT)
        .map_err(|err| format!("Provided value for option 'export-limit' is invalid: {err}"))?;

    Ok(Some(Args {
        address,
        enable_cache,
        cache_ttl,
        time_zone,
        product_id,
        export_dir,
        export_limit,
    }))
}

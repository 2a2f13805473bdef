//! Hand-rolled flag parsing for `server`/`client`, mirroring
//! `summit-ctl::main`'s `Vec<String>` scan rather than pulling in a crate.
//!
//! Defaults come from [`ReconcileConfig`] (env vars → config file →
//! built-in defaults); a flag on the command line always wins over
//! whatever the config resolved to.

use anyhow::{bail, Context, Result};
use reconcile_core::config::ReconcileConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Full,
    Iblt,
    Rcds,
}

impl Algorithm {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Algorithm::Full),
            "iblt" => Ok(Algorithm::Iblt),
            "rcds" => Ok(Algorithm::Rcds),
            other => bail!("unknown algorithm {other:?}, expected rcds, iblt, or full"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionArgs {
    pub host: String,
    pub port: u16,
    pub algorithm: Algorithm,
    pub symmetric_diff: usize,
    pub table_size_constant: f64,
    pub max_retry: u32,
    pub chunk_h: usize,
    pub chunk_r: usize,
    pub chunk_hs: u64,
    pub freeze_local: bool,
    pub input: Option<String>,
}

impl SessionArgs {
    /// Parse the flags following `server`/`client` on the command line,
    /// layered over [`ReconcileConfig::load`]'s resolved defaults.
    pub fn parse(args: &[String]) -> Result<Self> {
        let config = ReconcileConfig::load().context("loading reconcile config")?;

        let mut host = config.network.host.clone();
        let mut port = Some(config.network.port);
        let mut algorithm = Algorithm::Full;
        let mut symmetric_diff = 0usize;
        let mut table_size_constant = config.iblt.table_size_constant;
        let mut max_retry = config.iblt.max_sync_retry;
        let mut chunk_h = config.chunker.h;
        let mut chunk_r = config.chunker.r;
        let mut chunk_hs = config.chunker.hash_space;
        let mut freeze_local = false;
        let mut input = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--host" => {
                    i += 1;
                    host = args.get(i).context("--host requires a value")?.clone();
                }
                "--port" => {
                    i += 1;
                    port = Some(
                        args.get(i)
                            .context("--port requires a value")?
                            .parse::<u16>()
                            .context("--port must be a number between 1 and 65535")?,
                    );
                }
                "--algorithm" => {
                    i += 1;
                    algorithm =
                        Algorithm::parse(args.get(i).context("--algorithm requires a value")?)?;
                }
                "--symmetric-diff" => {
                    i += 1;
                    symmetric_diff = args
                        .get(i)
                        .context("--symmetric-diff requires a value")?
                        .parse()
                        .context("--symmetric-diff must be a number")?;
                }
                "--table-size-constant" => {
                    i += 1;
                    table_size_constant = args
                        .get(i)
                        .context("--table-size-constant requires a value")?
                        .parse()
                        .context("--table-size-constant must be a number")?;
                }
                "--max-retry" => {
                    i += 1;
                    max_retry = args
                        .get(i)
                        .context("--max-retry requires a value")?
                        .parse()
                        .context("--max-retry must be a number")?;
                }
                "--chunk-h" => {
                    i += 1;
                    chunk_h = args
                        .get(i)
                        .context("--chunk-h requires a value")?
                        .parse()
                        .context("--chunk-h must be a number")?;
                }
                "--chunk-r" => {
                    i += 1;
                    chunk_r = args
                        .get(i)
                        .context("--chunk-r requires a value")?
                        .parse()
                        .context("--chunk-r must be a number")?;
                }
                "--chunk-hs" => {
                    i += 1;
                    chunk_hs = args
                        .get(i)
                        .context("--chunk-hs requires a value")?
                        .parse()
                        .context("--chunk-hs must be a number")?;
                }
                "--freeze-local" => {
                    freeze_local = true;
                }
                "--input" => {
                    i += 1;
                    input = Some(args.get(i).context("--input requires a path")?.clone());
                }
                other => bail!("unknown option: {other}"),
            }
            i += 1;
        }

        Ok(SessionArgs {
            host,
            port: port.expect("seeded from config default above"),
            algorithm,
            symmetric_diff,
            table_size_constant,
            max_retry,
            chunk_h,
            chunk_r,
            chunk_hs,
            freeze_local,
            input,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

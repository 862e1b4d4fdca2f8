use crate::filter::{DEFAULT_QUERY_CONCURRENCY, FilterOptions, MalformedPolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "varsieve")]
#[command(version)]
#[command(about = "Filter VCF files against genomic interval lists")]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Filter one VCF (or a BGZF VCF and its .tbi) against an interval list
    Filter(FilterArgs),
    /// Serve filtering over HTTP
    Serve(ServeArgs),
}

/// Options shared by both subcommands
#[derive(Debug, Clone, Args)]
pub struct FilterFlags {
    /// What to do with malformed interval or variant lines
    #[arg(long, value_enum, env = "VARSIEVE_ON_MALFORMED", default_value = "skip")]
    pub on_malformed: MalformedPolicy,

    /// Fail if either input is not sorted by chromosome, then position
    #[arg(long)]
    pub check_sorted: bool,

    /// Timeout in seconds for the indexed region queries (0 disables)
    #[arg(long, env = "VARSIEVE_REGION_TIMEOUT", default_value = "300")]
    pub region_timeout: u64,

    /// Maximum indexed region queries in flight (each holds a file handle)
    #[arg(long, env = "VARSIEVE_QUERY_CONCURRENCY", default_value_t = DEFAULT_QUERY_CONCURRENCY)]
    pub query_concurrency: usize,
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Interval list: local path or http(s) URL
    #[arg(short, long)]
    pub intervals: String,

    /// Variant file(s): one .vcf, or a .vcf.gz and its .tbi
    #[arg(required = true, num_args = 1..=2)]
    pub variants: Vec<PathBuf>,

    /// Output file (default: <variant file name>.filtered.vcf in --out-dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the derived output name
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Maximum interval list size in bytes
    #[arg(long, env = "VARSIEVE_MAX_INTERVALS", default_value = "104857600")]
    pub max_interval_bytes: u64,

    #[command(flatten)]
    pub flags: FilterFlags,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "VARSIEVE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "VARSIEVE_PORT", default_value = "8080")]
    pub port: u16,

    /// Directory containing variant datasets
    #[arg(long, env = "VARSIEVE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Enable CORS for all origins
    #[arg(long, env = "VARSIEVE_CORS", default_value = "true")]
    pub cors: bool,

    /// Maximum payload size in bytes (request body and filtered response)
    #[arg(long, env = "VARSIEVE_MAX_PAYLOAD", default_value = "10485760")]
    pub max_payload: usize,

    #[command(flatten)]
    pub flags: FilterFlags,
}

impl FilterFlags {
    pub fn region_timeout(&self) -> Option<Duration> {
        (self.region_timeout > 0).then(|| Duration::from_secs(self.region_timeout))
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            on_malformed: self.on_malformed,
            check_sorted: self.check_sorted,
            region_timeout: self.region_timeout(),
            query_concurrency: self.query_concurrency,
        }
    }
}

impl ServeArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FilterArgs {
    /// Where the filtered artifact is written.
    pub fn output_path(&self, input_name: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.out_dir.join(crate::sink::output_name(input_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_defaults() {
        let config = Config::parse_from([
            "varsieve",
            "filter",
            "--intervals",
            "regions.bed",
            "sample.vcf",
        ]);
        let Command::Filter(args) = config.command else {
            panic!("expected filter subcommand");
        };
        assert_eq!(args.variants, vec![PathBuf::from("sample.vcf")]);
        assert_eq!(args.flags.on_malformed, MalformedPolicy::Skip);
        assert!(!args.flags.check_sorted);
        assert_eq!(args.flags.region_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(args.flags.query_concurrency, DEFAULT_QUERY_CONCURRENCY);
        assert_eq!(
            args.output_path("sample.vcf"),
            PathBuf::from("./sample.vcf.filtered.vcf")
        );
    }

    #[test]
    fn test_parse_filter_indexed_pair_and_flags() {
        let config = Config::parse_from([
            "varsieve",
            "filter",
            "-i",
            "http://example.com/last.bed",
            "s.vcf.gz",
            "s.vcf.gz.tbi",
            "--on-malformed",
            "halt",
            "--check-sorted",
            "--region-timeout",
            "0",
            "--query-concurrency",
            "8",
            "-o",
            "out.vcf",
        ]);
        let Command::Filter(args) = config.command else {
            panic!("expected filter subcommand");
        };
        assert_eq!(args.variants.len(), 2);
        let options = args.flags.filter_options();
        assert_eq!(options.on_malformed, MalformedPolicy::Halt);
        assert!(options.check_sorted);
        assert_eq!(options.region_timeout, None);
        assert_eq!(options.query_concurrency, 8);
        assert_eq!(args.output_path("s.vcf.gz"), PathBuf::from("out.vcf"));
    }

    #[test]
    fn test_filter_rejects_three_variant_files() {
        let result = Config::try_parse_from([
            "varsieve", "filter", "-i", "r.bed", "a.vcf", "b.vcf", "c.vcf",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_bind_addr() {
        let config = Config::parse_from(["varsieve", "serve", "--host", "localhost", "-p", "3000"]);
        let Command::Serve(args) = config.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.bind_addr(), "localhost:3000");
        assert_eq!(args.max_payload, 10485760);
    }
}

pub mod config;
pub mod coords;
pub mod error;
pub mod filter;
pub mod formats;
pub mod handlers;
pub mod input;
pub mod intervals;
pub mod remote;
pub mod sink;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use filter::{FilterOptions, FilterReport, MalformedPolicy, filter_input};
pub use input::VariantInput;
pub use intervals::IntervalList;

use std::ffi::OsString;
use std::io::Write;

use log::{debug, info};

pub mod error;
pub mod loader;
pub mod options;

use error::DataLoadingError;
use loader::{validate, DataLoader};
use options::{parse_command_line, usage};

/// How a run ended when nothing fatal happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The load call returned normally.
    Submitted,
    /// Usage was printed and nothing was loaded.
    Rejected,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Submitted => 0,
            RunStatus::Rejected => 1,
        }
    }
}

/// Writes the optional message line followed by the usage text.
pub fn print_usage(out: &mut impl Write, message: Option<&str>) -> std::io::Result<()> {
    if let Some(message) = message {
        writeln!(out, "{message}")?;
    }
    write!(out, "{}", usage())?;
    out.flush()
}

/// Parses and validates `args`, then issues exactly one load through
/// `loader`. Anything caught before the load is reported on `out`; errors
/// from the load itself are returned as-is.
pub async fn do_main<I, T, L, W>(
    args: I,
    loader: &L,
    out: &mut W,
) -> Result<RunStatus, DataLoadingError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    L: DataLoader + ?Sized,
    W: Write,
{
    let request = match parse_command_line(args).and_then(|parsed| {
        debug!("Parsed options: {:?}", parsed);
        validate(&parsed)
    }) {
        Ok(request) => request,
        Err(err) => {
            debug!("Rejected command line: {:?}", err);
            print_usage(out, err.message().as_deref())?;
            return Ok(RunStatus::Rejected);
        }
    };

    let address = request.address();
    info!(
        "Loading {:?} into cluster {:?} at {}",
        request.file, request.cluster_name, address
    );
    loader
        .load(
            &address,
            &request.cluster_name,
            &request.dataset(),
            &request.loading_options(),
        )
        .await?;
    Ok(RunStatus::Submitted)
}

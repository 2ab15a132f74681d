use clap::Parser;

use super::ProbeArgs;
use crate::error::{AppError, AppResult};

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<ProbeArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    ProbeArgs::try_parse_from(args).map_err(AppError::from)
}

use clap::Parser;

use crate::error::{AppError, AppResult};

use super::ApimonArgs;

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<ApimonArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    ApimonArgs::try_parse_from(args).map_err(AppError::from)
}

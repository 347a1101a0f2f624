//! # Extension Core Module
//!
//! SQL surface of the table detector: the `detect_tables` and
//! `detect_tables_report` table functions plus the decoding of their
//! parameters into a [`DetectorConfig`].
use crate::bridge::ValueBridge;
use crate::detection::config::DetectorConfig;
use crate::error::RustyTablesError;
use crate::extension::ExtensionError::InvalidParameter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use thiserror::Error;

pub(crate) mod detect_tables;
pub(crate) mod detect_tables_report;
mod writer;

/// Errors raised while decoding table function parameters.
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// Invalid parameter provided to a table function
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },
}

fn invalid_parameter(name: &str, message: String) -> RustyTablesError {
    RustyTablesError::ExtensionError(InvalidParameter {
        name: name.to_string(),
        message,
    })
}

/// Trait for handling named parameters in DuckDB table functions.
///
/// # Type Parameters
///
/// * `T` - The type of the parameter value
pub(crate) trait NamedParam<T> {
    /// Returns the parameter name as used in SQL
    fn name() -> &'static str;

    /// Returns the DuckDB logical type for this parameter
    fn kind() -> LogicalTypeHandle;

    /// Returns the complete parameter definition (name and type)
    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_string(), Self::kind())
    }

    /// Extracts the parameter value from bind information;
    /// `None` when the parameter was not given
    fn read(bind: &BindInfo) -> Result<Option<T>, RustyTablesError>;
}

/// Workbook path or URL, the only positional parameter
pub(crate) struct PathParam;

/// `eps_range := [lower, upper]`
pub(crate) struct EpsRangeParam;

/// `min_samples_range := [lower, upper]`
pub(crate) struct MinSamplesRangeParam;

/// `verbose := true` logs the detection narration
pub(crate) struct VerboseParam;

/// `time_budget_ms := 500` bounds the search time per sheet
pub(crate) struct TimeBudgetParam;

impl PathParam {
    pub(crate) fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    pub(crate) fn read(bind: &BindInfo, index: u64) -> Result<String, RustyTablesError> {
        let path = bind.get_parameter(index).to_varchar();
        if path.trim().is_empty() {
            return Err(invalid_parameter("path", "workbook path is empty".to_string()));
        }
        Ok(path)
    }
}

/// Reads a two-element list as `(lower, upper)`.
fn read_pair<T>(name: &str, values: Vec<T>) -> Result<(T, T), RustyTablesError> {
    let count = values.len();
    let mut values = values.into_iter();
    match (values.next(), values.next(), values.next()) {
        (Some(lower), Some(upper), None) => Ok((lower, upper)),
        _ => Err(invalid_parameter(
            name,
            format!("expected a list of 2 values, got {count}"),
        )),
    }
}

impl NamedParam<(f64, f64)> for EpsRangeParam {
    fn name() -> &'static str {
        "eps_range"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::list(&LogicalTypeHandle::from(LogicalTypeId::Double))
    }

    fn read(bind: &BindInfo) -> Result<Option<(f64, f64)>, RustyTablesError> {
        let Some(value) = bind.get_named_parameter(Self::name()) else {
            return Ok(None);
        };
        let values = value.to_list().iter().map(|item| item.to_double()).collect();
        Ok(Some(read_pair(Self::name(), values)?))
    }
}

impl NamedParam<(usize, usize)> for MinSamplesRangeParam {
    fn name() -> &'static str {
        "min_samples_range"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::list(&LogicalTypeHandle::from(LogicalTypeId::Integer))
    }

    fn read(bind: &BindInfo) -> Result<Option<(usize, usize)>, RustyTablesError> {
        let Some(value) = bind.get_named_parameter(Self::name()) else {
            return Ok(None);
        };
        let values = value
            .to_list()
            .iter()
            .map(|item| {
                let number = item.to_int64();
                usize::try_from(number)
                    .map_err(|_| invalid_parameter(Self::name(), format!("{number} is negative")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(read_pair(Self::name(), values)?))
    }
}

impl NamedParam<bool> for VerboseParam {
    fn name() -> &'static str {
        "verbose"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Boolean)
    }

    fn read(bind: &BindInfo) -> Result<Option<bool>, RustyTablesError> {
        Ok(bind.get_named_parameter(Self::name()).map(|value| value.to_bool()))
    }
}

impl NamedParam<u64> for TimeBudgetParam {
    fn name() -> &'static str {
        "time_budget_ms"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Bigint)
    }

    fn read(bind: &BindInfo) -> Result<Option<u64>, RustyTablesError> {
        let Some(value) = bind.get_named_parameter(Self::name()) else {
            return Ok(None);
        };
        let milliseconds = value.to_int64();
        let milliseconds = u64::try_from(milliseconds)
            .map_err(|_| invalid_parameter(Self::name(), format!("{milliseconds} is negative")))?;
        Ok(Some(milliseconds))
    }
}

/// Named parameter definitions shared by both table functions.
pub(crate) fn named_parameters() -> Vec<(String, LogicalTypeHandle)> {
    vec![
        EpsRangeParam::definition(),
        MinSamplesRangeParam::definition(),
        VerboseParam::definition(),
        TimeBudgetParam::definition(),
    ]
}

/// Builds the detector configuration from the named parameters, keeping the
/// defaults for anything not given.
pub(crate) fn config_from_bind(bind: &BindInfo) -> Result<DetectorConfig, RustyTablesError> {
    let mut config = DetectorConfig::default();
    if let Some(eps_range) = EpsRangeParam::read(bind)? {
        config.eps_range = eps_range;
    }
    if let Some(min_samples_range) = MinSamplesRangeParam::read(bind)? {
        config.min_samples_range = min_samples_range;
    }
    if let Some(verbose) = VerboseParam::read(bind)? {
        config.verbose = verbose;
    }
    if let Some(time_budget_ms) = TimeBudgetParam::read(bind)? {
        config.time_budget_ms = Some(time_budget_ms);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_need_exactly_two_values() {
        assert_eq!(read_pair("eps_range", vec![1.0, 2.0]).unwrap(), (1.0, 2.0));
        let error = read_pair("eps_range", vec![1.0]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid parameter 'eps_range': expected a list of 2 values, got 1"
        );
        assert!(read_pair("min_samples_range", vec![2, 3, 4]).is_err());
        assert!(read_pair::<usize>("min_samples_range", Vec::new()).is_err());
    }
}

//! The crate-wide error type.
//!
//! We follow the convention of wrapping an internal kind-enum so that the
//! publicly visible type stays opaque (the jiff crate has a good discussion
//! of the trade-offs). The internal crate reports `&'static str` errors;
//! constructors here wrap those rather than redefining every message.

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug)]
enum ErrorKind {
    /// An error produced when an argument is rejected up front (wraps the
    /// message strings produced within `cloudstat_nostd_internal`)
    InvalidInput(InvalidInputError),
    /// An error that occurs when an unknown statistic name is specified
    StatName(StatNameError),
    /// An error about the presence/absence of histogram bucket edges
    BucketEdges(BucketEdgesError),
    /// An error for a numeric knob (worker count, moment order) that falls
    /// outside its supported range
    ParamRange(ParamRangeError),
    /// An error that occurs when a caller-provided output buffer doesn't
    /// have the advertised length
    BufferSize(BufferSizeError),
}

// define constructor methods for Error
impl Error {
    /// wrap a message describing a rejected argument
    pub(crate) fn invalid_input(message: &'static str) -> Self {
        Error {
            kind: ErrorKind::InvalidInput(InvalidInputError(message)),
        }
    }

    /// produce an error indicating that an unknown statistic was requested
    pub(crate) fn stat_name(actual: String, choices: Vec<String>) -> Self {
        Error {
            kind: ErrorKind::StatName(StatNameError { actual, choices }),
        }
    }

    /// produce an error about histogram bucket edges (`required` indicates
    /// whether the statistic needs them and they were missing, or the
    /// reverse)
    pub(crate) fn bucket_edges(stat_name: String, required: bool) -> Self {
        Error {
            kind: ErrorKind::BucketEdges(BucketEdgesError {
                stat_name,
                required,
            }),
        }
    }

    /// produce an error for a numeric knob outside its supported range
    pub(crate) fn param_range(param: &'static str, value: i64, min: i64, max: i64) -> Self {
        Error {
            kind: ErrorKind::ParamRange(ParamRangeError {
                param,
                value,
                min,
                max,
            }),
        }
    }

    /// produce an error indicating that an output buffer has the wrong size
    pub(crate) fn buffer_size(description: &'static str, actual: usize, expected: usize) -> Self {
        Error {
            kind: ErrorKind::BufferSize(BufferSizeError {
                description,
                actual,
                expected,
            }),
        }
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.kind.fmt(f)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::InvalidInput(ref err) => err.fmt(f),
            ErrorKind::StatName(ref err) => err.fmt(f),
            ErrorKind::BucketEdges(ref err) => err.fmt(f),
            ErrorKind::ParamRange(ref err) => err.fmt(f),
            ErrorKind::BufferSize(ref err) => err.fmt(f),
        }
    }
}

#[derive(Clone, Debug)]
struct InvalidInputError(&'static str);

impl core::fmt::Display for InvalidInputError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Debug)]
struct StatNameError {
    actual: String,
    choices: Vec<String>,
}

impl core::fmt::Display for StatNameError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} is not a known statistic. Choices include: {:?} as well as \
             omomentK/weightedomomentK for integer K >= 1",
            self.actual, self.choices
        )
    }
}

#[derive(Clone, Debug)]
struct BucketEdgesError {
    stat_name: String,
    required: bool,
}

impl core::fmt::Display for BucketEdgesError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.required {
            write!(
                f,
                "the '{}' statistic requires histogram bucket edges",
                self.stat_name
            )
        } else {
            write!(
                f,
                "the '{}' statistic doesn't accept histogram bucket edges",
                self.stat_name
            )
        }
    }
}

#[derive(Clone, Debug)]
struct ParamRangeError {
    param: &'static str,
    value: i64,
    min: i64,
    max: i64,
}

impl core::fmt::Display for ParamRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} = {} falls outside the supported range {}..={}",
            self.param, self.value, self.min, self.max
        )
    }
}

#[derive(Clone, Debug)]
struct BufferSizeError {
    description: &'static str,
    actual: usize,
    expected: usize,
}

impl core::fmt::Display for BufferSizeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} holds {} elements, but {} are required",
            self.description, self.actual, self.expected
        )
    }
}

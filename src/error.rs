//! Standard error and status types for `oclw`.

use std::fmt;

use crate::types::InfoQuery;

/// `oclw` result type.
pub type Result<T> = ::std::result::Result<T, Error>;

macro_rules! cl_status {
    ($($name:ident = $code:expr,)+) => {
        /// An OpenCL API status code.
        ///
        /// Everything other than `CL_SUCCESS` is treated as an error by this
        /// crate; no call is retried.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum Status {
            $($name = $code,)+
        }

        impl num_traits::FromPrimitive for Status {
            fn from_i64(code: i64) -> Option<Status> {
                match code {
                    $($code => Some(Status::$name),)+
                    _ => None,
                }
            }

            fn from_u64(code: u64) -> Option<Status> {
                Status::from_i64(code as i64)
            }
        }
    };
}

cl_status! {
    CL_SUCCESS = 0,
    CL_DEVICE_NOT_FOUND = -1,
    CL_DEVICE_NOT_AVAILABLE = -2,
    CL_COMPILER_NOT_AVAILABLE = -3,
    CL_MEM_OBJECT_ALLOCATION_FAILURE = -4,
    CL_OUT_OF_RESOURCES = -5,
    CL_OUT_OF_HOST_MEMORY = -6,
    CL_PROFILING_INFO_NOT_AVAILABLE = -7,
    CL_MEM_COPY_OVERLAP = -8,
    CL_IMAGE_FORMAT_MISMATCH = -9,
    CL_IMAGE_FORMAT_NOT_SUPPORTED = -10,
    CL_BUILD_PROGRAM_FAILURE = -11,
    CL_MAP_FAILURE = -12,
    CL_MISALIGNED_SUB_BUFFER_OFFSET = -13,
    CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST = -14,
    CL_COMPILE_PROGRAM_FAILURE = -15,
    CL_LINKER_NOT_AVAILABLE = -16,
    CL_LINK_PROGRAM_FAILURE = -17,
    CL_DEVICE_PARTITION_FAILED = -18,
    CL_KERNEL_ARG_INFO_NOT_AVAILABLE = -19,
    CL_INVALID_VALUE = -30,
    CL_INVALID_DEVICE_TYPE = -31,
    CL_INVALID_PLATFORM = -32,
    CL_INVALID_DEVICE = -33,
    CL_INVALID_CONTEXT = -34,
    CL_INVALID_QUEUE_PROPERTIES = -35,
    CL_INVALID_COMMAND_QUEUE = -36,
    CL_INVALID_HOST_PTR = -37,
    CL_INVALID_MEM_OBJECT = -38,
    CL_INVALID_IMAGE_FORMAT_DESCRIPTOR = -39,
    CL_INVALID_IMAGE_SIZE = -40,
    CL_INVALID_SAMPLER = -41,
    CL_INVALID_BINARY = -42,
    CL_INVALID_BUILD_OPTIONS = -43,
    CL_INVALID_PROGRAM = -44,
    CL_INVALID_PROGRAM_EXECUTABLE = -45,
    CL_INVALID_KERNEL_NAME = -46,
    CL_INVALID_KERNEL_DEFINITION = -47,
    CL_INVALID_KERNEL = -48,
    CL_INVALID_ARG_INDEX = -49,
    CL_INVALID_ARG_VALUE = -50,
    CL_INVALID_ARG_SIZE = -51,
    CL_INVALID_KERNEL_ARGS = -52,
    CL_INVALID_WORK_DIMENSION = -53,
    CL_INVALID_WORK_GROUP_SIZE = -54,
    CL_INVALID_WORK_ITEM_SIZE = -55,
    CL_INVALID_GLOBAL_OFFSET = -56,
    CL_INVALID_EVENT_WAIT_LIST = -57,
    CL_INVALID_EVENT = -58,
    CL_INVALID_OPERATION = -59,
    CL_INVALID_GL_OBJECT = -60,
    CL_INVALID_BUFFER_SIZE = -61,
    CL_INVALID_MIP_LEVEL = -62,
    CL_INVALID_GLOBAL_WORK_SIZE = -63,
    CL_INVALID_PROPERTY = -64,
    CL_INVALID_IMAGE_DESCRIPTOR = -65,
    CL_INVALID_COMPILER_OPTIONS = -66,
    CL_INVALID_LINKER_OPTIONS = -67,
    CL_INVALID_DEVICE_PARTITION_COUNT = -68,
    CL_PLATFORM_NOT_FOUND_KHR = -1001,
}

impl Status {
    /// Converts a raw status code returned by the native API.
    ///
    /// Unknown codes (vendor extensions this crate does not model) map to
    /// `None`; callers fold those into an `Api` error with the raw code in
    /// the message.
    pub fn from_code(code: i32) -> Option<Status> {
        num_traits::FromPrimitive::from_i64(i64::from(code))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as i32)
    }
}

/// An error surfaced by a native OpenCL API call.
///
/// Carries the translated status code along with the name of the native
/// function which produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{fn_name} => {status}")]
pub struct ApiError {
    status: Status,
    fn_name: &'static str,
}

impl ApiError {
    pub fn new(status: Status, fn_name: &'static str) -> ApiError {
        ApiError { status, fn_name }
    }

    /// Translates a raw error code, falling back to `CL_INVALID_VALUE` for
    /// codes outside the core set.
    pub fn from_code(code: i32, fn_name: &'static str) -> ApiError {
        let status = Status::from_code(code).unwrap_or(Status::CL_INVALID_VALUE);
        ApiError { status, fn_name }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn fn_name(&self) -> &'static str {
        self.fn_name
    }
}

/// An enum containing one of several error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A precondition violation: null/zero-count arguments and similar.
    #[error("invalid argument: {0}")]
    Args(&'static str),
    /// The native layer could not allocate backing storage.
    #[error("allocation failure: {0}")]
    Alloc(String),
    /// A native API call returned a non-success status.
    #[error("{0}")]
    Api(#[from] ApiError),
    /// The query key is legal for the wrapper kind but the underlying
    /// resource does not provide a value for it.
    #[error("information unavailable: {0:?}")]
    InfoUnavailable(InfoQuery),
    /// Size/type/kind mismatch in otherwise well-formed data.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// No OpenCL platform is available on this system.
    #[error("no OpenCL platform found")]
    PlatformNotFound,
    /// Device selection matched nothing.
    #[error("no matching OpenCL device found")]
    DeviceNotFound,
    /// Program build failure; contains the build log.
    #[error("program build failure:\n{0}")]
    ProgramBuild(String),
    /// Stream write / file open errors from reporting collaborators.
    #[error("{0}")]
    Io(#[from] ::std::io::Error),
    #[error("{0}")]
    FfiNul(#[from] ::std::ffi::NulError),
    #[error("{0}")]
    FromUtf8(#[from] ::std::string::FromUtf8Error),
}

impl Error {
    /// Returns the translated status code for `Api` variants.
    pub fn api_status(&self) -> Option<Status> {
        match *self {
            Error::Api(ref err) => Some(err.status()),
            _ => None,
        }
    }

    /// Returns `true` for the argument-precondition error kind.
    pub fn is_args(&self) -> bool {
        match *self {
            Error::Args(_) => true,
            _ => false,
        }
    }
}

/// Evaluates a raw status code returned by a native call, passing `result`
/// through untouched on `CL_SUCCESS`.
pub fn eval_errcode<T>(errcode: i32, result: T, fn_name: &'static str) -> Result<T> {
    if errcode == Status::CL_SUCCESS as i32 {
        Ok(result)
    } else {
        Err(ApiError::from_code(errcode, fn_name).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_raw_codes() {
        assert_eq!(Status::from_code(0), Some(Status::CL_SUCCESS));
        assert_eq!(Status::from_code(-30), Some(Status::CL_INVALID_VALUE));
        assert_eq!(Status::from_code(-1001), Some(Status::CL_PLATFORM_NOT_FOUND_KHR));
        assert_eq!(Status::from_code(-9999), None);
    }

    #[test]
    fn eval_errcode_translates_failures() {
        assert!(eval_errcode(0, 7usize, "clRetainContext").is_ok());
        let err = eval_errcode(-34, (), "clRetainContext").unwrap_err();
        assert_eq!(err.api_status(), Some(Status::CL_INVALID_CONTEXT));
    }
}

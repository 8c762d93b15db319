//! Error to errno mapping at the filesystem boundary

use common::fetch::FetchError;
use common::namespace::NamespaceError;
use common::stream::StreamError;

pub trait Errno {
    fn errno(&self) -> i32;
}

impl Errno for NamespaceError {
    fn errno(&self) -> i32 {
        match self {
            NamespaceError::NotFound(_) => libc::ENOENT,
            NamespaceError::AlreadyExists(_) => libc::EEXIST,
            NamespaceError::NotADirectory(_) => libc::ENOTDIR,
            NamespaceError::InvalidName(_) => libc::EINVAL,
        }
    }
}

impl Errno for FetchError {
    fn errno(&self) -> i32 {
        libc::EIO
    }
}

impl Errno for StreamError {
    fn errno(&self) -> i32 {
        match self {
            StreamError::NotFound(_) => libc::ENOENT,
            StreamError::Namespace(e) => e.errno(),
            StreamError::Fetch(e) => e.errno(),
            StreamError::InvalidItem(_) => libc::EIO,
            StreamError::AlreadyBound(_) => libc::EBUSY,
        }
    }
}

//! FUSE filesystem integration
//!
//! [`PhotoFs`] exposes the namespace tree read-only. Metadata operations
//! answer from memory; file reads are dispatched to the owning photo stream on
//! the tokio runtime, and the reply is sent from that task.

mod errno;
mod photo_fs;

use std::path::{Path, PathBuf};

use fuser::MountOption;

use crate::config::MountConfig;

pub use errno::Errno;
pub use photo_fs::PhotoFs;

pub const FS_NAME: &str = "flickrfs";

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("mount point {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to mount at {path:?}: {source}")]
    Mount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::RO,
        MountOption::FSName(FS_NAME.to_string()),
        MountOption::Subtype(FS_NAME.to_string()),
        MountOption::NoExec,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    if config.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }
    options
}

/// Mount `fs` at `mountpoint` on a background session thread
///
/// The filesystem stays mounted until the returned session is dropped.
pub fn spawn_mount(
    fs: PhotoFs,
    mountpoint: &Path,
    config: &MountConfig,
) -> Result<fuser::BackgroundSession, MountError> {
    if !mountpoint.is_dir() {
        return Err(MountError::NotADirectory(mountpoint.to_path_buf()));
    }

    tracing::info!(mountpoint = %mountpoint.display(), "mounting filesystem");
    fuser::spawn_mount2(fs, mountpoint, &mount_options(config)).map_err(|source| {
        MountError::Mount {
            path: mountpoint.to_path_buf(),
            source,
        }
    })
}

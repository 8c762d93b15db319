use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyOpen,
    Request,
};
use tokio::runtime::Handle;

use common::namespace::{Namespace, NodeId, NodeInfo, NodeKind};
use common::stream::PhotoStream;

use super::Errno;

const BLOCK_SIZE: u32 = 512;

/// Read-only FUSE view of a [`Namespace`]
pub struct PhotoFs {
    namespace: Arc<Namespace>,
    /// Streams whose directories hold readable files
    streams: Vec<Arc<PhotoStream>>,
    runtime: Handle,
    ttl: Duration,
    next_fh: AtomicU64,
}

impl PhotoFs {
    pub fn new(
        namespace: Arc<Namespace>,
        streams: Vec<Arc<PhotoStream>>,
        runtime: Handle,
        ttl: Duration,
    ) -> Self {
        Self {
            namespace,
            streams,
            runtime,
            ttl,
            next_fh: AtomicU64::new(1),
        }
    }

    /// The stream serving file node `ino`, with the file's name
    fn photo(&self, ino: u64) -> Result<(Arc<PhotoStream>, NodeInfo), i32> {
        let info = self
            .namespace
            .get(NodeId::from_raw(ino))
            .ok_or(libc::ENOENT)?;
        if info.kind.is_dir() {
            return Err(libc::EISDIR);
        }

        let stream = info
            .parent
            .and_then(|parent| self.streams.iter().find(|s| s.root() == parent))
            .ok_or(libc::ENOENT)?;
        Ok((stream.clone(), info))
    }
}

pub(super) fn file_attr(info: &NodeInfo) -> FileAttr {
    let attrs = info.attrs;
    let (kind, nlink) = match info.kind {
        NodeKind::Directory => (FileType::Directory, 2),
        NodeKind::File => (FileType::RegularFile, 1),
    };

    FileAttr {
        ino: info.id.as_u64(),
        size: attrs.size,
        blocks: attrs.size.div_ceil(BLOCK_SIZE as u64),
        atime: attrs.mtime,
        mtime: attrs.mtime,
        ctime: attrs.ctime,
        crtime: attrs.ctime,
        kind,
        perm: attrs.perm,
        nlink,
        uid: attrs.uid,
        gid: attrs.gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

pub(super) fn is_read_only(flags: i32) -> bool {
    flags & libc::O_ACCMODE == libc::O_RDONLY
}

fn file_type(kind: NodeKind) -> FileType {
    match kind {
        NodeKind::Directory => FileType::Directory,
        NodeKind::File => FileType::RegularFile,
    }
}

impl Filesystem for PhotoFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.namespace.lookup(NodeId::from_raw(parent), name) {
            Some(info) => reply.entry(&self.ttl, &file_attr(&info), 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.namespace.get(NodeId::from_raw(ino)) {
            Some(info) => reply.attr(&self.ttl, &file_attr(&info)),
            None => reply.error(libc::ENOENT),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let id = NodeId::from_raw(ino);
        let children = match self.namespace.children(id) {
            Ok(children) => children,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };
        let parent = self
            .namespace
            .get(id)
            .and_then(|info| info.parent)
            .unwrap_or(id);

        let mut entries: Vec<(u64, FileType, String)> = children
            .into_iter()
            .map(|(name, child, kind)| (child.as_u64(), file_type(kind), name))
            .collect();
        entries.push((ino, FileType::Directory, ".".to_string()));
        entries.push((parent.as_u64(), FileType::Directory, "..".to_string()));

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (entry_ino, kind, name)) in entries.iter().enumerate().skip(skip) {
            if reply.add(*entry_ino, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let (stream, info) = match self.photo(ino) {
            Ok(found) => found,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };
        if !is_read_only(flags) {
            reply.error(libc::EACCES);
            return;
        }

        if info.attrs.size == 0 {
            self.runtime.spawn(async move {
                if let Err(e) = stream.prefetch(&info.name).await {
                    tracing::debug!(file = %info.name, "size prefetch failed: {}", e);
                }
            });
        }

        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        reply.opened(fh, fuser::consts::FOPEN_DIRECT_IO);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        let (stream, info) = match self.photo(ino) {
            Ok(found) => found,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        self.runtime.spawn(async move {
            match stream.read(&info.name, offset, size as u64).await {
                Ok(data) => reply.data(&data),
                Err(e) => {
                    tracing::warn!(file = %info.name, offset, size, "read failed: {}", e);
                    reply.error(e.errno());
                }
            }
        });
    }

    fn destroy(&mut self) {
        tracing::info!("filesystem unmounted");
    }
}

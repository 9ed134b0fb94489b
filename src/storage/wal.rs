//! Write-ahead log: a sequence of page frames plus commit markers, giving
//! the tree atomic, durable, rollback-capable page writes.
//!
//! Grounded on the teacher's `src/wal.rs` (`WalFile`: an append-only
//! length-prefixed record file with `append`/`read_all`/`truncate`), but the
//! record shape is page frames rather than logical row operations, and
//! recovery replays frames to reconstruct `committed_pages` instead of
//! returning a flat list.

use crate::error::{TreeError, TreeResult};
use crate::storage::page::PageId;
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const FRAME_PAGE: u8 = 1;
const FRAME_COMMIT: u8 = 2;

pub struct Wal {
    path: PathBuf,
    file: File,
    page_size: usize,
    /// page_no -> byte offset of that frame's page payload in the file.
    not_committed_pages: HashMap<PageId, u64>,
    committed_pages: HashMap<PageId, u64>,
    /// File offset immediately after the last COMMIT frame; rollback
    /// truncates back to this point.
    last_commit_offset: u64,
    closed_for_writes: bool,
}

impl Wal {
    /// Open (creating if absent) and recover a WAL file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> TreeResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let mut committed_pages = HashMap::new();
        let mut pending: HashMap<PageId, u64> = HashMap::new();
        let mut last_commit_offset = 0u64;

        file.seek(SeekFrom::Start(0))?;
        loop {
            let mut tag = [0u8; 1];
            match file.read_exact(&mut tag) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(TreeError::Io(e)),
            }

            match tag[0] {
                FRAME_PAGE => {
                    let mut page_no_buf = [0u8; 4];
                    if file.read_exact(&mut page_no_buf).is_err() {
                        warn!("wal {path:?}: truncated page frame header, discarding tail");
                        break;
                    }
                    let page_no = u32::from_be_bytes(page_no_buf);
                    let payload_offset = file.stream_position()?;

                    if file.seek(SeekFrom::Current(page_size as i64)).is_err() {
                        warn!("wal {path:?}: truncated page frame body, discarding tail");
                        break;
                    }
                    if file.stream_position()? - payload_offset != page_size as u64 {
                        warn!("wal {path:?}: short page frame body, discarding tail");
                        break;
                    }
                    pending.insert(page_no, payload_offset);
                }
                FRAME_COMMIT => {
                    committed_pages.extend(pending.drain());
                    last_commit_offset = file.stream_position()?;
                }
                other => {
                    warn!("wal {path:?}: unknown frame tag {other}, discarding tail");
                    break;
                }
            }
        }

        if !pending.is_empty() {
            debug!(
                "wal {path:?}: discarding {} uncommitted page(s) on recovery",
                pending.len()
            );
        }
        file.set_len(last_commit_offset)?;
        file.seek(SeekFrom::Start(last_commit_offset))?;

        Ok(Wal {
            path,
            file,
            page_size,
            not_committed_pages: HashMap::new(),
            committed_pages,
            last_commit_offset,
            closed_for_writes: false,
        })
    }

    fn ensure_open(&self) -> TreeResult<()> {
        if self.closed_for_writes {
            return Err(TreeError::invalid_argument(
                "WAL is closed for writes after checkpoint",
            ));
        }
        Ok(())
    }

    /// Append a page frame and record its offset as not-yet-committed.
    pub fn set_page(&mut self, page_no: PageId, bytes: &[u8]) -> TreeResult<()> {
        self.ensure_open()?;
        debug_assert_eq!(bytes.len(), self.page_size);

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&[FRAME_PAGE])?;
        self.file.write_all(&page_no.to_be_bytes())?;
        let payload_offset = self.file.stream_position()?;
        self.file.write_all(bytes)?;

        self.not_committed_pages.insert(page_no, payload_offset);
        trace!("wal: staged page {page_no} at offset {payload_offset}");
        Ok(())
    }

    /// Append a commit frame and fsync; promote staged pages to committed.
    pub fn commit(&mut self) -> TreeResult<()> {
        self.ensure_open()?;
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&[FRAME_COMMIT])?;
        self.file.sync_data()?;

        self.committed_pages.extend(self.not_committed_pages.drain());
        self.last_commit_offset = self.file.stream_position()?;
        debug!(
            "wal: committed, {} page(s) now durable",
            self.committed_pages.len()
        );
        Ok(())
    }

    /// Discard staged-but-uncommitted pages, truncating back to the last
    /// commit boundary.
    pub fn rollback(&mut self) -> TreeResult<()> {
        self.not_committed_pages.clear();
        self.file.set_len(self.last_commit_offset)?;
        self.file.seek(SeekFrom::Start(self.last_commit_offset))?;
        debug!("wal: rolled back to offset {}", self.last_commit_offset);
        Ok(())
    }

    /// Return the current bytes for `page_no`, preferring a staged write
    /// over a committed one, or `None` if the WAL holds nothing for it.
    pub fn get_page(&mut self, page_no: PageId) -> TreeResult<Option<Vec<u8>>> {
        let offset = self
            .not_committed_pages
            .get(&page_no)
            .or_else(|| self.committed_pages.get(&page_no));

        let Some(&offset) = offset else {
            return Ok(None);
        };

        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; self.page_size];
        self.file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    /// Drain every committed page into `sink` in ascending page order, then
    /// delete the WAL file. No further `set_page` calls are allowed after.
    pub fn checkpoint<F>(&mut self, mut sink: F) -> TreeResult<()>
    where
        F: FnMut(PageId, &[u8]) -> TreeResult<()>,
    {
        let mut page_nos: Vec<PageId> = self.committed_pages.keys().copied().collect();
        page_nos.sort_unstable();

        for page_no in page_nos {
            let offset = self.committed_pages[&page_no];
            self.file.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; self.page_size];
            self.file.read_exact(&mut buf)?;
            sink(page_no, &buf)?;
        }

        self.committed_pages.clear();
        self.not_committed_pages.clear();
        self.closed_for_writes = true;
        std::fs::remove_file(&self.path).or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        debug!("wal {:?}: checkpointed and removed", self.path);
        Ok(())
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.not_committed_pages.is_empty()
    }

    pub fn max_committed_page(&self) -> Option<PageId> {
        self.committed_pages.keys().copied().max()
    }
}

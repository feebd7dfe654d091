use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::error::{DbError, DbResult};
use crate::storage::page::PAGE_SIZE;

/// A single 4 KiB page of data.
pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new() -> Self {
        Page { data: [0; PAGE_SIZE] }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

/// Pager: manages reading/writing 4 KiB pages from/into one relation file,
/// and keeps a simple in-memory cache. Distinguishes pages already on disk
/// from pages newly allocated in memory.
pub struct Pager {
    file: File,

    /// The number of pages that already existed on disk when we opened this file.
    file_length_pages: u32,

    /// The total number of pages that the pager knows about right now
    /// (including any newly allocated ones not yet flushed).
    num_pages: u32,

    /// A very basic cache: `cache[page_num] = Some(Box<Page>)` if that page is loaded.
    cache: Vec<Option<Box<Page>>>,
}

impl Pager {
    /// Create a brand-new file at `path`. Fails if it already exists.
    pub fn create(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| DbError::Relation(format!("cannot create {}: {}", path.display(), e)))?;
        debug!("pager: created {}", path.display());
        Ok(Self::with_file(file, 0))
    }

    /// Open an existing file at `path`. Fails if it does not exist.
    pub fn open(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| DbError::Relation(format!("cannot open {}: {}", path.display(), e)))?;
        let file_len = file.metadata()?.len();
        let file_length_pages = (file_len as usize / PAGE_SIZE) as u32;
        debug!("pager: opened {} with {} pages", path.display(), file_length_pages);
        Ok(Self::with_file(file, file_length_pages))
    }

    fn with_file(file: File, file_length_pages: u32) -> Self {
        Pager {
            file,
            file_length_pages,
            num_pages: file_length_pages,
            cache: Vec::new(),
        }
    }

    /// Return a mutable reference to the requested page, loading it from disk
    /// the first time. Pages beyond `num_pages` are an error: blocks are only
    /// ever handed out by `allocate_page`.
    pub fn get_page(&mut self, page_num: u32) -> DbResult<&mut Page> {
        if page_num >= self.num_pages {
            return Err(DbError::Relation(format!("block {} out of range", page_num)));
        }

        if self.cache.len() <= page_num as usize {
            self.cache.resize_with(page_num as usize + 1, || None);
        }

        let slot = &mut self.cache[page_num as usize];
        if slot.is_none() {
            let mut page = Box::new(Page::new());
            if page_num < self.file_length_pages {
                let offset = (page_num as u64) * (PAGE_SIZE as u64);
                self.file.seek(SeekFrom::Start(offset))?;
                self.file.read_exact(&mut page.data)?;
            }
            *slot = Some(page);
        }

        match slot {
            Some(page) => Ok(page.as_mut()),
            None => Err(DbError::Relation(format!("block {} not cached", page_num))),
        }
    }

    /// Allocate a new page at the end (in memory). Increments `num_pages`.
    /// Does NOT change `file_length_pages` until we actually flush it.
    pub fn allocate_page(&mut self) -> u32 {
        let new_page_num = self.num_pages;
        self.num_pages += 1;
        if self.cache.len() <= new_page_num as usize {
            self.cache.resize_with(new_page_num as usize + 1, || None);
        }
        new_page_num
    }

    /// Write the cached page `page_num` back to disk. If this is a brand-new page (i.e. ≥ `file_length_pages`),
    /// we update `file_length_pages` so subsequent reads know it’s on disk.
    pub fn flush_page(&mut self, page_num: u32) -> DbResult<()> {
        if let Some(Some(page)) = self.cache.get(page_num as usize) {
            let offset = (page_num as u64) * (PAGE_SIZE as u64);
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.write_all(&page.data)?;
            self.file.flush()?;

            if page_num >= self.file_length_pages {
                self.file_length_pages = page_num + 1;
            }
        }
        Ok(())
    }

    /// How many pages does the pager know about right now (on-disk + newly allocated)?
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }
}

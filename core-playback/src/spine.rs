//! Spine elements and the cursor that walks them.
//!
//! The spine is fixed when the audiobook is built and shared as an
//! `Arc<[SpineElement]>`. Cursors are cheap handles (a shared slice plus an
//! index) and never mutate it, so any number of them may be read in
//! parallel.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::DownloadTask;

use crate::location::ChapterLocation;

/// One audio file of the audiobook.
#[derive(Clone)]
pub struct SpineElement {
    pub chapter_number: u32,
    pub part_number: u32,
    pub duration: Duration,
    pub title: Option<String>,
    download_task: Arc<dyn DownloadTask>,
}

impl SpineElement {
    pub fn new(
        chapter_number: u32,
        part_number: u32,
        duration: Duration,
        download_task: Arc<dyn DownloadTask>,
    ) -> Self {
        Self {
            chapter_number,
            part_number,
            duration,
            title: None,
            download_task,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn download_task(&self) -> &Arc<dyn DownloadTask> {
        &self.download_task
    }

    /// Local media file, once downloaded.
    pub fn local_path(&self) -> Option<PathBuf> {
        self.download_task.local_path()
    }

    /// Location of this element with the playhead at `playhead_offset`.
    pub fn location(&self, audiobook_id: &str, playhead_offset: Duration) -> ChapterLocation {
        ChapterLocation {
            audiobook_id: audiobook_id.to_string(),
            number: self.chapter_number,
            part: self.part_number,
            duration: self.duration,
            start_offset: Duration::ZERO,
            playhead_offset,
            title: self.title.clone(),
        }
    }
}

impl fmt::Debug for SpineElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpineElement")
            .field("chapter_number", &self.chapter_number)
            .field("part_number", &self.part_number)
            .field("duration", &self.duration)
            .field("title", &self.title)
            .field("downloaded", &self.local_path().is_some())
            .finish()
    }
}

/// Immutable, shared chapter sequence.
pub type Spine = Arc<[SpineElement]>;

/// Position in a [`Spine`].
///
/// Always points at a valid element. Moving past either end yields `None`
/// instead of wrapping around.
#[derive(Clone)]
pub struct Cursor {
    spine: Spine,
    index: usize,
}

impl Cursor {
    /// Cursor at `index`, or `None` when out of range.
    pub fn at(spine: Spine, index: usize) -> Option<Self> {
        (index < spine.len()).then_some(Self { spine, index })
    }

    /// Cursor at the first element, or `None` for an empty spine.
    pub fn first(spine: Spine) -> Option<Self> {
        Self::at(spine, 0)
    }

    pub fn current(&self) -> &SpineElement {
        &self.spine[self.index]
    }

    pub fn next(&self) -> Option<Self> {
        Self::at(Arc::clone(&self.spine), self.index + 1)
    }

    pub fn prev(&self) -> Option<Self> {
        let index = self.index.checked_sub(1)?;
        Self::at(Arc::clone(&self.spine), index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spine(&self) -> &Spine {
        &self.spine
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index)
            .field("len", &self.spine.len())
            .finish()
    }
}

//! The `image` module provides [`SparseImage`], an address-indexed sparse byte
//! container used as the in-memory representation of a record file.
//!
//! Data is stored as a sorted vector of non-overlapping, non-touching blocks.
//! Every mutating operation keeps the blocks sorted and coalesced, locating
//! affected blocks by binary search. All operations are atomic-or-no-op:
//! arguments and bounds are validated before any block is touched.

use crate::error::ImageErrorKind;

/// A contiguous run of bytes at an absolute address.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    start: u64,
    data: Vec<u8>,
}

impl Block {
    fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }
}

/// Address-indexed sparse byte container with optional half-open bounds.
///
/// # Examples
/// ```
/// use hexreclib::SparseImage;
///
/// let mut image = SparseImage::from_bytes(b"abc", 0x1000);
/// image.write(0x1003, b"xyz").unwrap();
/// assert_eq!(image.to_blocks(), vec![(0x1000, b"abcxyz".to_vec())]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseImage {
    blocks: Vec<Block>,
    bounds_start: Option<u64>,
    bounds_end: Option<u64>,
}

impl SparseImage {
    /// Creates an empty image without bounds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            bounds_start: None,
            bounds_end: None,
        }
    }

    /// Creates an image holding `data` as a single block at `offset`.
    #[must_use]
    pub fn from_bytes(data: &[u8], offset: u64) -> Self {
        let mut image = Self::new();
        if !data.is_empty() {
            image.blocks.push(Block {
                start: offset,
                data: data.to_vec(),
            });
        }
        image
    }

    /// Creates an image from `(address, bytes)` pairs, written in order.
    /// Overlapping pairs follow last-writer-wins semantics.
    #[must_use]
    pub fn from_blocks<I, D>(blocks: I) -> Self
    where
        I: IntoIterator<Item = (u64, D)>,
        D: AsRef<[u8]>,
    {
        let mut image = Self::new();
        for (start, data) in blocks {
            // Unbounded image: writes cannot fail.
            let _ = image.write(start, data.as_ref());
        }
        image
    }

    /// Lowest populated address, if any.
    #[must_use]
    pub fn start(&self) -> Option<u64> {
        self.blocks.first().map(|block| block.start)
    }

    /// One past the highest populated address, if any.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.blocks.last().map(Block::end)
    }

    /// Size of the populated address range, holes included.
    #[must_use]
    pub fn span(&self) -> u64 {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => end - start,
            _ => 0,
        }
    }

    /// True if the populated range has no holes (zero or one block).
    #[must_use]
    pub fn contiguous(&self) -> bool {
        self.blocks.len() <= 1
    }

    /// Number of populated bytes.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        self.blocks.iter().map(|block| block.data.len() as u64).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Image bounds as a `(start, end)` couple; `None` means unbounded.
    #[must_use]
    pub fn bounds(&self) -> (Option<u64>, Option<u64>) {
        (self.bounds_start, self.bounds_end)
    }

    /// Sets the image bounds, cropping any data now falling outside.
    pub fn set_bounds(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<(), ImageErrorKind> {
        if let (Some(start), Some(end)) = (start, end)
            && start > end
        {
            return Err(ImageErrorKind::InvalidRange { start, end });
        }

        if let Some(start) = start
            && self.start().is_some_and(|first| first < start)
        {
            self.delete(self.start().unwrap_or(0), start)?;
        }
        if let Some(end) = end
            && self.end().is_some_and(|last| last > end)
        {
            self.delete(end, self.end().unwrap_or(end))?;
        }

        self.bounds_start = start;
        self.bounds_end = end;
        Ok(())
    }

    /// Iterates over `(address, bytes)` blocks in ascending address order.
    pub fn blocks(&self) -> impl Iterator<Item = (u64, &[u8])> {
        self.blocks.iter().map(|block| (block.start, block.data.as_slice()))
    }

    /// Copies the blocks out as `(address, bytes)` pairs.
    #[must_use]
    pub fn to_blocks(&self) -> Vec<(u64, Vec<u8>)> {
        self.blocks
            .iter()
            .map(|block| (block.start, block.data.clone()))
            .collect()
    }

    /// Byte stored at `address`, if populated.
    #[must_use]
    pub fn peek(&self, address: u64) -> Option<u8> {
        let index = self.blocks.partition_point(|block| block.end() <= address);
        let block = self.blocks.get(index)?;
        if block.start <= address {
            Some(block.data[(address - block.start) as usize])
        } else {
            None
        }
    }

    /// Borrows the bytes of `[start, end)` when the whole range lies within
    /// one populated block.
    pub fn view(&self, start: u64, end: u64) -> Result<&[u8], ImageErrorKind> {
        check_range(start, end)?;

        let index = self.blocks.partition_point(|block| block.end() <= start);
        match self.blocks.get(index) {
            Some(block) if block.start <= start && end <= block.end() => {
                let lo = (start - block.start) as usize;
                let hi = (end - block.start) as usize;
                Ok(&block.data[lo..hi])
            }
            Some(block) if block.start <= start => Err(ImageErrorKind::Hole {
                address: block.end(),
            }),
            _ => Err(ImageErrorKind::Hole { address: start }),
        }
    }

    /// Reads `[start, end)` into a byte vector. Unpopulated addresses take
    /// the `fill` byte; without a fill byte, any hole in the range fails.
    pub fn read(
        &self,
        start: u64,
        end: u64,
        fill: Option<u8>,
    ) -> Result<Vec<u8>, ImageErrorKind> {
        check_range(start, end)?;

        let mut out = Vec::with_capacity((end - start) as usize);
        let mut cursor = start;

        let first = self.blocks.partition_point(|block| block.end() <= start);
        for block in &self.blocks[first..] {
            if block.start >= end {
                break;
            }
            if block.start > cursor {
                let fill = fill.ok_or(ImageErrorKind::Hole { address: cursor })?;
                out.resize((block.start - start) as usize, fill);
                cursor = block.start;
            }
            let lo = (cursor - block.start) as usize;
            let hi = (end.min(block.end()) - block.start) as usize;
            out.extend_from_slice(&block.data[lo..hi]);
            cursor = block.start + hi as u64;
        }

        if cursor < end {
            let fill = fill.ok_or(ImageErrorKind::Hole { address: cursor })?;
            out.resize((end - start) as usize, fill);
        }
        Ok(out)
    }

    /// Reads the whole populated span; holes take the `fill` byte.
    pub fn to_bytes(&self, fill: Option<u8>) -> Result<Vec<u8>, ImageErrorKind> {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => self.read(start, end, fill),
            _ => Ok(Vec::new()),
        }
    }

    /// Overwrites `[offset, offset + bytes.len())` with `bytes`.
    /// Existing data in the range is replaced; touching blocks coalesce.
    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), ImageErrorKind> {
        if bytes.is_empty() {
            return Ok(());
        }
        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or(ImageErrorKind::AddressOverflow)?;
        self.check_bounds(offset, end)?;

        // Blocks overlapping or touching the written range merge into one.
        let lo = self.blocks.partition_point(|block| block.end() < offset);
        let hi = self.blocks.partition_point(|block| block.start <= end);

        let mut merged = Vec::with_capacity(bytes.len());
        let mut merged_start = offset;

        if lo < hi {
            let first = &self.blocks[lo];
            if first.start < offset {
                merged_start = first.start;
                merged.extend_from_slice(&first.data[..(offset - first.start) as usize]);
            }
        }
        merged.extend_from_slice(bytes);
        if lo < hi {
            let last = &self.blocks[hi - 1];
            if last.end() > end {
                merged.extend_from_slice(&last.data[(end - last.start) as usize..]);
            }
        }

        self.blocks.splice(
            lo..hi,
            [Block {
                start: merged_start,
                data: merged,
            }],
        );
        Ok(())
    }

    /// Removes all bytes in `[start, end)`, splitting straddling blocks.
    /// Addresses above the range keep their positions.
    pub fn delete(&mut self, start: u64, end: u64) -> Result<(), ImageErrorKind> {
        check_range(start, end)?;
        if start == end {
            return Ok(());
        }

        let lo = self.blocks.partition_point(|block| block.end() <= start);
        let hi = self.blocks.partition_point(|block| block.start < end);

        let mut fragments = Vec::new();
        if lo < hi {
            let first = &self.blocks[lo];
            if first.start < start {
                fragments.push(Block {
                    start: first.start,
                    data: first.data[..(start - first.start) as usize].to_vec(),
                });
            }
            let last = &self.blocks[hi - 1];
            if last.end() > end {
                fragments.push(Block {
                    start: end,
                    data: last.data[(end - last.start) as usize..].to_vec(),
                });
            }
        }

        self.blocks.splice(lo..hi, fragments);
        Ok(())
    }

    /// Synonym of [`delete`](Self::delete).
    pub fn clear(&mut self, start: u64, end: u64) -> Result<(), ImageErrorKind> {
        self.delete(start, end)
    }

    /// Removes every block, keeping the bounds.
    pub fn clear_all(&mut self) {
        self.blocks.clear();
    }

    /// Returns a new image holding the blocks intersecting `[start, end)`,
    /// clipped to the range. `self` is left unchanged; the copy is unbounded.
    pub fn extract(&self, start: u64, end: u64) -> Result<Self, ImageErrorKind> {
        check_range(start, end)?;

        let mut out = Self::new();
        let first = self.blocks.partition_point(|block| block.end() <= start);
        for block in &self.blocks[first..] {
            if block.start >= end {
                break;
            }
            let lo = start.max(block.start);
            let hi = end.min(block.end());
            out.blocks.push(Block {
                start: lo,
                data: block.data[(lo - block.start) as usize..(hi - block.start) as usize]
                    .to_vec(),
            });
        }
        Ok(out)
    }

    /// Deletes everything outside `[start, end)` and sets the bounds to it.
    pub fn crop(&mut self, start: u64, end: u64) -> Result<(), ImageErrorKind> {
        check_range(start, end)?;
        self.set_bounds(Some(start), Some(end))
    }

    /// Translates every block by `offset`. Fails without mutating if the
    /// shifted range would underflow address zero, overflow the address
    /// space, or collide with the bounds.
    pub fn shift(&mut self, offset: i64) -> Result<(), ImageErrorKind> {
        let (Some(first), Some(last)) = (self.start(), self.end()) else {
            return Ok(());
        };

        let (new_first, new_last) = if offset >= 0 {
            let amount = offset as u64;
            let new_last = last
                .checked_add(amount)
                .ok_or(ImageErrorKind::AddressOverflow)?;
            (first + amount, new_last)
        } else {
            let amount = offset.unsigned_abs();
            let new_first = first
                .checked_sub(amount)
                .ok_or(ImageErrorKind::OutOfBounds { address: first })?;
            (new_first, last - amount)
        };
        self.check_bounds(new_first, new_last)?;

        for block in &mut self.blocks {
            if offset >= 0 {
                block.start += offset as u64;
            } else {
                block.start -= offset.unsigned_abs();
            }
        }
        Ok(())
    }

    /// Makes `[start, end)` entirely populated with `pattern` bytes,
    /// overwriting existing data. The pattern is anchored at `start`:
    /// the byte at address `a` is `pattern[(a - start) % pattern.len()]`.
    pub fn fill(&mut self, start: u64, end: u64, pattern: &[u8]) -> Result<(), ImageErrorKind> {
        check_range(start, end)?;
        if pattern.is_empty() {
            return Err(ImageErrorKind::EmptyPattern);
        }
        if start == end {
            return Ok(());
        }

        let buffer = expand_pattern(pattern, (end - start) as usize);
        self.write(start, &buffer)
    }

    /// Like [`fill`](Self::fill), but preserves existing data: only the
    /// holes within `[start, end)` are populated. Pattern anchoring matches
    /// `fill` (relative to `start`, not to each hole).
    pub fn flood(&mut self, start: u64, end: u64, pattern: &[u8]) -> Result<(), ImageErrorKind> {
        check_range(start, end)?;
        if pattern.is_empty() {
            return Err(ImageErrorKind::EmptyPattern);
        }
        if start == end {
            return Ok(());
        }
        self.check_bounds(start, end)?;

        let buffer = expand_pattern(pattern, (end - start) as usize);

        // Collect the holes first: writing mutates the block list.
        let mut holes = Vec::new();
        let mut cursor = start;
        let first = self.blocks.partition_point(|block| block.end() <= start);
        for block in &self.blocks[first..] {
            if block.start >= end {
                break;
            }
            if block.start > cursor {
                holes.push((cursor, block.start));
            }
            cursor = block.end();
        }
        if cursor < end {
            holes.push((cursor, end));
        }

        for (hole_start, hole_end) in holes {
            let lo = (hole_start - start) as usize;
            let hi = (hole_end - start) as usize;
            self.write(hole_start, &buffer[lo..hi])?;
        }
        Ok(())
    }

    /// Scans the populated runs within the range for `pattern` and returns
    /// the absolute address of the first match. Matches never span holes.
    pub fn find(
        &self,
        pattern: &[u8],
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<u64, ImageErrorKind> {
        if pattern.is_empty() {
            return Err(ImageErrorKind::EmptyPattern);
        }
        let start = start.or_else(|| self.start()).unwrap_or(0);
        let end = end.or_else(|| self.end()).unwrap_or(0);
        check_range(start, end)?;

        let first = self.blocks.partition_point(|block| block.end() <= start);
        for block in &self.blocks[first..] {
            if block.start >= end {
                break;
            }
            let lo = (start.max(block.start) - block.start) as usize;
            let hi = (end.min(block.end()) - block.start) as usize;
            let run = &block.data[lo..hi];
            // Slide window over the contiguous run.
            for (offset, window) in run.windows(pattern.len()).enumerate() {
                if window == pattern {
                    return Ok(block.start + (lo + offset) as u64);
                }
            }
        }
        Err(ImageErrorKind::PatternNotFound)
    }

    /// Writes every block of `other` into `self`. Last writer wins where
    /// addresses overlap. Fails without mutating if any block of `other`
    /// falls outside the bounds of `self`.
    pub fn merge(&mut self, other: &Self) -> Result<(), ImageErrorKind> {
        for block in &other.blocks {
            self.check_bounds(block.start, block.end())?;
        }
        for block in other.blocks.clone() {
            self.write(block.start, &block.data)?;
        }
        Ok(())
    }

    /// Inserts `bytes` at `offset`, shifting everything at or above
    /// `offset` up by `bytes.len()`.
    pub fn insert(&mut self, offset: u64, bytes: &[u8]) -> Result<(), ImageErrorKind> {
        if bytes.is_empty() {
            return Ok(());
        }
        let amount = bytes.len() as u64;
        let insert_end = offset
            .checked_add(amount)
            .ok_or(ImageErrorKind::AddressOverflow)?;
        self.check_bounds(offset, insert_end)?;

        if let Some(last) = self.end()
            && last > offset
        {
            let shifted_end = last
                .checked_add(amount)
                .ok_or(ImageErrorKind::AddressOverflow)?;
            if let Some(bound) = self.bounds_end
                && shifted_end > bound
            {
                return Err(ImageErrorKind::OutOfBounds { address: shifted_end - 1 });
            }
        }

        // Split the block straddling the insertion point, then translate.
        let index = self.blocks.partition_point(|block| block.end() <= offset);
        if let Some(block) = self.blocks.get_mut(index)
            && block.start < offset
        {
            let tail = block.data.split_off((offset - block.start) as usize);
            self.blocks.insert(
                index + 1,
                Block {
                    start: offset,
                    data: tail,
                },
            );
        }
        for block in &mut self.blocks {
            if block.start >= offset {
                block.start += amount;
            }
        }
        self.write(offset, bytes)
    }

    /// Reflects the populated span: for an image spanning `[s, e)`, the byte
    /// at address `a` moves to `s + (e - 1 - a)`.
    pub fn reverse(&mut self) {
        let (Some(start), Some(end)) = (self.start(), self.end()) else {
            return;
        };

        let mut reversed = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.iter().rev() {
            let mut data = block.data.clone();
            data.reverse();
            reversed.push(Block {
                start: start + (end - block.end()),
                data,
            });
        }
        self.blocks = reversed;
    }

    /// Yields `(start, end)` couples of the unpopulated ranges between the
    /// first and the last populated address.
    #[must_use]
    pub fn holes(&self) -> Vec<(u64, u64)> {
        self.blocks
            .windows(2)
            .map(|pair| (pair[0].end(), pair[1].start))
            .collect()
    }

    /// Yields `(start, end)` couples of the populated block ranges.
    #[must_use]
    pub fn spans(&self) -> Vec<(u64, u64)> {
        self.blocks
            .iter()
            .map(|block| (block.start, block.end()))
            .collect()
    }

    /// Pads block boundaries outward to multiples of `modulo` with
    /// `pattern` bytes. Interior holes that do not touch a boundary are
    /// left alone.
    pub fn align(&mut self, modulo: u64, pattern: &[u8]) -> Result<(), ImageErrorKind> {
        if modulo < 2 {
            return Ok(());
        }
        if pattern.is_empty() {
            return Err(ImageErrorKind::EmptyPattern);
        }

        for (start, end) in self.spans() {
            let aligned_start = start - (start % modulo);
            let aligned_end = end
                .checked_add((modulo - end % modulo) % modulo)
                .ok_or(ImageErrorKind::AddressOverflow)?;
            if aligned_start < start {
                self.flood(aligned_start, start, pattern)?;
            }
            if end < aligned_end {
                self.flood(end, aligned_end, pattern)?;
            }
        }
        Ok(())
    }

    /// Iterates `(address, bytes)` data chunks of at most `maxlen` bytes.
    /// Chunks never span holes. With `align`, chunk boundaries fall on
    /// multiples of `maxlen` (the first chunk of a block may be shorter).
    pub fn chunks(&self, maxlen: usize, align: bool) -> Chunks<'_> {
        Chunks {
            blocks: &self.blocks,
            block_index: 0,
            offset: 0,
            maxlen: maxlen.max(1),
            align,
        }
    }

    fn check_bounds(&self, start: u64, end: u64) -> Result<(), ImageErrorKind> {
        if let Some(bound) = self.bounds_start
            && start < bound
        {
            return Err(ImageErrorKind::OutOfBounds { address: start });
        }
        if let Some(bound) = self.bounds_end
            && end > bound
        {
            return Err(ImageErrorKind::OutOfBounds { address: end - 1 });
        }
        Ok(())
    }
}

/// Iterator over hole-free data chunks, created by [`SparseImage::chunks`].
pub struct Chunks<'a> {
    blocks: &'a [Block],
    block_index: usize,
    offset: usize,
    maxlen: usize,
    align: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = (u64, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.blocks.get(self.block_index)?;
        let address = block.start + self.offset as u64;
        let remaining = block.data.len() - self.offset;

        let mut take = self.maxlen.min(remaining);
        if self.align {
            let misalign = (address % self.maxlen as u64) as usize;
            if misalign != 0 {
                take = take.min(self.maxlen - misalign);
            }
        }

        let chunk = &block.data[self.offset..self.offset + take];
        self.offset += take;
        if self.offset == block.data.len() {
            self.block_index += 1;
            self.offset = 0;
        }
        Some((address, chunk))
    }
}

fn check_range(start: u64, end: u64) -> Result<(), ImageErrorKind> {
    if start > end {
        Err(ImageErrorKind::InvalidRange { start, end })
    } else {
        Ok(())
    }
}

fn expand_pattern(pattern: &[u8], length: usize) -> Vec<u8> {
    pattern.iter().copied().cycle().take(length).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseImage {
        SparseImage::from_blocks([(123u64, b"abc".to_vec()), (130, b"xyz".to_vec())])
    }

    #[test]
    fn test_write_coalesces_touching_blocks() {
        // Arrange
        let mut image = SparseImage::from_bytes(b"abc", 100);

        // Act
        image.write(103, b"def").unwrap();
        image.write(97, b"xyz").unwrap();

        // Assert
        assert_eq!(image.to_blocks(), vec![(97, b"xyzabcdef".to_vec())]);
        assert!(image.contiguous());
    }

    #[test]
    fn test_write_overwrites_overlap() {
        // Arrange
        let mut image = sample();

        // Act: span both blocks and the hole between them
        image.write(124, b"01234567").unwrap();

        // Assert
        assert_eq!(image.to_blocks(), vec![(123, b"a01234567z".to_vec())]);
    }

    #[test]
    fn test_write_keeps_disjoint_blocks_sorted() {
        // Arrange
        let mut image = SparseImage::new();

        // Act
        image.write(200, b"bb").unwrap();
        image.write(100, b"aa").unwrap();
        image.write(300, b"cc").unwrap();

        // Assert
        assert_eq!(image.spans(), vec![(100, 102), (200, 202), (300, 302)]);
        assert_eq!(image.holes(), vec![(102, 200), (202, 300)]);
        assert_eq!(image.byte_len(), 6);
    }

    #[test]
    fn test_read_with_and_without_fill() {
        // Arrange
        let image = sample();

        // Act / Assert
        assert_eq!(image.read(124, 132, Some(b'.')).unwrap(), b"bc....xy");
        assert_eq!(
            image.read(124, 132, None).unwrap_err(),
            ImageErrorKind::Hole { address: 126 }
        );
        assert_eq!(image.read(123, 126, None).unwrap(), b"abc");
    }

    #[test]
    fn test_peek_and_view() {
        // Arrange
        let image = sample();

        // Act / Assert
        assert_eq!(image.peek(123), Some(b'a'));
        assert_eq!(image.peek(126), None);
        assert_eq!(image.view(130, 133).unwrap(), b"xyz");
        assert_eq!(
            image.view(125, 131).unwrap_err(),
            ImageErrorKind::Hole { address: 126 }
        );
    }

    #[test]
    fn test_delete_splits_straddling_block() {
        // Arrange
        let mut image = sample();

        // Act
        image.delete(124, 132).unwrap();

        // Assert
        assert_eq!(image.to_blocks(), vec![(123, b"a".to_vec()), (132, b"z".to_vec())]);
    }

    #[test]
    fn test_extract_clips_blocks() {
        // Arrange
        let image = sample();

        // Act
        let inner = image.extract(124, 132).unwrap();

        // Assert
        assert_eq!(inner.to_blocks(), vec![(124, b"bc".to_vec()), (130, b"xy".to_vec())]);
        assert_eq!(image.byte_len(), 6); // source unchanged
    }

    #[test]
    fn test_crop_deletes_outside_and_sets_bounds() {
        // Arrange
        let mut image = SparseImage::from_bytes(b"hello", 0x1000);

        // Act
        image.crop(0x1002, 0x1004).unwrap();

        // Assert
        assert_eq!(image.to_blocks(), vec![(0x1002, b"ll".to_vec())]);
        assert_eq!(image.bounds(), (Some(0x1002), Some(0x1004)));
        assert_eq!(
            image.write(0x1004, b"!").unwrap_err(),
            ImageErrorKind::OutOfBounds { address: 0x1004 }
        );
    }

    #[test]
    fn test_bounded_write_is_atomic() {
        // Arrange
        let mut image = SparseImage::new();
        image.set_bounds(Some(0x8000), Some(0x10000)).unwrap();

        // Act
        let result = image.write(0xFFFE, b"ABCD");

        // Assert: nothing written
        assert_eq!(result.unwrap_err(), ImageErrorKind::OutOfBounds { address: 0x10001 });
        assert!(image.is_empty());
    }

    #[test]
    fn test_shift_round_trip() {
        // Arrange
        let mut image = sample();
        let original = image.clone();

        // Act
        image.shift(1000).unwrap();
        assert_eq!(image.start(), Some(1123));
        image.shift(-1000).unwrap();

        // Assert
        assert_eq!(image, original);
    }

    #[test]
    fn test_shift_below_zero_fails() {
        // Arrange
        let mut image = sample();

        // Act
        let result = image.shift(-124);

        // Assert
        assert_eq!(result.unwrap_err(), ImageErrorKind::OutOfBounds { address: 123 });
        assert_eq!(image.start(), Some(123));
    }

    #[test]
    fn test_fill_pattern_anchored_to_range_start() {
        // Arrange
        let mut image = SparseImage::new();

        // Act
        image.fill(7, 11, &[0xAA, 0xBB, 0xCC]).unwrap();

        // Assert: pattern[0] at 7, pattern[1] at 8, pattern[2] at 9, pattern[0] at 10
        assert_eq!(
            image.to_blocks(),
            vec![(7, vec![0xAA, 0xBB, 0xCC, 0xAA])]
        );
    }

    #[test]
    fn test_fill_is_idempotent() {
        // Arrange
        let mut image = sample();

        // Act
        image.fill(120, 135, &[0x55]).unwrap();
        let once = image.clone();
        image.fill(120, 135, &[0x55]).unwrap();

        // Assert
        assert_eq!(image, once);
    }

    #[test]
    fn test_flood_preserves_data() {
        // Arrange
        let mut image = sample();

        // Act
        image.flood(120, 135, &[0xEE]).unwrap();

        // Assert
        let expected = b"\xEE\xEE\xEEabc\xEE\xEE\xEE\xEExyz\xEE\xEE".to_vec();
        assert_eq!(image.to_blocks(), vec![(120, expected)]);
    }

    #[test]
    fn test_flood_pattern_alignment_spans_holes() {
        // Arrange: data at 4..6, flood 0..8 with 4-byte pattern
        let mut image = SparseImage::from_bytes(b"XY", 4);

        // Act
        image.flood(0, 8, &[0, 1, 2, 3]).unwrap();

        // Assert: addresses 6, 7 take pattern[6], pattern[7] (mod 4)
        assert_eq!(image.to_blocks(), vec![(0, vec![0, 1, 2, 3, b'X', b'Y', 2, 3])]);
    }

    #[test]
    fn test_find_does_not_span_holes() {
        // Arrange
        let image = sample();

        // Act / Assert
        assert_eq!(image.find(b"yz", None, None).unwrap(), 131);
        assert_eq!(image.find(b"bc", None, None).unwrap(), 124);
        // "cx" would only match across the hole between the blocks
        assert_eq!(
            image.find(b"cx", None, None).unwrap_err(),
            ImageErrorKind::PatternNotFound
        );
        assert_eq!(
            image.find(b"a", Some(124), None).unwrap_err(),
            ImageErrorKind::PatternNotFound
        );
    }

    #[test]
    fn test_find_in_random_buffer() {
        use rand::Rng;

        // Arrange
        let rng = rand::rng();
        let start_addr = 0x1000;
        let pattern = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE];

        let mut random_bytes: Vec<u8> = rng
            .sample_iter(rand::distr::StandardUniform)
            .take(1000)
            .collect();
        random_bytes[203..208].copy_from_slice(&pattern); // replace elements with the pattern

        let image = SparseImage::from_bytes(&random_bytes, start_addr);

        // Act
        let address = image.find(&pattern, None, None).unwrap();

        // Assert
        assert_eq!(address, start_addr + 203);
    }

    #[test]
    fn test_merge_last_writer_wins() {
        // Arrange
        let mut target = SparseImage::from_bytes(b"<<<?????>>>", 450);
        let other = SparseImage::from_bytes(b"xyz", 456);

        // Act
        target.merge(&other).unwrap();
        let once = target.clone();
        target.merge(&other).unwrap();

        // Assert: idempotent, overlap overwritten
        assert_eq!(target.to_blocks(), vec![(450, b"<<<???xyz>>".to_vec())]);
        assert_eq!(target, once);
    }

    #[test]
    fn test_insert_shifts_tail_up() {
        // Arrange
        let mut image = SparseImage::from_bytes(b"abcd", 100);

        // Act
        image.insert(102, b"..").unwrap();

        // Assert
        assert_eq!(image.to_blocks(), vec![(100, b"ab..cd".to_vec())]);
    }

    #[test]
    fn test_insert_before_disjoint_blocks() {
        // Arrange
        let mut image = sample();

        // Act
        image.insert(123, b"!").unwrap();

        // Assert
        assert_eq!(image.to_blocks(), vec![(123, b"!abc".to_vec()), (131, b"xyz".to_vec())]);
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        // Arrange
        let mut image = sample();
        let original = image.clone();

        // Act
        image.reverse();

        // Assert: span [123, 133), byte at 123 maps to 132
        assert_eq!(image.peek(132), Some(b'a'));
        assert_eq!(image.peek(123), Some(b'z'));
        assert_eq!(image.to_blocks(), vec![(123, b"zyx".to_vec()), (130, b"cba".to_vec())]);

        image.reverse();
        assert_eq!(image, original);
    }

    #[test]
    fn test_holes_partition_populated_span() {
        // Arrange
        let image = sample();

        // Act
        let holes = image.holes();
        let spans = image.spans();

        // Assert: spans and holes partition [start, end)
        let mut covered: u64 = spans.iter().map(|(s, e)| e - s).sum();
        covered += holes.iter().map(|(s, e)| e - s).sum::<u64>();
        assert_eq!(covered, image.span());
        assert_eq!(holes, vec![(126, 130)]);
    }

    #[test]
    fn test_align_pads_boundaries() {
        // Arrange: aligned regions 120..128 and 132..140 do not touch
        let mut image =
            SparseImage::from_blocks([(123u64, b"abc".to_vec()), (134, b"xyz".to_vec())]);

        // Act
        image.align(4, b".").unwrap();

        // Assert: the hole 128..132 survives
        assert_eq!(
            image.to_blocks(),
            vec![(120, b"...abc..".to_vec()), (132, b"..xyz...".to_vec())]
        );
    }

    #[test]
    fn test_align_coalesces_abutting_regions() {
        // Arrange: aligned regions 120..128 and 128..136 touch at 128
        let mut image = sample();

        // Act
        image.align(4, b".").unwrap();

        // Assert
        assert_eq!(
            image.to_blocks(),
            vec![(120, b"...abc....xyz...".to_vec())]
        );
    }

    #[test]
    fn test_chunks_respect_maxlen_and_holes() {
        // Arrange
        let image = SparseImage::from_blocks([(0u64, vec![0u8; 600]), (1000, vec![1u8; 3])]);

        // Act
        let chunks: Vec<(u64, usize)> = image
            .chunks(255, false)
            .map(|(addr, data)| (addr, data.len()))
            .collect();

        // Assert
        assert_eq!(chunks, vec![(0, 255), (255, 255), (510, 90), (1000, 3)]);
    }

    #[test]
    fn test_chunks_aligned() {
        // Arrange: block starting off-alignment
        let image = SparseImage::from_bytes(&[0u8; 40], 10);

        // Act
        let chunks: Vec<(u64, usize)> = image
            .chunks(16, true)
            .map(|(addr, data)| (addr, data.len()))
            .collect();

        // Assert: first chunk stops at the next multiple of 16
        assert_eq!(chunks, vec![(10, 6), (16, 16), (32, 16), (48, 2)]);
    }

    #[test]
    fn test_invalid_range_rejected() {
        // Arrange
        let mut image = sample();

        // Act / Assert
        assert_eq!(
            image.read(10, 5, None).unwrap_err(),
            ImageErrorKind::InvalidRange { start: 10, end: 5 }
        );
        assert_eq!(
            image.delete(10, 5).unwrap_err(),
            ImageErrorKind::InvalidRange { start: 10, end: 5 }
        );
        assert_eq!(
            image.fill(10, 5, &[0]).unwrap_err(),
            ImageErrorKind::InvalidRange { start: 10, end: 5 }
        );
    }

    #[test]
    fn test_empty_pattern_rejected() {
        // Arrange
        let mut image = sample();

        // Act / Assert
        assert_eq!(image.fill(0, 4, b"").unwrap_err(), ImageErrorKind::EmptyPattern);
        assert_eq!(image.find(b"", None, None).unwrap_err(), ImageErrorKind::EmptyPattern);
    }

    #[test]
    fn test_empty_image_queries() {
        // Arrange
        let image = SparseImage::new();

        // Act / Assert
        assert!(image.is_empty());
        assert_eq!(image.start(), None);
        assert_eq!(image.end(), None);
        assert_eq!(image.span(), 0);
        assert_eq!(image.to_bytes(None).unwrap(), Vec::<u8>::new());
        assert!(image.holes().is_empty());
    }
}

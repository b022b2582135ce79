//! Compaction of the arena head.
//!
//! Live blocks are slid toward offset 0 in the order they currently appear, so a block is only
//! ever moved onto space that is free or that it occupies itself. The offsets recorded in the
//! store are rewritten as blocks move; the tail is not touched.

use log::debug;
use lu_arena::{Arena, Offset};

use crate::{store::Block, FactorStore};

/// Compacts `blocks` to the start of the arena and returns the number of head units reclaimed.
///
/// On return `blocks` is sorted by offset and holds the new offsets.
pub(crate) fn compact_blocks(arena: &mut Arena, store: &mut FactorStore, blocks: &mut [Block]) -> usize {
    blocks.sort_by_key(|block| block.offset);

    let mut head = 0;
    for block in blocks.iter_mut() {
        debug_assert!(block.offset.get() >= head, "blocks overlap at {}", block.offset);
        let to = Offset::new(head);
        arena.relocate(block.offset, to, block.units);
        store.relocate(block.owner, to);
        block.offset = to;
        head += block.units;
    }

    let reclaimed = arena.head() - head;
    arena.reset_head(head);
    debug!(
        "compacted {} blocks into {} units, reclaimed {} units",
        blocks.len(),
        head,
        reclaimed
    );
    reclaimed
}

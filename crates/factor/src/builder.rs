//! Population of a [`Numeric`] by the factorization kernel.
//!
//! The kernel decides pivots, chains and permutations; the builder only lays the resulting columns
//! of `L` and rows of `U` out in the arena, in pivot order. Allocations come from the arena head.
//! The kernel may also park transient elements (contribution blocks and the like) at the head and
//! free them once they are assembled. When the head is full the builder first compacts, squeezing
//! out freed elements, then grows the arena.

use std::marker::PhantomData;

use log::debug;
use lu_arena::{units_of, Arena, Offset, Reallocator, SystemReallocator};
use nalgebra::DVector;

use crate::{
    compact::compact_blocks,
    constants::{DEFAULT_GROWTH_FACTOR, DEFAULT_INITIAL_UNITS, DEFAULT_MAX_COMPACTIONS},
    store::{Block, Owner},
    Entry, Error, FactorStore, LColumn, Numeric, Scaling, URow,
};

/// Arena growth policy of a [`NumericBuilder`].
#[derive(Clone, Debug, PartialEq)]
pub struct BuilderConfig {
    /// arena size to start with, in units
    pub initial_units: usize,
    /// the arena grows to this multiple of what it needs when it runs out of room
    pub growth_factor: f64,
    /// compaction passes attempted before growing
    pub max_compactions: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            initial_units: DEFAULT_INITIAL_UNITS,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_compactions: DEFAULT_MAX_COMPACTIONS,
        }
    }
}

/// How a new chained column of `L` relates to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LLink {
    ChainStart,
    /// Pivot row `k` sits at `removal` in the pattern of column `k - 1`.
    ChainContinuation { removal: usize },
}

/// How a new chained row of `U` relates to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ULink<'a> {
    /// Row `k` starts a chain; `prev_pattern` is the final pattern of row `k - 1`, in the order
    /// its values were given.
    ChainStart { prev_pattern: &'a [usize] },
    /// Row `k` drops column `k` from row `k - 1` (at `restore`, if it was there) and appends
    /// `added` columns.
    ChainContinuation { added: usize, restore: Option<usize> },
}

pub struct NumericBuilder<T: Entry, R: Reallocator = SystemReallocator> {
    n_row: usize,
    n_col: usize,
    config: BuilderConfig,
    reallocator: R,
    arena: Arena,
    store: FactorStore,
    /// every live block at the head: factor data and elements
    blocks: Vec<Block>,
    /// offset and size of every element, `None` once freed
    elements: Vec<Option<(Offset, usize)>>,
    /// pattern size of the last chained column of L
    l_deg: usize,
    compactions: usize,
    growths: usize,
    _entry: PhantomData<T>,
}

impl<T: Entry> NumericBuilder<T> {
    /// Starts an `n_row` by `n_col` factorization whose first `n1` pivots are singletons.
    pub fn new(n_row: usize, n_col: usize, n1: usize) -> Self {
        Self::with_config(n_row, n_col, n1, BuilderConfig::default(), SystemReallocator)
    }
}

impl<T: Entry, R: Reallocator> NumericBuilder<T, R> {
    pub fn with_config(n_row: usize, n_col: usize, n1: usize, config: BuilderConfig, reallocator: R) -> Self {
        let arena = Arena::new(config.initial_units);
        NumericBuilder {
            n_row,
            n_col,
            config,
            reallocator,
            arena,
            store: FactorStore::new(n1),
            blocks: Vec::new(),
            elements: Vec::new(),
            l_deg: 0,
            compactions: 0,
            growths: 0,
            _entry: PhantomData,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn store(&self) -> &FactorStore {
        &self.store
    }

    /// Number of compaction passes run so far.
    pub fn compactions(&self) -> usize {
        self.compactions
    }

    /// Number of times the arena was grown.
    pub fn growths(&self) -> usize {
        self.growths
    }

    /// Appends singleton column `k` of `L`: its complete pattern and values.
    pub fn push_l_singleton(&mut self, rows: &[usize], values: &[T]) -> Result<(), Error> {
        let k = self.store.l_columns().len();
        if k >= self.store.n1() {
            return malformed(k, "singleton column of L past n1");
        }
        self.check_lengths(k, rows.len(), values.len())?;

        let offset = self.store_block(Owner::L(k), rows, values)?;
        self.store.push_l(LColumn::Singleton {
            offset,
            len: rows.len(),
        });
        Ok(())
    }

    /// Appends chained column `k` of `L`.
    ///
    /// `rows` are the rows this column adds to the inherited pattern; `values` covers the full
    /// pattern: the inherited rows in their current order (after the removal), then `rows`.
    pub fn push_l_column(&mut self, link: LLink, rows: &[usize], values: &[T]) -> Result<(), Error> {
        let k = self.store.l_columns().len();
        if k < self.store.n1() {
            return malformed(k, "chained column of L before the singletons are done");
        }
        let inherited = match link {
            LLink::ChainStart => 0,
            LLink::ChainContinuation { removal } => {
                if k == self.store.n1() || removal >= self.l_deg {
                    return malformed(k, format!("removal at {} from {} rows", removal, self.l_deg));
                }
                self.l_deg - 1
            }
        };
        self.check_lengths(k, inherited + rows.len(), values.len())?;

        let offset = self.store_block(Owner::L(k), rows, values)?;
        let len = rows.len();
        self.store.push_l(match link {
            LLink::ChainStart => LColumn::ChainStart { offset, len },
            LLink::ChainContinuation { removal } => LColumn::ChainContinuation {
                offset,
                len,
                removal,
            },
        });
        self.l_deg = values.len();
        Ok(())
    }

    /// Appends singleton row `k` of `U`: its off-diagonal columns and values.
    pub fn push_u_singleton(&mut self, cols: &[usize], values: &[T]) -> Result<(), Error> {
        let k = self.store.u_rows().len();
        if k >= self.store.n1() {
            return malformed(k, "singleton row of U past n1");
        }
        self.check_lengths(k, cols.len(), values.len())?;

        let offset = self.store_block(Owner::U(k), cols, values)?;
        self.store.push_u(URow::Singleton {
            offset,
            len: cols.len(),
        });
        Ok(())
    }

    /// Appends chained row `k` of `U` with the values of its off-diagonal pattern.
    ///
    /// The pattern itself is only known once the whole chain is in place, so the value count is
    /// checked by [`Self::finish`].
    pub fn push_u_row(&mut self, link: ULink<'_>, values: &[T]) -> Result<(), Error> {
        let k = self.store.u_rows().len();
        if k < self.store.n1() {
            return malformed(k, "chained row of U before the singletons are done");
        }
        let row = match link {
            ULink::ChainStart { prev_pattern } => {
                let offset = self.store_block(Owner::U(k), prev_pattern, values)?;
                URow::ChainStart {
                    offset,
                    len: prev_pattern.len(),
                }
            }
            ULink::ChainContinuation { added, restore } => {
                let offset = self.store_block(Owner::U(k), &[], values)?;
                URow::ChainContinuation {
                    offset,
                    len: added,
                    restore,
                }
            }
        };
        self.store.push_u(row);
        Ok(())
    }

    /// Sets the pattern of the last pivot row of `U`, for matrices with more columns than pivots.
    pub fn set_upattern(&mut self, cols: &[usize]) {
        self.store.set_upattern(cols);
    }

    /// Reserves `nunits` of transient work space at the arena tail.
    ///
    /// The offset stays valid until the arena grows or [`Self::release_work`] is called.
    pub fn allocate_work(&mut self, nunits: usize) -> Result<Offset, Error> {
        if let Some(p) = self.arena.allocate_tail(nunits) {
            return Ok(p);
        }
        self.make_room(nunits)?;
        self.arena.allocate_tail(nunits).ok_or_else(|| self.out_of_memory(nunits))
    }

    /// Mutable access to work space obtained from [`Self::allocate_work`].
    pub fn work_mut<X: bytemuck::Pod>(&mut self, at: Offset, len: usize) -> &mut [X] {
        self.arena.slice_mut(at, len)
    }

    /// Frees all transient work space.
    pub fn release_work(&mut self) {
        self.arena.release_tail();
    }

    /// Reserves `nunits` at the arena head for an element and returns its id.
    ///
    /// Elements move when the head is compacted, so they are only reachable through their id.
    pub fn allocate_element(&mut self, nunits: usize) -> Result<usize, Error> {
        let id = self.elements.len();
        let offset = self.allocate_head(nunits)?;
        self.blocks.push(Block {
            owner: Owner::Element(id),
            offset,
            units: nunits,
        });
        self.elements.push(Some((offset, nunits)));
        Ok(id)
    }

    /// The first `len` objects of element `id`, or `None` if it was freed or is too small.
    pub fn element_mut<X: bytemuck::Pod>(&mut self, id: usize, len: usize) -> Option<&mut [X]> {
        let (offset, units) = self.elements.get(id).copied().flatten()?;
        if len.checked_mul(std::mem::size_of::<X>())? > units * std::mem::size_of::<lu_arena::Unit>() {
            return None;
        }
        Some(self.arena.slice_mut(offset, len))
    }

    /// Frees element `id`. Its space is reclaimed by the next compaction.
    pub fn free_element(&mut self, id: usize) {
        if let Some(slot) = self.elements.get_mut(id) {
            if slot.take().is_some() {
                self.blocks.retain(|block| block.owner != Owner::Element(id));
            }
        }
    }

    /// Completes the factorization object.
    ///
    /// Work space is released and the arena trimmed to the factor data. The result is validated
    /// before it is returned.
    pub fn finish(
        mut self,
        rperm: Vec<usize>,
        cperm: Vec<usize>,
        diagonal: DVector<T>,
        scaling: Option<Scaling<T>>,
    ) -> Result<Numeric<T>, Error> {
        self.arena.release_tail();
        for id in 0..self.elements.len() {
            self.free_element(id);
        }
        self.check_blocks()?;
        let live: usize = self.blocks.iter().map(|block| block.units).sum();
        if live < self.arena.head() {
            compact_blocks(&mut self.arena, &mut self.store, &mut self.blocks);
        }
        self.arena.shrink_to_head(&mut self.reallocator)?;

        let lnz = self.store.l_degrees().iter().sum();
        let unz = self.store.u_degrees().iter().sum();
        let numeric = Numeric {
            n_row: self.n_row,
            n_col: self.n_col,
            arena: self.arena,
            store: self.store,
            rperm,
            cperm,
            diagonal,
            scaling,
            lnz,
            unz,
        };
        numeric.validate()?;
        debug!(
            "finished {} x {} factorization: npiv = {}, lnz = {}, unz = {}, peak arena usage = {} units",
            numeric.n_row,
            numeric.n_col,
            numeric.npiv(),
            lnz,
            unz,
            numeric.arena.max_usage()
        );
        Ok(numeric)
    }

    /// Compares the size of every stored block with what the completed chains imply.
    ///
    /// Chained rows of `U` carry no pattern of their own, so their value counts can only be
    /// checked once all rows are in.
    fn check_blocks(&self) -> Result<(), Error> {
        let npiv = self.store.npiv();
        if self.store.u_rows().len() != npiv {
            return Err(Error::InvalidNumeric {
                reason: format!("{} columns of L but {} rows of U", npiv, self.store.u_rows().len()),
            });
        }
        let expected = self.store.blocks::<T>();
        for block in &self.blocks {
            let (index, what, k) = match block.owner {
                Owner::L(k) => (k, "column of L", k),
                Owner::U(k) => (npiv + k, "row of U", k),
                Owner::Element(_) => continue,
            };
            if expected[index].units != block.units {
                return malformed(
                    k,
                    format!(
                        "{} takes {} units, its pattern implies {}",
                        what, block.units, expected[index].units
                    ),
                );
            }
        }
        Ok(())
    }

    fn check_lengths(&self, k: usize, expected: usize, values: usize) -> Result<(), Error> {
        if expected != values {
            return malformed(k, format!("{} values for a pattern of {}", values, expected));
        }
        Ok(())
    }

    /// Stores `indices` followed by `values` in a fresh head block.
    fn store_block(&mut self, owner: Owner, indices: &[usize], values: &[T]) -> Result<Offset, Error> {
        let index_units = units_of::<usize>(indices.len());
        let nunits = index_units + units_of::<T>(values.len());
        let offset = self.allocate_head(nunits)?;
        self.blocks.push(Block {
            owner,
            offset,
            units: nunits,
        });
        self.arena.write(offset, indices);
        self.arena.write(offset.add(index_units), values);
        Ok(offset)
    }

    fn allocate_head(&mut self, nunits: usize) -> Result<Offset, Error> {
        if let Some(p) = self.arena.allocate_head(nunits) {
            return Ok(p);
        }
        self.make_room(nunits)?;
        self.arena.allocate_head(nunits).ok_or_else(|| self.out_of_memory(nunits))
    }

    /// Compacts and, if that is not enough, grows the arena until `nunits` are free.
    fn make_room(&mut self, nunits: usize) -> Result<(), Error> {
        for _ in 0..self.config.max_compactions {
            let reclaimed = compact_blocks(&mut self.arena, &mut self.store, &mut self.blocks);
            self.compactions += 1;
            for block in &self.blocks {
                if let Owner::Element(id) = block.owner {
                    self.elements[id] = Some((block.offset, block.units));
                }
            }
            if nunits <= self.arena.free() {
                return Ok(());
            }
            if reclaimed == 0 {
                break;
            }
        }

        let needed = self.arena.size() - self.arena.free() + nunits;
        let new_size = ((needed as f64 * self.config.growth_factor).ceil() as usize).max(needed);
        self.arena.grow(&mut self.reallocator, new_size)?;
        self.growths += 1;
        debug!("arena grown to {} units for a request of {}", self.arena.size(), nunits);
        Ok(())
    }

    fn out_of_memory(&self, nunits: usize) -> Error {
        Error::Arena(lu_arena::Error::OutOfMemory {
            bytes: nunits * std::mem::size_of::<lu_arena::Unit>(),
        })
    }
}

fn malformed<X>(k: usize, reason: impl Into<String>) -> Result<X, Error> {
    Err(Error::MalformedColumn {
        k,
        reason: reason.into(),
    })
}

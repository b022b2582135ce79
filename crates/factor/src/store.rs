use lu_arena::{units_of, Offset};

use crate::{Entry, LColumn, URow};

/// The per-pivot layout of `L` and `U` inside the arena.
///
/// The store itself holds no numbers; it describes where each column of `L` and each row of `U`
/// is found and how its pattern follows from its neighbour's.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactorStore {
    /// number of singleton pivots
    n1: usize,
    l: Vec<LColumn>,
    u: Vec<URow>,
    /// pattern of the last pivot row of U (empty unless the matrix is singular or rectangular)
    upattern: Vec<usize>,
}

/// Which factor data a block of the arena belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Owner {
    L(usize),
    U(usize),
    /// transient kernel data held by a builder
    Element(usize),
}

/// A live region of the arena head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    pub owner: Owner,
    pub offset: Offset,
    pub units: usize,
}

impl FactorStore {
    pub fn new(n1: usize) -> Self {
        FactorStore {
            n1,
            ..Default::default()
        }
    }

    pub(crate) fn from_parts(n1: usize, l: Vec<LColumn>, u: Vec<URow>, upattern: Vec<usize>) -> Self {
        FactorStore { n1, l, u, upattern }
    }

    pub fn n1(&self) -> usize {
        self.n1
    }

    /// Number of pivots, i.e. of `L` columns.
    pub fn npiv(&self) -> usize {
        self.l.len()
    }

    pub fn l_columns(&self) -> &[LColumn] {
        &self.l
    }

    pub fn u_rows(&self) -> &[URow] {
        &self.u
    }

    pub fn upattern(&self) -> &[usize] {
        &self.upattern
    }

    pub(crate) fn push_l(&mut self, col: LColumn) {
        self.l.push(col);
    }

    pub(crate) fn push_u(&mut self, row: URow) {
        self.u.push(row);
    }

    pub(crate) fn set_upattern(&mut self, cols: &[usize]) {
        self.upattern = cols.to_vec();
    }

    /// Points the data of `owner` at a new offset after it has been moved.
    pub(crate) fn relocate(&mut self, owner: Owner, offset: Offset) {
        match owner {
            Owner::L(k) => self.l[k] = self.l[k].with_offset(offset),
            Owner::U(k) => self.u[k] = self.u[k].with_offset(offset),
            Owner::Element(_) => {}
        }
    }

    /// Number of values stored for each column of `L` (its full pattern size).
    pub fn l_degrees(&self) -> Vec<usize> {
        let mut deg = 0usize;
        self.l
            .iter()
            .map(|col| match *col {
                LColumn::Singleton { len, .. } => len,
                LColumn::ChainStart { len, .. } => {
                    deg = len;
                    deg
                }
                LColumn::ChainContinuation { len, .. } => {
                    deg = deg.saturating_sub(1) + len;
                    deg
                }
            })
            .collect()
    }

    /// Number of values stored for each row of `U` (its off-diagonal pattern size).
    ///
    /// Requires every row to be present: the chained rows are replayed from the last one.
    pub fn u_degrees(&self) -> Vec<usize> {
        let npiv = self.u.len();
        let mut degrees = vec![0; npiv];
        let mut deg = self.upattern.len();
        for k in (self.n1..npiv).rev() {
            degrees[k] = deg;
            deg = match self.u[k] {
                URow::Singleton { len, .. } | URow::ChainStart { len, .. } => len,
                URow::ChainContinuation { len, restore, .. } => {
                    deg.saturating_sub(len) + usize::from(restore.is_some())
                }
            };
        }
        for (k, row) in self.u.iter().enumerate().take(self.n1.min(npiv)) {
            degrees[k] = row.explicit_len();
        }
        degrees
    }

    /// Every block of factor data currently referenced, with its size in units.
    pub(crate) fn blocks<T: Entry>(&self) -> Vec<Block> {
        let l = self
            .l
            .iter()
            .zip(self.l_degrees())
            .enumerate()
            .map(|(k, (col, deg))| Block {
                owner: Owner::L(k),
                offset: col.offset(),
                units: l_block_units::<T>(col, deg),
            });
        let u = self
            .u
            .iter()
            .zip(self.u_degrees())
            .enumerate()
            .map(|(k, (row, deg))| Block {
                owner: Owner::U(k),
                offset: row.offset(),
                units: u_block_units::<T>(row, deg),
            });
        l.chain(u).collect()
    }
}

/// Units occupied by an `L` column whose full pattern has `deg` entries.
pub(crate) fn l_block_units<T: Entry>(col: &LColumn, deg: usize) -> usize {
    units_of::<usize>(col.explicit_len()) + units_of::<T>(deg)
}

/// Units occupied by a `U` row whose pattern has `deg` entries.
pub(crate) fn u_block_units<T: Entry>(row: &URow, deg: usize) -> usize {
    units_of::<usize>(row.explicit_len()) + units_of::<T>(deg)
}

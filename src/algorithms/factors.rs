use super::initializer::InitializationMethod;
use crate::error::{RecError, Result};
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};
use rand::Rng;

/// A dense, row-growable matrix of latent factors, one row per id.
#[derive(Debug, Clone)]
pub struct FactorMatrix {
    name: &'static str,
    data: Array2<f32>,
}

impl FactorMatrix {
    pub fn new(name: &'static str, num_factors: usize) -> Self {
        Self {
            name,
            data: Array2::zeros((0, num_factors)),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_factors(&self) -> usize {
        self.data.ncols()
    }

    /// Grows the matrix to at least `count` rows. New rows are zero-filled.
    /// Returns the index range of the rows that were added.
    pub fn add_rows(&mut self, count: usize) -> Result<std::ops::Range<usize>> {
        let old_rows = self.num_rows();
        if count > old_rows {
            let extra = Array2::zeros((count - old_rows, self.num_factors()));
            self.data.append(Axis(0), extra.view())?;
        }
        Ok(old_rows..self.num_rows())
    }

    pub fn init_row<R: Rng + ?Sized>(
        &mut self,
        row: usize,
        method: &InitializationMethod,
        rng: &mut R,
    ) -> Result<()> {
        let row_view = self.row_mut(row)?;
        method.fill(row_view, rng)
    }

    pub fn zero_row(&mut self, row: usize) -> Result<()> {
        self.row_mut(row)?.fill(0.0);
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f32> {
        let row_view = self.row(row)?;
        row_view
            .get(col)
            .copied()
            .ok_or(RecError::ColumnOutOfRange {
                col,
                num_factors: self.num_factors(),
            })
    }

    pub fn increment(&mut self, row: usize, col: usize, delta: f32) -> Result<()> {
        let num_factors = self.num_factors();
        let mut row_view = self.row_mut(row)?;
        let entry = row_view
            .get_mut(col)
            .ok_or(RecError::ColumnOutOfRange { col, num_factors })?;
        *entry += delta;
        Ok(())
    }

    pub fn row(&self, row: usize) -> Result<ArrayView1<'_, f32>> {
        self.check_row(row)?;
        Ok(self.data.row(row))
    }

    pub fn row_mut(&mut self, row: usize) -> Result<ArrayViewMut1<'_, f32>> {
        self.check_row(row)?;
        Ok(self.data.row_mut(row))
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row < self.num_rows() {
            Ok(())
        } else {
            Err(RecError::RowOutOfRange {
                matrix: self.name,
                row,
                rows: self.num_rows(),
            })
        }
    }
}

/// User and item factor matrices of one model.
#[derive(Debug, Clone)]
pub struct FactorStore {
    pub user_factors: FactorMatrix,
    pub item_factors: FactorMatrix,
}

impl FactorStore {
    pub fn new(num_factors: usize) -> Self {
        Self {
            user_factors: FactorMatrix::new("user", num_factors),
            item_factors: FactorMatrix::new("item", num_factors),
        }
    }

    pub fn num_factors(&self) -> usize {
        self.user_factors.num_factors()
    }

    pub fn contains(&self, user_id: usize, item_id: usize) -> bool {
        user_id < self.user_factors.num_rows() && item_id < self.item_factors.num_rows()
    }

    pub fn dot_product(&self, user_id: usize, item_id: usize) -> Result<f32> {
        let user_row = self.user_factors.row(user_id)?;
        let item_row = self.item_factors.row(item_id)?;
        Ok(user_row.dot(&item_row))
    }

    /// Mutable views of one user row and one item row at the same time.
    pub fn pair_rows_mut(
        &mut self,
        user_id: usize,
        item_id: usize,
    ) -> Result<(ArrayViewMut1<'_, f32>, ArrayViewMut1<'_, f32>)> {
        let user_row = self.user_factors.row_mut(user_id)?;
        let item_row = self.item_factors.row_mut(item_id)?;
        Ok((user_row, item_row))
    }
}

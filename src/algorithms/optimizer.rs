use super::factors::FactorStore;
use crate::error::Result;
use std::fmt::Debug;

/// Per-pair parameter update applied by the incremental model.
pub trait UpdateRule: Debug + Clone + Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn update_pair(
        &self,
        factors: &mut FactorStore,
        user_id: usize,
        item_id: usize,
        learn_rate: f32,
        regularization: f32,
        update_user: bool,
        update_item: bool,
    ) -> Result<()>;
}

/// Plain SGD step pulling the prediction of an observed pair towards 1.
///
/// Both sides read the factor values as they were before this pair touched
/// them, so the user update never sees an already moved item factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointwiseSgd;

impl UpdateRule for PointwiseSgd {
    fn update_pair(
        &self,
        factors: &mut FactorStore,
        user_id: usize,
        item_id: usize,
        learn_rate: f32,
        regularization: f32,
        update_user: bool,
        update_item: bool,
    ) -> Result<()> {
        let (mut user_row, mut item_row) = factors.pair_rows_mut(user_id, item_id)?;
        let err = 1.0 - user_row.dot(&item_row);

        for (u_f, i_f) in user_row.iter_mut().zip(item_row.iter_mut()) {
            let (u, i) = (*u_f, *i_f);
            if update_user {
                let delta_u = err * i - regularization * u;
                *u_f += learn_rate * delta_u;
            }
            if update_item {
                let delta_i = err * u - regularization * i;
                *i_f += learn_rate * delta_i;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::initializer::InitializationMethod;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store_with(user: f32, item: f32, num_factors: usize) -> FactorStore {
        let mut store = FactorStore::new(num_factors);
        let mut rng = StdRng::seed_from_u64(0);
        store.user_factors.add_rows(1).unwrap();
        store.item_factors.add_rows(1).unwrap();
        store
            .user_factors
            .init_row(0, &InitializationMethod::Constant { value: user }, &mut rng)
            .unwrap();
        store
            .item_factors
            .init_row(0, &InitializationMethod::Constant { value: item }, &mut rng)
            .unwrap();
        store
    }

    #[test]
    fn test_step_uses_pre_update_values() {
        // u = [0.5, 0.5], i = [1, 1]: err = 1 - 1 = 0, reg pulls both sides
        let mut store = store_with(0.5, 1.0, 2);
        PointwiseSgd
            .update_pair(&mut store, 0, 0, 0.1, 0.5, true, true)
            .unwrap();
        // u += 0.1 * (0 * 1 - 0.5 * 0.5), i += 0.1 * (0 * 0.5 - 0.5 * 1)
        for f in 0..2 {
            assert!((store.user_factors.get(0, f).unwrap() - 0.475).abs() < 1e-6);
            assert!((store.item_factors.get(0, f).unwrap() - 0.95).abs() < 1e-6);
        }
    }

    #[test]
    fn test_update_flags() {
        let mut store = store_with(1.0, 1.0, 2);
        PointwiseSgd
            .update_pair(&mut store, 0, 0, 0.1, 0.0, false, true)
            .unwrap();
        assert_eq!(store.user_factors.row(0).unwrap().to_vec(), vec![1.0, 1.0]);
        assert!((store.item_factors.get(0, 1).unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_missing_row_is_error() {
        let mut store = store_with(1.0, 1.0, 2);
        assert!(PointwiseSgd
            .update_pair(&mut store, 3, 0, 0.1, 0.0, true, true)
            .is_err());
    }
}

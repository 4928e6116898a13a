use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Positive-only feedback: an ordered multiset of (user, item) pairs.
///
/// Pairs are stored column-wise so an epoch can walk a permutation of
/// indices without touching the pairs themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosOnlyFeedback {
    users: Vec<usize>,
    items: Vec<usize>,
}

impl PosOnlyFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut feedback = Self::new();
        for (user_id, item_id) in pairs {
            feedback.add(user_id, item_id);
        }
        feedback
    }

    pub fn add(&mut self, user_id: usize, item_id: usize) {
        self.users.push(user_id);
        self.items.push(item_id);
    }

    /// Removes one occurrence of the pair. Returns false if it was not present.
    pub fn remove(&mut self, user_id: usize, item_id: usize) -> bool {
        let position = self
            .users
            .iter()
            .zip(self.items.iter())
            .position(|(&u, &i)| u == user_id && i == item_id);

        match position {
            Some(index) => {
                self.users.remove(index);
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops every pair of the given user, returning how many were removed.
    pub fn remove_user(&mut self, user_id: usize) -> usize {
        self.retain(|u, _| u != user_id)
    }

    /// Drops every pair of the given item, returning how many were removed.
    pub fn remove_item(&mut self, item_id: usize) -> usize {
        self.retain(|_, i| i != item_id)
    }

    fn retain<F>(&mut self, keep: F) -> usize
    where
        F: Fn(usize, usize) -> bool,
    {
        let before = self.len();
        let (users, items): (Vec<usize>, Vec<usize>) = self
            .iter()
            .filter(|&(u, i)| keep(u, i))
            .unzip();
        self.users = users;
        self.items = items;
        before - self.len()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// The pair stored at `index`.
    pub fn pair(&self, index: usize) -> Option<(usize, usize)> {
        Some((*self.users.get(index)?, *self.items.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.users.iter().copied().zip(self.items.iter().copied())
    }

    pub fn max_user_id(&self) -> Option<usize> {
        self.users.iter().copied().max()
    }

    pub fn max_item_id(&self) -> Option<usize> {
        self.items.iter().copied().max()
    }

    /// Distinct users in ascending order.
    pub fn all_users(&self) -> Vec<usize> {
        self.users.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Distinct items in ascending order.
    pub fn all_items(&self) -> Vec<usize> {
        self.items.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn user_items(&self) -> HashMap<usize, HashSet<usize>> {
        let mut by_user: HashMap<usize, HashSet<usize>> = HashMap::new();
        for (user_id, item_id) in self.iter() {
            by_user.entry(user_id).or_default().insert(item_id);
        }
        by_user
    }

    /// A fresh uniformly random permutation of the pair indices.
    pub fn random_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        indices
    }
}

impl FromIterator<(usize, usize)> for PosOnlyFeedback {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_remove_drops_single_occurrence() {
        let mut feedback = PosOnlyFeedback::from_pairs(vec![(0, 1), (0, 1), (2, 3)]);
        assert!(feedback.remove(0, 1));
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback.pair(0), Some((0, 1)));
        assert!(!feedback.remove(5, 5));
    }

    #[test]
    fn test_remove_user_and_item() {
        let mut feedback = PosOnlyFeedback::from_pairs(vec![(0, 1), (1, 1), (0, 2), (3, 4)]);
        assert_eq!(feedback.remove_user(0), 2);
        assert_eq!(feedback.remove_item(1), 1);
        assert_eq!(feedback.iter().collect::<Vec<_>>(), vec![(3, 4)]);
    }

    #[test]
    fn test_random_index_is_permutation() {
        let feedback: PosOnlyFeedback = (0..50).map(|k| (k % 7, k)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let mut index = feedback.random_index(&mut rng);
        index.sort_unstable();
        assert_eq!(index, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_distinct_users_and_items() {
        let feedback = PosOnlyFeedback::from_pairs(vec![(4, 2), (1, 2), (4, 0)]);
        assert_eq!(feedback.all_users(), vec![1, 4]);
        assert_eq!(feedback.all_items(), vec![0, 2]);
        assert_eq!(feedback.max_user_id(), Some(4));
        assert_eq!(feedback.user_items()[&4].len(), 2);
    }
}

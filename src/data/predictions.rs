use super::IdMapping;
use crate::algorithms::ItemRecommender;
use crate::error::Result;
use crate::models::PosOnlyFeedback;
use std::collections::HashSet;
use std::io::Write;

/// Writes ranked recommendations with external ids, one user per line:
/// `user<TAB>[item:score,item:score,...]`, best item first.
#[derive(Debug, Clone, Copy)]
pub struct PredictionWriter<'a> {
    user_mapping: &'a IdMapping,
    item_mapping: &'a IdMapping,
    num_items: Option<usize>,
    repeated_items: bool,
}

fn write_id<W: Write>(writer: &mut W, mapping: &IdMapping, id: usize) -> std::io::Result<()> {
    match mapping.to_original_id(id) {
        Some(original) => write!(writer, "{}", original),
        None => write!(writer, "{}", id),
    }
}

impl<'a> PredictionWriter<'a> {
    pub fn new(user_mapping: &'a IdMapping, item_mapping: &'a IdMapping) -> Self {
        Self {
            user_mapping,
            item_mapping,
            num_items: None,
            repeated_items: false,
        }
    }

    /// Items per user; `None` writes every candidate.
    pub fn with_num_items(mut self, num_items: Option<usize>) -> Self {
        self.num_items = num_items;
        self
    }

    /// Also recommend items the user already has in `train`.
    pub fn with_repeated_items(mut self, repeated_items: bool) -> Self {
        self.repeated_items = repeated_items;
        self
    }

    /// Returns the number of lines written.
    pub fn write<M: ItemRecommender, W: Write>(
        &self,
        model: &M,
        train: &PosOnlyFeedback,
        users: &[usize],
        candidates: &[usize],
        mut writer: W,
    ) -> Result<usize> {
        let train_by_user = train.user_items();
        let no_items = HashSet::new();

        for &user_id in users {
            let ignore_items = if self.repeated_items {
                &no_items
            } else {
                train_by_user.get(&user_id).unwrap_or(&no_items)
            };
            let ranked = model.recommend(user_id, self.num_items, ignore_items, candidates);

            write_id(&mut writer, self.user_mapping, user_id)?;
            write!(writer, "\t[")?;
            for (position, candidate) in ranked.iter().enumerate() {
                if position > 0 {
                    write!(writer, ",")?;
                }
                write_id(&mut writer, self.item_mapping, candidate.item_id)?;
                write!(writer, ":{}", model.predict(user_id, candidate.item_id))?;
            }
            writeln!(writer, "]")?;
        }

        writer.flush()?;
        Ok(users.len())
    }
}

//! Deficit-weighted item sampling
//!
//! An item's weight grows with how far its score sits below the mastery goal, with
//! how many more misses than (discounted) hits it has, and with a manual flag. Every
//! item keeps a baseline weight of 1 so mastered items still come back for review.

use crate::catalog::LearningItem;
use crate::progress::ItemStats;

use super::random::RandomSource;

/// Extra weight for items the learner flagged by hand
pub const MANUAL_FLAG_BOOST: f64 = 3.0;

/// Each correct answer cancels this much of one miss in the penalty term
pub const CORRECT_DISCOUNT: f64 = 0.3;

/// Multiplier on the weight of the item just shown
pub const REPEAT_DAMPING: f64 = 0.5;

/// Sampling weight of an item; always at least 1
pub fn compute_weight(item: &LearningItem, stats: &ItemStats, flagged: bool) -> f64 {
    let familiarity_gap = item.mastery_goal.saturating_sub(stats.score) as f64;
    let penalty = (stats.incorrect as f64 - stats.correct as f64 * CORRECT_DISCOUNT).max(0.0);
    let manual_boost = if flagged { MANUAL_FLAG_BOOST } else { 0.0 };
    1.0 + familiarity_gap + penalty + manual_boost
}

/// Draw one item from `pool` with probability proportional to its weight
///
/// The weight of `exclude_id` is halved to discourage immediate repeats. Returns
/// `None` only for an empty pool; callers substitute their default item.
pub fn pick_weighted_item<'a, W, R>(
    pool: &[&'a LearningItem],
    exclude_id: Option<&str>,
    weight_of: W,
    random: &mut R,
) -> Option<&'a LearningItem>
where
    W: Fn(&LearningItem) -> f64,
    R: RandomSource + ?Sized,
{
    let last = *pool.last()?;

    let weights: Vec<f64> = pool
        .iter()
        .map(|item| {
            let weight = weight_of(*item);
            if Some(item.id.as_str()) == exclude_id { weight * REPEAT_DAMPING } else { weight }
        })
        .collect();
    let total: f64 = weights.iter().sum();

    if total <= 0.0 {
        return Some(pool[random.pick_index(pool.len())]);
    }

    let mut threshold = random.next_f64() * total;
    for (item, weight) in pool.iter().zip(&weights) {
        threshold -= weight;
        if threshold <= 0.0 {
            return Some(*item);
        }
    }

    // Float rounding can leave a sliver above zero
    Some(last)
}

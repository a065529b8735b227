//! Multiple-choice options

use crate::catalog::LearningItem;

use super::random::{RandomSource, shuffle};

/// Number of options shown per question
pub const OPTION_COUNT: usize = 3;

/// Build the answer options for `item`
///
/// Distractors are drawn without replacement from same-category `candidates`. When
/// the category is too sparse to fill every slot, the first collected string is
/// repeated. The result is shuffled.
pub fn generate_options<R>(
    item: &LearningItem,
    candidates: &[&LearningItem],
    random: &mut R,
) -> Vec<String>
where
    R: RandomSource + ?Sized,
{
    let mut distractors: Vec<&LearningItem> = candidates
        .iter()
        .copied()
        .filter(|candidate| candidate.category == item.category && candidate.id != item.id)
        .collect();

    let mut selected = vec![item.transliteration.clone()];
    while selected.len() < OPTION_COUNT && !distractors.is_empty() {
        let picked = distractors.remove(random.pick_index(distractors.len()));
        if !selected.contains(&picked.transliteration) {
            selected.push(picked.transliteration.clone());
        }
    }

    while selected.len() < OPTION_COUNT {
        selected.push(selected[0].clone());
    }

    shuffle(random, &mut selected);
    selected
}

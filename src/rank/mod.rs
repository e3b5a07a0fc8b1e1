//! Descending ranks of the conditional scores, globally and per feature.


use crate::long_form::LongForm;
use crate::matrix::Axis;
use itertools::Itertools;
use log::{debug, info};

/// Rank values in descending order, with "min" ties.
///
/// The highest value gets rank 1 and tied values share the lowest rank of their block,
/// so that `[0.9, 0.5, 0.5, 0.1]` ranks as `[1, 2, 2, 4]`.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::rank::min_rank_descending;
/// assert_eq!(min_rank_descending(&[0.1, 0.9, 0.5, 0.5]), [4, 1, 2, 2]);
/// assert!(min_rank_descending(&[]).is_empty());
/// ```
pub fn min_rank_descending(values: &[f64]) -> Vec<usize> {
    // stable sort, so that equal values keep their input order
    let order = (0..values.len()).sorted_by(|a, b| values[*b].total_cmp(&values[*a])).collect_vec();

    let mut ranks = vec![0; values.len()];
    let mut rank = 0;
    for (position, i) in order.iter().enumerate() {
        if position == 0 || values[*i] != values[order[position - 1]] {
            rank = position + 1;
        }
        ranks[*i] = rank;
    }
    ranks
}

/// Rank the pairs sharing the same feature on `axis`.
fn rank_within(long_form: &LongForm, axis: Axis) -> Vec<usize> {
    let mut ranks = vec![0; long_form.pairs.len()];
    let groups = long_form.pairs.iter().enumerate().map(|(i, pair)| (pair.id(axis), i)).into_group_map();
    for indices in groups.values() {
        let values = indices.iter().map(|i| long_form.pairs[*i].conditional).collect_vec();
        for (i, rank) in indices.iter().zip(min_rank_descending(&values)) {
            ranks[*i] = rank;
        }
    }
    debug!("Ranked {} {axis} features.", groups.len());
    ranks
}

/// Fill the global and per-feature ranks of every pair.
///
/// Ranks only depend on the conditional scores, so the same input always gives the same
/// ranks.
pub fn annotate_ranks(long_form: LongForm) -> LongForm {
    let scores = long_form.pairs.iter().map(|p| p.conditional).collect_vec();
    let global = min_rank_descending(&scores);
    let omic1 = rank_within(&long_form, Axis::Omic1);
    let omic2 = rank_within(&long_form, Axis::Omic2);

    let mut long_form = long_form;
    for (i, pair) in long_form.pairs.iter_mut().enumerate() {
        pair.ranked_conditional = global[i];
        pair.rank_omic1 = omic1[i];
        pair.rank_omic2 = omic2[i];
    }
    info!("Ranked {} pairs.", long_form.pairs.len());
    long_form
}

/// Keep the pairs whose per-feature ranks do not exceed the caps.
///
/// A cap of 0 disables it.
pub fn cap_ranks(long_form: &LongForm, max_omic1: usize, max_omic2: usize) -> LongForm {
    let within = |rank: usize, max: usize| max == 0 || rank <= max;
    let capped = long_form.retain(|p| within(p.rank_omic1, max_omic1) && within(p.rank_omic2, max_omic2));
    if capped.pairs.len() < long_form.pairs.len() {
        info!(
            "Rank caps ({max_omic1}, {max_omic2}) kept {} of {} pairs.",
            capped.pairs.len(),
            long_form.pairs.len()
        );
    }
    capped
}

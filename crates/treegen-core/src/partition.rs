//! Integer partitions and constrained compositions.
//!
//! Enumeration order is fixed: lexicographically largest-first. Callers and
//! tests may rely on it.

/// Every non-increasing sequence of exactly `parts` integers, each at least
/// `min_part` (clamped to 1), summing to `sum`.
pub fn partitions(sum: usize, parts: usize, min_part: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    for_each_partition(sum, parts, min_part, |p| out.push(p.to_vec()));
    out
}

/// `partitions` for every part count from 1 to `max_parts`, ascending.
pub fn partitions_at_most(sum: usize, max_parts: usize, min_part: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    for parts in 1..=max_parts {
        for_each_partition(sum, parts, min_part, |p| out.push(p.to_vec()));
    }
    out
}

/// Visitor form of `partitions`; the slice is only valid during the call.
pub fn for_each_partition<F>(sum: usize, parts: usize, min_part: usize, mut visit: F)
where
    F: FnMut(&[usize]),
{
    let min_part = min_part.max(1);
    let mut current = Vec::with_capacity(parts);
    descend(sum, parts, min_part, usize::MAX, &mut current, &mut visit);
}

fn descend<F>(
    remaining: usize,
    left: usize,
    min_part: usize,
    cap: usize,
    current: &mut Vec<usize>,
    visit: &mut F,
) where
    F: FnMut(&[usize]),
{
    if left == 0 {
        if remaining == 0 {
            visit(current);
        }
        return;
    }
    if remaining < left * min_part {
        return;
    }

    // Later parts are <= this one, so it must cover its share of the rest.
    let lo = min_part.max((remaining + left - 1) / left);
    let hi = cap.min(remaining - (left - 1) * min_part);
    if hi < lo {
        return;
    }
    for part in (lo..=hi).rev() {
        current.push(part);
        descend(remaining - part, left - 1, min_part, part, current, visit);
        current.pop();
    }
}

/// Ordered sequences with `lower.len()` positive parts summing to `sum`.
///
/// Part `i` is at least `lower[i]`; when `tied[i]` is set it is also at most
/// part `i - 1`. Used to spread a node budget over children whose leaf counts
/// are fixed, where `tied` marks children interchangeable with their left
/// neighbour.
pub fn compositions(sum: usize, lower: &[usize], tied: &[bool]) -> Vec<Vec<usize>> {
    let lower: Vec<usize> = lower.iter().map(|l| (*l).max(1)).collect();
    let mut suffix = vec![0usize; lower.len() + 1];
    for i in (0..lower.len()).rev() {
        suffix[i] = suffix[i + 1] + lower[i];
    }

    let mut out = Vec::new();
    if suffix[0] > sum {
        return out;
    }
    let mut current = Vec::with_capacity(lower.len());
    compose(sum, 0, &lower, tied, &suffix, &mut current, &mut out);
    out
}

fn compose(
    remaining: usize,
    pos: usize,
    lower: &[usize],
    tied: &[bool],
    suffix: &[usize],
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if pos == lower.len() {
        if remaining == 0 {
            out.push(current.clone());
        }
        return;
    }
    if remaining < suffix[pos] {
        return;
    }

    let mut hi = remaining - suffix[pos + 1];
    if pos > 0 && tied.get(pos).copied().unwrap_or(false) {
        hi = hi.min(current[pos - 1]);
    }
    let lo = lower[pos];
    if hi < lo {
        return;
    }
    for part in (lo..=hi).rev() {
        current.push(part);
        compose(remaining - part, pos + 1, lower, tied, suffix, current, out);
        current.pop();
    }
}

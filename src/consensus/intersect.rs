/// Cross-axis consensus: evidence that every active axis agrees on
use crate::consensus::point::IndexedPoint;

/// 0-based evidence indices whose 1-based id appears in every axis group,
/// in ascending order.
///
/// Disabled axes are omitted by the caller. With no groups at all every
/// evidence index qualifies.
pub fn intersect(evidence_count: usize, axis_groups: &[&[IndexedPoint]]) -> Vec<usize> {
    (1..=evidence_count)
        .filter(|&id| {
            axis_groups
                .iter()
                .all(|group| group.iter().any(|point| point.index == id))
        })
        .map(|id| id - 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(ids: &[usize]) -> Vec<IndexedPoint> {
        ids.iter().map(|&id| IndexedPoint::new(id, vec![])).collect()
    }

    #[test]
    fn test_total_overlap() {
        let features = group(&[1, 2, 3]);
        let positions = group(&[3, 2, 1]);
        assert_eq!(intersect(3, &[&features, &positions]), vec![0, 1, 2]);
    }

    #[test]
    fn test_partial_overlap() {
        let features = group(&[1, 2, 4]);
        let positions = group(&[2, 3, 4]);
        assert_eq!(intersect(4, &[&features, &positions]), vec![1, 3]);
    }

    #[test]
    fn test_no_overlap() {
        let features = group(&[1, 2]);
        let positions = group(&[3, 4]);
        assert!(intersect(4, &[&features, &positions]).is_empty());
    }

    #[test]
    fn test_single_axis() {
        let features = group(&[2, 3]);
        assert_eq!(intersect(3, &[&features]), vec![1, 2]);
    }

    #[test]
    fn test_no_axes_selects_everything() {
        assert_eq!(intersect(3, &[]), vec![0, 1, 2]);
        assert!(intersect(0, &[]).is_empty());
    }

    #[test]
    fn test_ids_outside_evidence_range_ignored() {
        let features = group(&[1, 7]);
        assert_eq!(intersect(2, &[&features]), vec![0]);
    }

    #[test]
    fn test_duplicate_members_do_not_double_count() {
        let features = group(&[1, 1]);
        let positions = group(&[2]);
        assert!(intersect(2, &[&features, &positions]).is_empty());
    }
}

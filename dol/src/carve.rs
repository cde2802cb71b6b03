use std::ops::Range;

/// Subtracts the `obstacles` from `nominal`, returning the uncovered parts of it as disjoint,
/// non-empty ranges in ascending order.
///
/// Obstacles may be given in any order and may overlap each other. An empty obstacle inside the
/// window still splits it, leaving two fragments that touch at its address.
pub fn carve(
    nominal: Range<u64>,
    obstacles: impl IntoIterator<Item = Range<u64>>,
) -> Vec<Range<u64>> {
    let mut obstacles: Vec<Range<u64>> = obstacles.into_iter().collect();
    obstacles.sort_by_key(|obstacle| obstacle.start);

    let mut fragments = Vec::new();
    let Range { mut start, end } = nominal;

    for obstacle in obstacles {
        if start >= end || obstacle.start >= end {
            // Sorted, so nothing after this can touch the window either.
            break;
        }

        if obstacle.start <= start && obstacle.end >= end {
            // Covers the whole window.
            start = end;
        } else if obstacle.start <= start && obstacle.end > start {
            // Covers the front of the window.
            start = obstacle.end;
        } else if obstacle.start > start {
            // Starts inside the window: everything before it is uncovered.
            fragments.push(start..obstacle.start);
            start = obstacle.end.min(end);
        }
        // Otherwise the obstacle ends before the window and changes nothing.
    }

    if start < end {
        fragments.push(start..end);
    }

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_obstacles() {
        assert_eq!(carve(0x100..0x200, []), [0x100..0x200]);
    }

    #[test]
    fn empty_nominal() {
        assert_eq!(carve(0x200..0x200, []), Vec::<Range<u64>>::new());
        assert_eq!(carve(0x200..0x100, []), Vec::<Range<u64>>::new());
        assert_eq!(carve(0x200..0x200, [0x100..0x300]), Vec::<Range<u64>>::new());
    }

    #[test]
    fn fully_covered() {
        assert_eq!(carve(0x100..0x200, [0x100..0x200]), Vec::<Range<u64>>::new());
        assert_eq!(carve(0x100..0x200, [0x80..0x280]), Vec::<Range<u64>>::new());
    }

    #[test]
    fn covered_by_pieces() {
        assert_eq!(
            carve(0x100..0x200, [0x180..0x200, 0x100..0x180]),
            Vec::<Range<u64>>::new()
        );
    }

    #[test]
    fn touching_endpoints() {
        // Ends exactly where the window starts.
        assert_eq!(carve(0x100..0x200, [0x80..0x100]), [0x100..0x200]);
        // Starts exactly where the window ends.
        assert_eq!(carve(0x100..0x200, [0x200..0x280]), [0x100..0x200]);
    }

    #[test]
    fn overlap_from_left() {
        assert_eq!(carve(0x100..0x200, [0x80..0x140]), [0x140..0x200]);
        assert_eq!(carve(0x100..0x200, [0x100..0x140]), [0x140..0x200]);
    }

    #[test]
    fn overlap_from_right() {
        assert_eq!(carve(0x100..0x200, [0x1C0..0x280]), [0x100..0x1C0]);
        assert_eq!(carve(0x100..0x200, [0x1C0..0x200]), [0x100..0x1C0]);
    }

    #[test]
    fn contained_splits() {
        assert_eq!(
            carve(0x100..0x200, [0x140..0x180]),
            [0x100..0x140, 0x180..0x200]
        );
    }

    #[test]
    fn multiple_fragments() {
        assert_eq!(
            carve(
                0x100..0x400,
                [0x300..0x380, 0x80..0x120, 0x180..0x200, 0x3C0..0x500]
            ),
            [0x120..0x180, 0x200..0x300, 0x380..0x3C0]
        );
    }

    #[test]
    fn overlapping_obstacles() {
        assert_eq!(
            carve(0x100..0x200, [0x110..0x180, 0x120..0x150, 0x170..0x190]),
            [0x100..0x110, 0x190..0x200]
        );
    }

    #[test]
    fn obstacles_outside_window() {
        assert_eq!(
            carve(0x100..0x200, [0x10..0x20, 0x300..0x400, 0x0..0x80]),
            [0x100..0x200]
        );
    }

    #[test]
    fn empty_obstacle_splits() {
        assert_eq!(
            carve(0x100..0x200, [0x150..0x150]),
            [0x100..0x150, 0x150..0x200]
        );
        // At either edge of the window it changes nothing.
        assert_eq!(
            carve(0x100..0x200, [0x100..0x100, 0x200..0x200]),
            [0x100..0x200]
        );
    }

    /// Every point of the window is either in an obstacle or in exactly one fragment, never both.
    #[test]
    fn partitions_window() {
        let nominal = 4..20;
        let candidates = [
            0..2,
            0..6,
            3..5,
            4..4,
            5..9,
            7..7,
            8..12,
            10..11,
            15..20,
            18..30,
            20..22,
        ];

        // Every subset of the candidates.
        for mask in 0u32..(1 << candidates.len()) {
            let obstacles: Vec<_> = candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, range)| range.clone())
                .collect();

            let fragments = carve(nominal.clone(), obstacles.clone());

            for pair in fragments.windows(2) {
                // Ordered and disjoint. Touching only happens at an empty obstacle.
                assert!(pair[0].end <= pair[1].start, "{obstacles:?} -> {fragments:?}");
                assert!(!pair[0].is_empty(), "{obstacles:?} -> {fragments:?}");
            }

            assert!(fragments.last().is_none_or(|f| !f.is_empty()));

            for point in nominal.clone() {
                let covered = obstacles.iter().any(|o| o.contains(&point));
                let in_fragments = fragments.iter().filter(|f| f.contains(&point)).count();
                assert_eq!(
                    in_fragments,
                    usize::from(!covered),
                    "point {point} with {obstacles:?} -> {fragments:?}"
                );
            }
        }
    }
}

// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, VecDeque};

use log::debug;

use crate::Link;

/// The result of network-group analysis: a connected-component id per
/// vertex. Two vertices in different groups are mutually unreachable, no
/// matter the search budget.
#[derive(Debug, Clone, Default)]
pub struct GroupAssignment {
    group_of: BTreeMap<i32, i32>,
    total_groups: i32,
}

impl GroupAssignment {
    /// The group of a vertex, or [None] for unknown vertex ids.
    pub fn group_of(&self, vertex: i32) -> Option<i32> {
        self.group_of.get(&vertex).copied()
    }

    pub fn total_groups(&self) -> i32 {
        self.total_groups
    }
}

/// Partitions the vertices implied by `links` into connected components
/// with an iterative BFS flood fill, assigning monotonically increasing
/// group ids starting at 0.
///
/// Adjacency is undirected: a link impassable in one (or even both)
/// directions still connects its endpoints for grouping purposes. Group ids
/// are deterministic for a given link set, but stable only within one
/// load/build cycle.
pub fn analyze_groups<'a, I: IntoIterator<Item = &'a Link>>(links: I) -> GroupAssignment {
    let mut adjacency: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
    for link in links {
        adjacency.entry(link.from_node).or_default().push(link.to_node);
        adjacency.entry(link.to_node).or_default().push(link.from_node);
    }

    let mut assignment = GroupAssignment::default();
    let mut queue = VecDeque::new();

    for &start in adjacency.keys() {
        if assignment.group_of.contains_key(&start) {
            continue;
        }

        let group = assignment.total_groups;
        assignment.total_groups += 1;

        assignment.group_of.insert(start, group);
        queue.push_back(start);
        while let Some(vertex) = queue.pop_front() {
            for &neighbor in &adjacency[&vertex] {
                if !assignment.group_of.contains_key(&neighbor) {
                    assignment.group_of.insert(neighbor, group);
                    queue.push_back(neighbor);
                }
            }
        }
    }

    debug!(
        "group analysis: {} vertices in {} groups",
        assignment.group_of.len(),
        assignment.total_groups
    );
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, IMPASSABLE};

    fn link(id: i32, from: i32, to: i32) -> Link {
        Link::new(
            id,
            from,
            to,
            vec![Point::default(), Point::new(1.0, 0.0, 0.0)],
            1.0,
            1.0,
        )
    }

    #[test]
    fn single_component_gets_one_group() {
        let links = vec![link(1, 10, 11), link(2, 11, 12), link(3, 12, 10)];
        let groups = analyze_groups(&links);
        assert_eq!(groups.total_groups(), 1);
        assert_eq!(groups.group_of(10), Some(0));
        assert_eq!(groups.group_of(12), Some(0));
        assert_eq!(groups.group_of(99), None);
    }

    #[test]
    fn islands_get_distinct_groups() {
        let links = vec![
            link(1, 10, 11),
            link(2, 20, 21),
            link(3, 21, 22),
            link(4, 30, 31),
        ];
        let groups = analyze_groups(&links);
        assert_eq!(groups.total_groups(), 3);
        assert_eq!(groups.group_of(10), groups.group_of(11));
        assert_eq!(groups.group_of(20), groups.group_of(22));
        assert_ne!(groups.group_of(10), groups.group_of(20));
        assert_ne!(groups.group_of(20), groups.group_of(30));
    }

    #[test]
    fn impassable_links_still_connect() {
        let mut one_way = link(1, 10, 11);
        one_way.reverse_cost = IMPASSABLE;
        let mut blocked = link(2, 11, 12);
        blocked.cost = IMPASSABLE;
        blocked.reverse_cost = IMPASSABLE;

        let groups = analyze_groups(&[one_way, blocked]);
        assert_eq!(groups.total_groups(), 1);
        assert_eq!(groups.group_of(10), groups.group_of(12));
    }
}

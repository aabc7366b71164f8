//! Keyed list reconciliation.

use core::hash::Hash;
use hashbrown::{HashMap, HashSet};

/// One step of turning a source key list into a target key list.
///
/// Indices always refer to the list as it is right before the step is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move<K> {
	Insert { item: K, at: usize },
	/// `to` is the index after `item` was taken out at `from`.
	Move { item: K, from: usize, to: usize },
	Remove { item: K, at: usize },
}

/// Calculates a minimal sequence of [`Move`]s that rearranges `source` into `target`.
///
/// Keys must be unique within each list. Keys present in both lists are never removed and re-inserted. Removals come
/// first, back to front. The longest run of surviving keys that is already in target order stays put, and everything
/// else is inserted or moved while scanning `target` left to right, each right after its predecessor in `target`.
#[must_use]
pub fn calculate_moves<K: Clone + Eq + Hash>(source: &[K], target: &[K]) -> Vec<Move<K>> {
	let target_indices: HashMap<&K, usize> = target.iter().enumerate().map(|(i, key)| (key, i)).collect();

	let mut moves = Vec::new();
	for (at, item) in source.iter().enumerate().rev() {
		if !target_indices.contains_key(item) {
			moves.push(Move::Remove { item: item.clone(), at });
		}
	}

	let mut working: Vec<&K> = source.iter().filter(|item| target_indices.contains_key(item)).collect();
	let stable: HashSet<&K> = {
		let positions = working.iter().map(|item| target_indices[item]).collect::<Vec<_>>();
		longest_increasing_subsequence(&positions).into_iter().map(|i| working[i]).collect()
	};

	for (i, item) in target.iter().enumerate() {
		let current = working.iter().position(|working| *working == item);
		if current.is_some() && stable.contains(item) {
			continue;
		}
		if let Some(from) = current {
			working.remove(from);
		}
		let to = match i {
			0 => 0,
			i => working.iter().position(|working| **working == target[i - 1]).map_or(0, |predecessor| predecessor + 1),
		};
		working.insert(to, item);
		moves.push(match current {
			Some(from) => Move::Move { item: item.clone(), from, to },
			None => Move::Insert { item: item.clone(), at: to },
		});
	}

	debug_assert!(working.iter().copied().eq(target.iter()));
	moves
}

/// Indices into `values` of one longest strictly increasing subsequence.
fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
	// `tails[k]` is the index of the smallest tail of any increasing run of length `k + 1`.
	let mut tails: Vec<usize> = Vec::new();
	let mut predecessors = vec![None; values.len()];
	for (i, value) in values.iter().enumerate() {
		let k = tails.partition_point(|&tail| values[tail] < *value);
		if k > 0 {
			predecessors[i] = Some(tails[k - 1]);
		}
		if k == tails.len() {
			tails.push(i);
		} else {
			tails[k] = i;
		}
	}

	let mut sequence = Vec::with_capacity(tails.len());
	let mut current = tails.last().copied();
	while let Some(i) = current {
		sequence.push(i);
		current = predecessors[i];
	}
	sequence.reverse();
	sequence
}

#[cfg(test)]
mod tests {
	use super::{calculate_moves, Move};

	fn apply(source: &[char], moves: &[Move<char>]) -> Vec<char> {
		let mut list = source.to_vec();
		for step in moves {
			match *step {
				Move::Insert { item, at } => list.insert(at, item),
				Move::Move { item, from, to } => {
					assert_eq!(list.remove(from), item);
					list.insert(to, item);
				}
				Move::Remove { item, at } => assert_eq!(list.remove(at), item),
			}
		}
		list
	}

	fn chars(s: &str) -> Vec<char> {
		s.chars().collect()
	}

	#[test]
	fn prepending_is_a_single_insert() {
		assert_eq!(calculate_moves(&chars("ABCD"), &chars("0ABCD")), [Move::Insert { item: '0', at: 0 }]);
	}

	#[test]
	fn identical_lists_need_no_moves() {
		assert!(calculate_moves(&chars("ABCD"), &chars("ABCD")).is_empty());
		assert!(calculate_moves::<char>(&[], &[]).is_empty());
	}

	#[test]
	fn reordering_only_moves() {
		let moves = calculate_moves(&chars("ABCD"), &chars("BCDA"));
		assert_eq!(moves, [Move::Move { item: 'A', from: 0, to: 3 }]);

		let moves = calculate_moves(&chars("ABCDE"), &chars("EDCBA"));
		assert!(moves.iter().all(|step| matches!(step, Move::Move { .. })));
		assert_eq!(moves.len(), 4);
		assert_eq!(apply(&chars("ABCDE"), &moves), chars("EDCBA"));
	}

	#[test]
	fn removals_come_first_with_source_indices() {
		let moves = calculate_moves(&chars("ABCDE"), &chars("BD"));
		assert_eq!(moves, [Move::Remove { item: 'E', at: 4 }, Move::Remove { item: 'C', at: 2 }, Move::Remove { item: 'A', at: 0 }]);
	}

	#[test]
	fn mixed_edits_reach_the_target() {
		for (source, target) in [("ABCD", "DXBAY"), ("", "ABC"), ("ABC", ""), ("ABCDEFG", "GFAXBEC"), ("AB", "BA")] {
			let (source, target) = (chars(source), chars(target));
			let moves = calculate_moves(&source, &target);
			assert_eq!(apply(&source, &moves), target, "{:?}", moves);
			for step in &moves {
				if let Move::Insert { item, .. } = step {
					assert!(!source.contains(item), "{:?} was re-inserted instead of moved", item);
				}
				if let Move::Remove { item, .. } = step {
					assert!(!target.contains(item), "{:?} was removed although it persists", item);
				}
			}
		}
	}
}

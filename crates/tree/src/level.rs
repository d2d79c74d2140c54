//! Summary folding: turn one tier into the next until a single branch is left.

use crate::assembler::TreeAssembler;
use crate::config::TreeConfig;
use crate::error::{Result, TreeError};
use crate::node::{Level, Node};
use crate::pool::{WorkKind, WorkRequest, WorkResult, WorkerPool};
use crate::sequencer::ChunkSequencer;
use doctree_splitter::TokenCounter;
use std::ops::Range;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Adjacent members of one tier folded into a single parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Member positions in the originating tier.
    pub range: Range<usize>,
    /// Non-empty member summaries joined with `'\n'`.
    pub text: String,
}

impl Branch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Walk `summaries` in order and group them into branches whose joined text
/// stays within `budget` tokens.
///
/// A new branch starts only when the current one already has a member and
/// appending the next summary would exceed the budget, so a single member
/// over budget still forms its own branch. Empty summaries cost nothing.
pub fn partition_branches<S: AsRef<str>>(
    summaries: &[S],
    budget: usize,
    counter: &dyn TokenCounter,
) -> Vec<Branch> {
    let mut branches = Vec::new();
    let mut current: Option<Branch> = None;

    for (idx, summary) in summaries.iter().enumerate() {
        let summary = summary.as_ref();
        let Some(branch) = current.as_mut() else {
            current = Some(Branch {
                range: idx..idx + 1,
                text: summary.to_string(),
            });
            continue;
        };

        let candidate = join_summary(&branch.text, summary);
        if counter.count(&candidate) > budget {
            branches.extend(current.take());
            current = Some(Branch {
                range: idx..idx + 1,
                text: summary.to_string(),
            });
        } else {
            branch.text = candidate;
            branch.range.end = idx + 1;
        }
    }

    branches.extend(current);
    branches
}

fn join_summary(text: &str, summary: &str) -> String {
    match (text.is_empty(), summary.is_empty()) {
        (_, true) => text.to_string(),
        (true, false) => summary.to_string(),
        (false, false) => format!("{text}\n{summary}"),
    }
}

/// Drives summary and keyword rounds through the pool and folds tiers.
pub struct LevelBuilder<'a> {
    pool: &'a WorkerPool,
    sequencer: &'a ChunkSequencer,
    counter: &'a dyn TokenCounter,
    config: &'a TreeConfig,
    cancel: &'a CancellationToken,
}

impl<'a> LevelBuilder<'a> {
    pub fn new(
        pool: &'a WorkerPool,
        sequencer: &'a ChunkSequencer,
        counter: &'a dyn TokenCounter,
        config: &'a TreeConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            pool,
            sequencer,
            counter,
            config,
            cancel,
        }
    }

    /// Request a summary (when `summaries` is set) and keywords (when the
    /// config asks for them) for every node, in one pool round. Results are
    /// written back by slot, so completion order never matters.
    pub async fn enrich(&self, nodes: &mut [Node], summaries: bool) -> Result<()> {
        if !summaries && !self.config.get_keywords {
            return Ok(());
        }

        let mut requests = Vec::new();
        for (slot, node) in nodes.iter().enumerate() {
            let text: Arc<str> = node.text.as_str().into();
            if summaries {
                requests.push(WorkRequest::new(slot, WorkKind::Summary, text.clone()));
            }
            if self.config.get_keywords {
                requests.push(WorkRequest::new(
                    slot,
                    WorkKind::Keywords {
                        max_keywords: self.config.num_keywords,
                    },
                    text,
                ));
            }
        }
        for output in self.pool.run_round(requests).await? {
            let node = nodes.get_mut(output.slot).ok_or_else(|| {
                TreeError::invariant(format!("work result for unknown slot {}", output.slot))
            })?;
            match output.result {
                WorkResult::Summary(summary) => node.summary = summary,
                WorkResult::Keywords(keywords) => node.keywords = keywords,
                WorkResult::Skipped => {}
                WorkResult::Embedding(_) => {
                    return Err(TreeError::invariant(
                        "embedding result in a summary/keyword round",
                    ))
                }
            }
        }
        Ok(())
    }

    /// Fold the assembler's current tier upward until one branch remains,
    /// then merge that branch into the root. Returns the number of folds.
    pub async fn fold(&self, assembler: &mut TreeAssembler) -> Result<usize> {
        for iteration in 1..=self.config.max_fold_iterations {
            if self.cancel.is_cancelled() {
                return Err(TreeError::Cancelled);
            }

            let (branches, mut parents) = {
                let tier = assembler.current_tier();
                let branches = partition_branches(
                    &summaries_of(tier),
                    self.config.branch_token_budget,
                    self.counter,
                );
                let texts: Vec<&str> = branches.iter().map(|b| b.text.as_str()).collect();
                let mut parents = self.sequencer.sequence(&texts, Level::Internal);
                for (parent, branch) in parents.iter_mut().zip(&branches) {
                    let members = &tier[branch.range.clone()];
                    parent.set_children(members.iter().map(|n| n.guid).collect());
                }
                (branches, parents)
            };

            log::debug!(
                "Fold {iteration}: {} nodes -> {} branches",
                assembler.current_tier().len(),
                branches.len()
            );

            self.enrich(&mut parents, true).await?;

            let tier = assembler.current_tier_mut();
            for (parent, branch) in parents.iter().zip(&branches) {
                for child in &mut tier[branch.range.clone()] {
                    child.parent_id = Some(parent.guid);
                }
            }

            if parents.len() == 1 {
                if let Some(survivor) = parents.pop() {
                    assembler.absorb_into_root(survivor);
                }
                log::debug!("Fold converged after {iteration} iterations");
                return Ok(iteration);
            }
            assembler.push_tier(parents);
        }

        Err(TreeError::FoldLimitExceeded {
            iterations: self.config.max_fold_iterations,
        })
    }
}

fn summaries_of(tier: &[Node]) -> Vec<&str> {
    tier.iter().map(|n| n.summary.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree_splitter::WordTokenCounter;
    use pretty_assertions::assert_eq;

    #[test]
    fn partition_respects_budget() {
        let counter = WordTokenCounter;
        let summaries = ["one two", "three", "four five six", "seven"];
        let branches = partition_branches(&summaries, 3, &counter);

        assert_eq!(
            branches,
            vec![
                Branch {
                    range: 0..2,
                    text: "one two\nthree".to_string(),
                },
                Branch {
                    range: 2..3,
                    text: "four five six".to_string(),
                },
                Branch {
                    range: 3..4,
                    text: "seven".to_string(),
                },
            ]
        );
        for branch in &branches {
            assert!(counter.count(&branch.text) <= 3);
        }
    }

    #[test]
    fn oversized_member_forms_its_own_branch() {
        let counter = WordTokenCounter;
        let summaries = ["a", "b c d e f", "g"];
        let branches = partition_branches(&summaries, 2, &counter);

        let ranges: Vec<_> = branches.iter().map(|b| b.range.clone()).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..3]);
        assert_eq!(branches[1].len(), 1);
    }

    #[test]
    fn empty_summaries_are_free() {
        let counter = WordTokenCounter;
        let summaries = ["", "x", "", "", "y"];
        let branches = partition_branches(&summaries, 2, &counter);

        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].range, 0..5);
        assert_eq!(branches[0].text, "x\ny");
    }

    #[test]
    fn partition_covers_every_member_once() {
        let counter = WordTokenCounter;
        let summaries: Vec<String> = (0..17).map(|i| "w ".repeat(i % 5 + 1)).collect();
        let branches = partition_branches(&summaries, 6, &counter);

        let mut next = 0;
        for branch in &branches {
            assert_eq!(branch.range.start, next);
            assert!(!branch.is_empty());
            next = branch.range.end;
        }
        assert_eq!(next, summaries.len());
    }

    #[test]
    fn no_summaries_no_branches() {
        let empty: [&str; 0] = [];
        assert!(partition_branches(&empty, 10, &WordTokenCounter).is_empty());
    }
}

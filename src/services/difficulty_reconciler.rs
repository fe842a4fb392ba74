//! 难度对账服务 - 业务能力层
//!
//! 把仓库里已有的题目和公开题库对上号，得到每道题的难度。

use std::collections::HashMap;

use tracing::debug;

use crate::models::{CatalogueEntry, Difficulty, TrackedProblem};

/// 按题号查找难度；题库中没有的题目记为 `Unknown`
pub fn reconcile(tracked: &[TrackedProblem], catalogue: &[CatalogueEntry]) -> Vec<Difficulty> {
    let by_id: HashMap<&str, Difficulty> = catalogue
        .iter()
        .map(|entry| (entry.problem_id.as_str(), entry.difficulty))
        .collect();

    let difficulties: Vec<Difficulty> = tracked
        .iter()
        .map(|problem| {
            by_id
                .get(problem.problem_id.as_str())
                .copied()
                .unwrap_or(Difficulty::Unknown)
        })
        .collect();

    debug!(
        "对账完成: {} 道题，其中 {} 道难度未知",
        difficulties.len(),
        difficulties.iter().filter(|d| !d.is_known()).count()
    );
    difficulties
}

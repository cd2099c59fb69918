use std::collections::HashMap;

use tracing::{debug, warn};

use crate::db::repositories::TaskRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::dependency::{
    BlockedReason, BlockedTask, DependencyResolution, TaskDependency,
};
use crate::models::task::{TaskRecord, TaskStatus};

/// Arena-style dependency graph built once per planning call and discarded.
/// Candidate tasks occupy the first `candidate_count` arena entries;
/// prerequisites hydrated from the repository (e.g. tasks already DONE and
/// therefore excluded from planning) are appended after them.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<TaskRecord>,
    candidate_count: usize,
    index: HashMap<String, usize>,
    prereqs: Vec<Vec<usize>>,
    orphaned: Vec<Vec<String>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Grey,
    Black,
}

impl TaskGraph {
    /// Assemble the arena from a candidate batch plus two lookups: the edge
    /// list per task and a by-id task resolver for prerequisites outside the
    /// batch. A prerequisite id neither in the batch nor resolvable is
    /// recorded as orphaned and keeps its dependent blocked.
    pub fn build<E, L>(
        candidates: Vec<TaskRecord>,
        mut edges_for: E,
        mut lookup: L,
    ) -> AppResult<TaskGraph>
    where
        E: FnMut(&str) -> AppResult<Vec<TaskDependency>>,
        L: FnMut(&str) -> AppResult<Option<TaskRecord>>,
    {
        let candidate_count = candidates.len();
        let mut tasks = candidates;
        let mut index = HashMap::new();
        for (idx, task) in tasks.iter().enumerate() {
            index.insert(task.id.clone(), idx);
        }

        let mut prereqs: Vec<Vec<usize>> = Vec::new();
        let mut orphaned: Vec<Vec<String>> = Vec::new();

        // The arena grows while we walk it: hydrated prerequisites get their
        // own edges expanded too, so transitive chains stay visible to the
        // cycle check.
        let mut cursor = 0;
        while cursor < tasks.len() {
            let task_id = tasks[cursor].id.clone();
            let mut resolved = Vec::new();
            let mut missing = Vec::new();

            for edge in edges_for(&task_id)? {
                if let Some(&existing) = index.get(&edge.depends_on_id) {
                    resolved.push(existing);
                    continue;
                }

                match lookup(&edge.depends_on_id)? {
                    Some(prereq) => {
                        let new_idx = tasks.len();
                        index.insert(prereq.id.clone(), new_idx);
                        tasks.push(prereq);
                        resolved.push(new_idx);
                    }
                    None => {
                        warn!(
                            target: "app::planner",
                            task_id = %task_id,
                            depends_on = %edge.depends_on_id,
                            "orphaned dependency, task stays blocked"
                        );
                        missing.push(edge.depends_on_id);
                    }
                }
            }

            prereqs.push(resolved);
            orphaned.push(missing);
            cursor += 1;
        }

        debug!(
            target: "app::planner",
            candidates = candidate_count,
            nodes = tasks.len(),
            "dependency graph assembled"
        );

        Ok(TaskGraph {
            tasks,
            candidate_count,
            index,
            prereqs,
            orphaned,
        })
    }

    pub fn candidates(&self) -> &[TaskRecord] {
        &self.tasks[..self.candidate_count]
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.index.contains_key(task_id)
    }

    /// White/grey/black depth-first search. A grey node reached from a grey
    /// node is a back edge, i.e. a cycle; the error names one implicated
    /// task.
    pub fn detect_cycle(&self) -> AppResult<()> {
        let mut colors = vec![Color::White; self.tasks.len()];
        for start in 0..self.tasks.len() {
            if colors[start] == Color::White {
                if let Some(node) = self.visit(start, &mut colors) {
                    return Err(AppError::validation(format!(
                        "circular dependency detected involving task {}",
                        self.tasks[node].id
                    )));
                }
            }
        }
        Ok(())
    }

    fn visit(&self, node: usize, colors: &mut [Color]) -> Option<usize> {
        colors[node] = Color::Grey;
        for &prereq in &self.prereqs[node] {
            match colors[prereq] {
                Color::Grey => return Some(prereq),
                Color::White => {
                    if let Some(found) = self.visit(prereq, colors) {
                        return Some(found);
                    }
                }
                Color::Black => {}
            }
        }
        colors[node] = Color::Black;
        None
    }

    fn is_ready(&self, idx: usize) -> bool {
        self.orphaned[idx].is_empty()
            && self.prereqs[idx]
                .iter()
                .all(|&prereq| self.tasks[prereq].status == TaskStatus::Done)
    }

    /// Candidate tasks whose prerequisites are all DONE.
    pub fn ready_tasks(&self) -> Vec<TaskRecord> {
        (0..self.candidate_count)
            .filter(|&idx| self.is_ready(idx))
            .map(|idx| self.tasks[idx].clone())
            .collect()
    }

    fn blocking_reasons(&self, idx: usize) -> Vec<BlockedReason> {
        let mut reasons = Vec::new();
        if self.prereqs[idx]
            .iter()
            .any(|&prereq| self.tasks[prereq].status != TaskStatus::Done)
        {
            reasons.push(BlockedReason::IncompleteDependency);
        }
        if !self.orphaned[idx].is_empty() {
            reasons.push(BlockedReason::OrphanedDependency);
        }
        reasons
    }
}

/// Diagnostic readiness breakdown. On a cycle the traversal state is not
/// trustworthy, so the whole batch is reported blocked rather than a partial
/// readiness computation.
pub fn resolution_from_graph(graph: &TaskGraph) -> DependencyResolution {
    let total_tasks = graph.candidate_count;

    if graph.detect_cycle().is_err() {
        let blocked_tasks: Vec<BlockedTask> = graph
            .candidates()
            .iter()
            .map(|task| BlockedTask {
                task: task.clone(),
                reasons: vec![BlockedReason::CircularDependency],
            })
            .collect();
        return DependencyResolution {
            ready_tasks: Vec::new(),
            blocked_count: blocked_tasks.len(),
            blocked_tasks,
            total_tasks,
            ready_count: 0,
        };
    }

    let mut ready_tasks = Vec::new();
    let mut blocked_tasks = Vec::new();
    for idx in 0..graph.candidate_count {
        if graph.is_ready(idx) {
            ready_tasks.push(graph.tasks[idx].clone());
        } else {
            blocked_tasks.push(BlockedTask {
                task: graph.tasks[idx].clone(),
                reasons: graph.blocking_reasons(idx),
            });
        }
    }

    DependencyResolution {
        ready_count: ready_tasks.len(),
        blocked_count: blocked_tasks.len(),
        ready_tasks,
        blocked_tasks,
        total_tasks,
    }
}

pub struct DependencyService {
    db: DbPool,
}

impl DependencyService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn build_graph(&self, tasks: Vec<TaskRecord>) -> AppResult<TaskGraph> {
        let conn = self.db.get_connection()?;
        TaskGraph::build(
            tasks,
            |task_id| TaskRepository::list_dependencies(&conn, task_id),
            |task_id| TaskRepository::find_by_id(&conn, task_id),
        )
    }

    pub fn resolve_dependencies(&self, tasks: Vec<TaskRecord>) -> AppResult<DependencyResolution> {
        let graph = self.build_graph(tasks)?;
        Ok(resolution_from_graph(&graph))
    }
}

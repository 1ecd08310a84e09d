//! Static task graph model and its derived input tables.

/// One result produced by a task: a byte amount delivered to a fixed list of
/// destination tasks. A destination may appear in several results of the
/// same task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub bytes: u32,
    pub dsts: Vec<usize>,
}

/// A node of the task graph.
///
/// `weight` is the computational cost in operations. The remaining fields
/// are derived once from the result lists when the graph is built:
/// `parents`, the distinct output peers with their per-peer byte totals, and
/// `n_result_inputs`, the number of incoming result references that must
/// arrive before the task becomes ready.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: usize,
    pub weight: f64,
    pub results: Vec<TaskResult>,
    pub parents: Vec<usize>,
    /// Distinct destination tasks, ascending
    pub out_peers: Vec<usize>,
    /// Total bytes sent to the matching entry of `out_peers`
    pub out_bytes: Vec<u64>,
    pub n_result_inputs: u32,
}

/// An immutable data-flow DAG plus a flat numbering of all task results.
///
/// `result_offsets[t]` maps task `t` to the id of its first result;
/// `result_owner` is the inverse map from result id back to the task.
#[derive(Debug)]
pub struct TaskGraph {
    pub tasks: Vec<Task>,
    pub result_offsets: Vec<usize>,
    pub result_owner: Vec<usize>,
}

impl TaskGraph {
    /// Builds the graph from raw `(weight, results)` descriptions and
    /// derives all input tables.
    pub fn new(raw: Vec<(f64, Vec<TaskResult>)>) -> TaskGraph {
        let ntasks = raw.len();

        let mut tasks: Vec<Task> = raw
            .into_iter()
            .enumerate()
            .map(|(id, (weight, results))| {
                let mut peers: Vec<usize> = results.iter().flat_map(|r| r.dsts.iter().copied()).collect();
                peers.sort_unstable();
                peers.dedup();

                let out_bytes = peers
                    .iter()
                    .map(|&peer| {
                        results
                            .iter()
                            .filter(|r| r.dsts.contains(&peer))
                            .map(|r| r.bytes as u64)
                            .sum()
                    })
                    .collect();

                Task {
                    id,
                    weight,
                    results,
                    parents: Vec::new(),
                    out_peers: peers,
                    out_bytes,
                    n_result_inputs: 0,
                }
            })
            .collect();

        // Invert the child lists into parent lists
        let mut parents: Vec<Vec<usize>> = vec![Vec::new(); ntasks];
        for task in &tasks {
            for &child in &task.out_peers {
                parents[child].push(task.id);
            }
        }
        for (task, parent_list) in tasks.iter_mut().zip(parents) {
            task.parents = parent_list;
        }

        // Flat result numbering
        let mut result_offsets = Vec::with_capacity(ntasks);
        let mut result_owner = Vec::new();
        let mut offset = 0;
        for task in &tasks {
            result_offsets.push(offset);
            offset += task.results.len();
            result_owner.extend(std::iter::repeat(task.id).take(task.results.len()));
        }

        // Count incoming result references per destination task
        let mut n_inputs = vec![0u32; ntasks];
        for task in &tasks {
            for result in &task.results {
                for &dst in &result.dsts {
                    n_inputs[dst] += 1;
                }
            }
        }
        for (task, n) in tasks.iter_mut().zip(n_inputs) {
            task.n_result_inputs = n;
        }

        TaskGraph {
            tasks,
            result_offsets,
            result_owner,
        }
    }

    pub fn ntasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn nresults(&self) -> usize {
        self.result_owner.len()
    }

    /// Flat result id for result `index` of task `taskid`.
    pub fn result_id(&self, taskid: usize, index: usize) -> usize {
        self.result_offsets[taskid] + index
    }

    pub fn result(&self, result_id: usize) -> &TaskResult {
        let owner = self.result_owner[result_id];
        &self.tasks[owner].results[result_id - self.result_offsets[owner]]
    }

    /// Total number of edges (parent, distinct child) in the graph.
    pub fn edges(&self) -> usize {
        self.tasks.iter().map(|t| t.out_peers.len()).sum()
    }

    /// Total bytes sent from `src` to `dst`.
    ///
    /// # Panics
    ///
    /// Panics if there is no edge from `src` to `dst`.
    pub fn send_amount(&self, src: usize, dst: usize) -> u64 {
        let task = &self.tasks[src];
        match task.out_peers.iter().position(|&peer| peer == dst) {
            Some(i) => task.out_bytes[i],
            None => panic!("no send found from {} to {}", src, dst),
        }
    }
}

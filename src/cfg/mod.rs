//! Lightweight control-flow graph extraction.
//!
//! Produces a coarse basic-block graph used only as a structural-similarity
//! signal (not a correctness analysis): unresolvable branch targets are
//! silently omitted rather than causing failures, and the extractor never
//! panics on malformed input.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

/// Branch instruction mnemonics that terminate a basic block.
static BRANCH_INSTRUCTIONS: &[&str] = &[
    "JMP", "JE", "JNE", "JZ", "JNZ", "JG", "JGE", "JL", "JLE", "JA", "JAE", "JB", "JBE", "JC",
    "JNC", "JO", "JNO", "JS", "JNS", "JP", "JNP", "JCXZ", "JECXZ", "JRCXZ", "LOOP", "LOOPE",
    "LOOPNE", "LOOPZ", "LOOPNZ", "CALL", "RET", "RETN", "RETF",
];

fn is_branch(mnemonic: &str) -> bool {
    BRANCH_INSTRUCTIONS.contains(&mnemonic)
}

fn is_return(mnemonic: &str) -> bool {
    matches!(mnemonic, "RET" | "RETN" | "RETF")
}

/// A coarse control-flow graph: block sizes plus an adjacency list keyed by
/// block index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    /// Total number of basic blocks.
    pub num_blocks: usize,
    /// Total number of edges between blocks.
    pub num_edges: usize,
    /// Instruction-line count of each block, in block order.
    pub block_sizes: Vec<usize>,
    /// Successor block indices for each block index.
    pub adj: HashMap<usize, Vec<usize>>,
}

impl ControlFlowGraph {
    /// An empty graph (zero blocks, zero edges) — the result for empty
    /// input code.
    pub fn empty() -> Self {
        Self {
            num_blocks: 0,
            num_edges: 0,
            block_sizes: Vec::new(),
            adj: HashMap::new(),
        }
    }
}

/// Strip a trailing NASM-style `;` comment from a line.
fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

struct Block {
    size: usize,
    /// Mnemonic of the instruction that closed the block, if any.
    terminator: Option<String>,
    /// Unresolved jump target named by the terminator, if it has one.
    target_label: Option<String>,
}

/// Extract a coarse control-flow graph from assembly `code`.
///
/// Labels (`name:`) start new blocks; branch instructions close the
/// current block. Empty input yields the all-zero [`ControlFlowGraph`].
pub fn extract(code: &str) -> ControlFlowGraph {
    let mut blocks: Vec<Block> = Vec::new();
    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut current_size = 0usize;
    let mut current_label: Option<String> = None;

    let mut close_block = |blocks: &mut Vec<Block>,
                            current_size: &mut usize,
                            terminator: Option<String>,
                            target_label: Option<String>| {
        if *current_size == 0 && terminator.is_none() {
            return;
        }
        blocks.push(Block {
            size: *current_size,
            terminator,
            target_label,
        });
        *current_size = 0;
    };

    for raw_line in code.lines() {
        let mut line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim();
            if !label.is_empty() && !label.contains(char::is_whitespace) {
                // Close whatever block was open before this label starts.
                close_block(&mut blocks, &mut current_size, None, None);
                current_label = Some(label.to_string());
                labels.insert(label.to_string(), blocks.len());
                line = line[colon_idx + 1..].trim();
                if line.is_empty() {
                    continue;
                }
            }
        }
        let _ = &current_label;

        current_size += 1;
        let mnemonic = line
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();

        if is_branch(&mnemonic) {
            let target = line
                .split_whitespace()
                .nth(1)
                .map(|t| t.trim_end_matches(',').to_string());
            close_block(&mut blocks, &mut current_size, Some(mnemonic), target);
        }
    }
    close_block(&mut blocks, &mut current_size, None, None);

    let num_blocks = blocks.len();
    if num_blocks == 0 {
        return ControlFlowGraph::empty();
    }

    let mut adj: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut num_edges = 0usize;

    for (idx, block) in blocks.iter().enumerate() {
        let mut successors = Vec::new();
        match block.terminator.as_deref() {
            Some(m) if is_return(m) => {}
            Some("JMP") => {
                if let Some(target) = block.target_label.as_deref().and_then(|t| labels.get(t)) {
                    successors.push(*target);
                }
            }
            Some(_) => {
                if idx + 1 < num_blocks {
                    successors.push(idx + 1);
                }
                if let Some(target) = block.target_label.as_deref().and_then(|t| labels.get(t)) {
                    if !successors.contains(target) {
                        successors.push(*target);
                    }
                }
            }
            None => {
                if idx + 1 < num_blocks {
                    successors.push(idx + 1);
                }
            }
        }
        num_edges += successors.len();
        adj.insert(idx, successors);
    }

    ControlFlowGraph {
        num_blocks,
        num_edges,
        block_sizes: blocks.iter().map(|b| b.size).collect(),
        adj,
    }
}

/// Build a `petgraph` directed graph mirroring a [`ControlFlowGraph`]'s
/// adjacency, for callers that want to run graph algorithms (reachability,
/// dominance, etc.) over the coarse CFG rather than the raw adjacency map.
pub fn to_petgraph(cfg: &ControlFlowGraph) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::new();
    let mut nodes: Vec<NodeIndex> = Vec::with_capacity(cfg.num_blocks);
    for i in 0..cfg.num_blocks {
        nodes.push(graph.add_node(i));
    }
    for (&from, successors) in &cfg.adj {
        for &to in successors {
            graph.add_edge(nodes[from], nodes[to], ());
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_code_yields_empty_cfg() {
        let cfg = extract("");
        assert_eq!(cfg.num_blocks, 0);
        assert_eq!(cfg.num_edges, 0);
        assert!(cfg.block_sizes.is_empty());
        assert!(cfg.adj.is_empty());
    }

    #[test]
    fn linear_code_is_a_single_block() {
        let cfg = extract("MOV EAX, 1\nMOV EBX, 2\nADD EAX, EBX");
        assert_eq!(cfg.num_blocks, 1);
        assert_eq!(cfg.block_sizes, vec![3]);
    }

    #[test]
    fn ret_terminated_block_has_no_successors() {
        let cfg = extract("MOV EAX, 1\nRET");
        assert!(cfg.num_blocks >= 1);
        let last = cfg.num_blocks - 1;
        assert_eq!(cfg.adj.get(&last).cloned().unwrap_or_default(), Vec::<usize>::new());
    }

    #[test]
    fn labels_start_new_blocks() {
        let cfg = extract("MOV EAX, 1\nJMP label1\nlabel1:\nMOV EBX, 2\nRET");
        assert!(cfg.num_blocks >= 2);
    }

    #[test]
    fn conditional_branch_creates_fallthrough_and_target_edges() {
        let cfg = extract("CMP EAX, 0\nJZ skip\nMOV EBX, 1\nskip:\nRET");
        assert!(cfg.num_blocks >= 2);
        assert!(cfg.num_edges >= 1);
    }

    #[test]
    fn unresolvable_targets_are_silently_omitted() {
        let cfg = extract("JMP nowhere\nRET");
        // nowhere never resolves to a label; the jmp block gets no edge.
        assert_eq!(cfg.adj.get(&0).cloned().unwrap_or_default(), Vec::<usize>::new());
    }
}

//! User journey shaping: session path frequencies to a Sankey graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_STEPS: u8 = 3;
pub const DEFAULT_PATH_LIMIT: u32 = 50;

/// A full session path (e.g. Home → Products → Cart) and how many sessions
/// followed it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialPath {
    pub path: Vec<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SankeyNode {
    /// `{page}_{depth}`; the same page at different depths is a different node.
    pub id: String,
    pub name: String,
    pub depth: usize,
    pub total_traffic: u64,
}

/// `source` and `target` index into [`SankeyData::nodes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SankeyData {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

#[derive(Default)]
struct NodeTraffic {
    incoming: u64,
    outgoing: u64,
}

fn node_index(
    nodes: &mut Vec<SankeyNode>,
    traffic: &mut Vec<NodeTraffic>,
    index_by_id: &mut HashMap<String, usize>,
    page: &str,
    depth: usize,
) -> usize {
    let id = format!("{page}_{depth}");
    if let Some(&idx) = index_by_id.get(&id) {
        return idx;
    }
    let idx = nodes.len();
    nodes.push(SankeyNode {
        id: id.clone(),
        name: page.to_string(),
        depth,
        total_traffic: 0,
    });
    traffic.push(NodeTraffic::default());
    index_by_id.insert(id, idx);
    idx
}

/// Build Sankey nodes and links from path frequencies.
///
/// Paths are truncated to `max_steps` pages. Nodes and links keep the order
/// in which they are first seen. A root node's traffic is what leaves it;
/// every other node's traffic is what arrives.
pub fn to_sankey(paths: &[SequentialPath], max_steps: usize) -> SankeyData {
    let mut nodes = Vec::new();
    let mut traffic = Vec::new();
    let mut index_by_id = HashMap::new();
    let mut links: Vec<SankeyLink> = Vec::new();
    let mut link_index: HashMap<(usize, usize), usize> = HashMap::new();

    for SequentialPath { path, count } in paths {
        let limited = &path[..path.len().min(max_steps)];
        for (depth, pair) in limited.windows(2).enumerate() {
            let source = node_index(&mut nodes, &mut traffic, &mut index_by_id, &pair[0], depth);
            let target =
                node_index(&mut nodes, &mut traffic, &mut index_by_id, &pair[1], depth + 1);

            match link_index.get(&(source, target)) {
                Some(&idx) => links[idx].value += count,
                None => {
                    link_index.insert((source, target), links.len());
                    links.push(SankeyLink {
                        source,
                        target,
                        value: *count,
                    });
                }
            }

            traffic[target].incoming += count;
            traffic[source].outgoing += count;
        }
    }

    for (node, traffic) in nodes.iter_mut().zip(&traffic) {
        node.total_traffic = if node.depth == 0 {
            traffic.outgoing
        } else {
            traffic.incoming
        };
    }

    SankeyData { nodes, links }
}

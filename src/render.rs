use std::collections::HashMap;

use petgraph::dot::Dot;
use petgraph::graph::Graph;

use crate::ir::Function;

pub(crate) type RegionTree = Graph<String, &'static str>;

/// Region tree of `func` with its loop nest hung off the regions that hold
/// the loop headers.
pub(crate) fn region_tree(func: &Function) -> RegionTree {
    let mut graph = RegionTree::new();

    let mut regions = HashMap::new();
    for (id, region) in func.regions() {
        let blocks = region
            .blocks
            .iter()
            .map(|&b| func.get_block(b).name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let entry = if region.has_entering_block || region.is_top_level() {
            ""
        } else {
            " (no entering block)"
        };
        let label = format!("region {} [{blocks}]{entry}", region.name);
        regions.insert(id, graph.add_node(label));
    }
    for (id, region) in func.regions() {
        if let Some(parent) = region.parent {
            graph.add_edge(regions[&parent], regions[&id], "contains");
        }
    }

    let mut loops = HashMap::new();
    for (id, lp) in func.loops() {
        let line = lp.start_line.map_or_else(|| "?".to_string(), |l| l.to_string());
        let mut label = format!("loop {} @{line}", lp.name);
        if let Some(latch) = lp.latch {
            let markers = func.get_block(latch).markers;
            if markers.parallel {
                label.push_str(" parallel");
            }
            if markers.divergent {
                label.push_str(" divergent");
            }
        }
        loops.insert(id, graph.add_node(label));
    }
    for (id, lp) in func.loops() {
        if let Some(parent) = lp.parent {
            graph.add_edge(loops[&parent], loops[&id], "nests");
        } else if let Some(region) = func.region_for(lp.header) {
            graph.add_edge(regions[&region], loops[&id], "header");
        }
    }

    graph
}

pub(crate) fn render_dot(graph: &RegionTree) -> String {
    format!("{}", Dot::new(graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Instruction, Markers};

    #[test]
    fn test_region_tree_shape() {
        let mut b = FunctionBuilder::new("f");
        let entry = b.block("entry", vec![Instruction::at(1)]);
        let header = b.block("header", vec![Instruction::at(2)]);
        let latch = b.block("latch", vec![Instruction::at(3)]);
        b.mark(
            latch,
            Markers {
                parallel: true,
                divergent: false,
            },
        );
        let top = b.region("top", None, &[entry, header, latch], false);
        b.region("body", Some(top), &[header, latch], true);
        let outer = b.add_loop("outer", None, header, Some(latch), None, Some(2), &[header, latch]);
        b.add_loop("inner", Some(outer), latch, None, None, None, &[latch]);
        let func = b.build().unwrap();

        let graph = region_tree(&func);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);

        let dot = render_dot(&graph);
        assert!(dot.contains("region body [header, latch]"));
        assert!(dot.contains("loop outer @2 parallel"));
        assert!(dot.contains("loop inner @?"));
    }
}

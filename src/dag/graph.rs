// src/dag/graph.rs

use std::collections::BTreeSet;

use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};

use crate::dag::DeclarationTable;

/// Producer -> consumer graph over the units of a declaration table.
///
/// Edges only exist for names that still have to be computed: a requirement
/// satisfied by `known` does not link the consumer to its producers, since
/// caller-supplied values win over unit outputs anyway.
///
/// The scheduler does not use this graph; it exists for pruning and
/// diagnostics.
#[derive(Debug, Clone)]
pub struct UnitGraph<'a> {
    graph: DiGraphMap<&'a str, ()>,
}

impl<'a> UnitGraph<'a> {
    pub fn build(table: &'a DeclarationTable, known: &BTreeSet<String>) -> Self {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for decl in table.units() {
            graph.add_node(decl.name.as_str());
        }

        for consumer in table.units() {
            for req in consumer.requires.iter().filter(|r| !known.contains(*r)) {
                for producer in table.providers_of(req) {
                    if producer.name != consumer.name {
                        graph.add_edge(producer.name.as_str(), consumer.name.as_str(), ());
                    }
                }
            }
        }

        Self { graph }
    }

    /// Units (sorted) needed to compute `targets`: the providers of each
    /// target plus, transitively, the providers of their requirements.
    pub fn units_needed_for(
        &self,
        table: &'a DeclarationTable,
        targets: &BTreeSet<String>,
    ) -> BTreeSet<&'a str> {
        let reversed = Reversed(&self.graph);
        let mut needed = BTreeSet::new();

        for target in targets {
            for producer in table.providers_of(target) {
                let start = producer.name.as_str();
                if needed.contains(start) {
                    continue;
                }
                let mut dfs = Dfs::new(reversed, start);
                while let Some(unit) = dfs.next(reversed) {
                    needed.insert(unit);
                }
            }
        }

        needed
    }

    /// Graphviz rendering.
    pub fn to_dot(&self) -> String {
        format!("{:?}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Table restricted to the units needed for `targets` given `known`.
pub fn prune_for(
    table: &DeclarationTable,
    targets: &BTreeSet<String>,
    known: &BTreeSet<String>,
) -> DeclarationTable {
    let wanted: BTreeSet<String> = targets.difference(known).cloned().collect();
    let graph = UnitGraph::build(table, known);
    let needed = graph.units_needed_for(table, &wanted);
    table.subset(needed)
}

//! Molecular graph produced by the SMILES parser.

use petgraph::algo::{bridges, connected_components, dijkstra};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::element::Element;

/// Bond multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Valence consumed by the bond on each endpoint (aromatic counts as 1).
    pub fn valence(self) -> u32 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

/// Tetrahedral chirality marker as written in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chirality {
    /// `@`
    AntiClockwise,
    /// `@@`
    Clockwise,
}

/// A single atom in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: &'static Element,
    pub aromatic: bool,
    pub isotope: Option<u16>,
    pub formal_charge: i8,
    /// Hydrogens carried by this atom (implicit, or the bracket `H` count).
    pub hydrogens: u8,
    pub chirality: Option<Chirality>,
    pub atom_class: Option<u32>,
    /// Whether the atom was written in brackets.
    pub bracket: bool,
}

impl Atom {
    pub fn atomic_number(&self) -> u8 {
        self.element.atomic_number
    }

    /// Hydrogen atoms written explicitly (`[H]`) are graph vertices but not skeleton atoms.
    pub fn is_hydrogen(&self) -> bool {
        self.element.atomic_number == 1
    }

    pub fn is_heavy(&self) -> bool {
        self.element.atomic_number > 1
    }
}

/// A bond between two atom indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
    pub order: BondOrder,
}

impl Bond {
    /// The endpoint opposite `atom`.
    pub fn other(&self, atom: usize) -> usize {
        if self.atom1 == atom {
            self.atom2
        } else {
            self.atom1
        }
    }
}

/// One bond seen from a given atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub atom: usize,
    pub bond: usize,
    pub order: BondOrder,
}

/// Molecular graph. Atom and bond indices are insertion order.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: UnGraph<Atom, BondOrder>,
}

impl Molecule {
    pub fn graph(&self) -> &UnGraph<Atom, BondOrder> {
        &self.graph
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atom(&self, index: usize) -> &Atom {
        &self.graph[NodeIndex::new(index)]
    }

    pub(crate) fn atom_mut(&mut self, index: usize) -> &mut Atom {
        &mut self.graph[NodeIndex::new(index)]
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> + '_ {
        self.graph.node_weights()
    }

    pub fn bond(&self, index: usize) -> Bond {
        let edge = EdgeIndex::new(index);
        let (a, b) = self
            .graph
            .edge_endpoints(edge)
            .unwrap_or((NodeIndex::end(), NodeIndex::end()));
        Bond {
            atom1: a.index(),
            atom2: b.index(),
            order: self.graph[edge],
        }
    }

    pub fn bonds(&self) -> impl Iterator<Item = Bond> + '_ {
        self.graph.edge_references().map(|e| Bond {
            atom1: e.source().index(),
            atom2: e.target().index(),
            order: *e.weight(),
        })
    }

    pub(crate) fn add_atom(&mut self, atom: Atom) -> usize {
        self.graph.add_node(atom).index()
    }

    pub(crate) fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) {
        self.graph
            .add_edge(NodeIndex::new(atom1), NodeIndex::new(atom2), order);
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<Bond> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|edge| self.bond(edge.index()))
    }

    /// Bonds incident to `atom`.
    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = Neighbor> + '_ {
        let node = NodeIndex::new(atom);
        self.graph.edges(node).map(move |e| {
            let other = if e.source() == node { e.target() } else { e.source() };
            Neighbor {
                atom: other.index(),
                bond: e.id().index(),
                order: *e.weight(),
            }
        })
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.neighbors(atom).count()
    }

    pub fn has_bond(&self, atom: usize, order: BondOrder) -> bool {
        self.neighbors(atom).any(|n| n.order == order)
    }

    /// Sum of bond valences on `atom`, aromatic bonds counted once.
    pub fn explicit_valence(&self, atom: usize) -> u32 {
        self.neighbors(atom).map(|n| n.order.valence()).sum()
    }

    /// Hydrogens on `atom`, including explicit `[H]` neighbours.
    pub fn total_hydrogens(&self, atom: usize) -> usize {
        let explicit = self
            .neighbors(atom)
            .filter(|n| self.atom(n.atom).is_hydrogen())
            .count();
        usize::from(self.atom(atom).hydrogens) + explicit
    }

    /// Number of connected components.
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Flags each bond that lies on a cycle (i.e. is not a bridge).
    pub fn ring_bonds(&self) -> Vec<bool> {
        let mut ring = vec![true; self.bond_count()];
        for bridge in bridges(&self.graph) {
            ring[bridge.id().index()] = false;
        }
        ring
    }

    /// Hydrogen-suppressed view of the graph used by topological descriptors.
    pub fn skeleton(&self) -> Skeleton {
        let graph = self.graph.filter_map(
            |index, atom| (!atom.is_hydrogen()).then_some(index.index()),
            |_, order| Some(*order),
        );
        Skeleton { graph }
    }
}

/// Graph restricted to non-hydrogen atoms, indexed locally.
#[derive(Debug, Clone)]
pub struct Skeleton {
    /// Node weights are the original atom indices.
    graph: UnGraph<usize, BondOrder>,
}

impl Skeleton {
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Original atom index of skeleton vertex `vertex`.
    pub fn atom_index(&self, vertex: usize) -> usize {
        self.graph[NodeIndex::new(vertex)]
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.graph.neighbors(NodeIndex::new(vertex)).count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
    }

    /// All-pairs shortest path lengths; `usize::MAX` marks disconnected pairs.
    pub fn distance_matrix(&self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut dist = vec![vec![usize::MAX; n]; n];
        for (start, row) in dist.iter_mut().enumerate() {
            for (node, d) in dijkstra(&self.graph, NodeIndex::new(start), None, |_| 1usize) {
                row[node.index()] = d;
            }
        }
        dist
    }

    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    #[test]
    fn ring_bonds_exclude_bridges() {
        // Cyclohexane with an ethyl tail.
        let mol = parse_smiles("CCC1CCCCC1").unwrap();
        let ring = mol.ring_bonds();
        assert_eq!(ring.iter().filter(|r| **r).count(), 6);
        assert!(!ring[0] && !ring[1]);
    }

    #[test]
    fn neighbors_report_the_opposite_atom() {
        let mol = parse_smiles("C=CO").unwrap();
        let around_middle: Vec<(usize, BondOrder)> =
            mol.neighbors(1).map(|n| (n.atom, n.order)).collect();
        assert_eq!(around_middle.len(), 2);
        assert!(around_middle.contains(&(0, BondOrder::Double)));
        assert!(around_middle.contains(&(2, BondOrder::Single)));
        assert_eq!(mol.explicit_valence(1), 3);
    }

    #[test]
    fn skeleton_drops_explicit_hydrogens() {
        let mol = parse_smiles("[H]OC").unwrap();
        let skeleton = mol.skeleton();
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.edge_count(), 1);
        assert_eq!(skeleton.atom_index(0), 1);
    }

    #[test]
    fn distances_are_path_lengths() {
        let skeleton = parse_smiles("CCCC.C").unwrap().skeleton();
        let dist = skeleton.distance_matrix();
        assert_eq!(dist[0][3], 3);
        assert_eq!(dist[1][2], 1);
        assert_eq!(dist[0][4], usize::MAX);
        assert_eq!(skeleton.component_count(), 2);
    }
}

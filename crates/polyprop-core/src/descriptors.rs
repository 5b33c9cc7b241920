//! Named molecular descriptors computed from a parsed graph.
//!
//! The registry is a static ordered table; its order is the order of every
//! [`DescriptorVector`].

use petgraph::algo::connected_components;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::element::{HYDROGEN_EXACT_MASS, HYDROGEN_MASS};
use crate::error::{PredictError, PredictResult};
use crate::molecule::{BondOrder, Molecule, Skeleton};
use crate::smiles::parse_smiles;

/// A registered descriptor.
pub struct Descriptor {
    pub name: &'static str,
    compute: fn(&GraphContext<'_>) -> f64,
}

/// Graph data shared by all descriptors of one molecule.
struct GraphContext<'a> {
    mol: &'a Molecule,
    skeleton: Skeleton,
    distances: Vec<Vec<usize>>,
    ring_bonds: Vec<bool>,
}

impl<'a> GraphContext<'a> {
    fn new(mol: &'a Molecule) -> Self {
        let skeleton = mol.skeleton();
        let distances = skeleton.distance_matrix();
        let ring_bonds = mol.ring_bonds();
        Self {
            mol,
            skeleton,
            distances,
            ring_bonds,
        }
    }

    fn count_atoms(&self, predicate: impl Fn(u8) -> bool) -> f64 {
        self.mol
            .atoms()
            .filter(|a| predicate(a.atomic_number()))
            .count() as f64
    }

    fn has_bond(&self, atom: usize, order: BondOrder) -> bool {
        self.mol.has_bond(atom, order)
    }

    fn heavy_degree(&self, atom: usize) -> usize {
        self.mol
            .neighbors(atom)
            .filter(|n| !self.mol.atom(n.atom).is_hydrogen())
            .count()
    }
}

static REGISTRY: &[Descriptor] = &[
    Descriptor { name: "MolWt", compute: mol_wt },
    Descriptor { name: "HeavyAtomMolWt", compute: heavy_atom_mol_wt },
    Descriptor { name: "ExactMolWt", compute: exact_mol_wt },
    Descriptor { name: "NumValenceElectrons", compute: num_valence_electrons },
    Descriptor { name: "HeavyAtomCount", compute: heavy_atom_count },
    Descriptor { name: "NumHeteroatoms", compute: num_heteroatoms },
    Descriptor { name: "NHOHCount", compute: nhoh_count },
    Descriptor { name: "NOCount", compute: no_count },
    Descriptor { name: "NumHDonors", compute: num_h_donors },
    Descriptor { name: "NumHAcceptors", compute: num_h_acceptors },
    Descriptor { name: "NumRotatableBonds", compute: num_rotatable_bonds },
    Descriptor { name: "RingCount", compute: ring_count },
    Descriptor { name: "NumAromaticRings", compute: num_aromatic_rings },
    Descriptor { name: "NumAliphaticRings", compute: num_aliphatic_rings },
    Descriptor { name: "FractionCSP3", compute: fraction_csp3 },
    Descriptor { name: "TPSA", compute: tpsa },
    Descriptor { name: "Chi0", compute: chi0 },
    Descriptor { name: "Chi1", compute: chi1 },
    Descriptor { name: "BalabanJ", compute: balaban_j },
    Descriptor { name: "WienerIndex", compute: wiener_index },
    Descriptor { name: "Zagreb1", compute: zagreb1 },
    Descriptor { name: "NumHalogens", compute: num_halogens },
    Descriptor { name: "NumAttachmentPoints", compute: num_attachment_points },
    Descriptor { name: "NetFormalCharge", compute: net_formal_charge },
];

/// All registered descriptors in vector order.
pub fn registry() -> &'static [Descriptor] {
    REGISTRY
}

/// Registered descriptor names in vector order.
pub fn descriptor_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|d| d.name)
}

/// Ordered name → value mapping produced by [`extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorVector {
    values: Vec<(&'static str, f64)>,
}

impl DescriptorVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().copied()
    }
}

impl Serialize for DescriptorVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            // JSON has no NaN; undefined descriptors serialize as null.
            if value.is_finite() {
                map.serialize_entry(name, value)?;
            } else {
                map.serialize_entry(name, &Option::<f64>::None)?;
            }
        }
        map.end()
    }
}

/// Compute every registered descriptor for a parsed molecule.
pub fn compute_all(mol: &Molecule) -> DescriptorVector {
    let ctx = GraphContext::new(mol);
    DescriptorVector {
        values: REGISTRY
            .iter()
            .map(|d| (d.name, (d.compute)(&ctx)))
            .collect(),
    }
}

/// Parse `smiles` and compute its descriptor vector.
pub fn extract(smiles: &str) -> PredictResult<DescriptorVector> {
    let mol = parse_smiles(smiles).map_err(|e| PredictError::invalid_molecule(smiles, e))?;
    Ok(compute_all(&mol))
}

// ---------------------------------------------------------------------------
// Constitutional
// ---------------------------------------------------------------------------

fn mol_wt(ctx: &GraphContext<'_>) -> f64 {
    ctx.mol
        .atoms()
        .map(|a| a.element.average_mass + f64::from(a.hydrogens) * HYDROGEN_MASS)
        .sum()
}

fn heavy_atom_mol_wt(ctx: &GraphContext<'_>) -> f64 {
    ctx.mol
        .atoms()
        .filter(|a| !a.is_hydrogen())
        .map(|a| a.element.average_mass)
        .sum()
}

fn exact_mol_wt(ctx: &GraphContext<'_>) -> f64 {
    ctx.mol
        .atoms()
        .map(|a| {
            let mass = match a.isotope {
                Some(isotope) if !a.element.is_wildcard() => f64::from(isotope),
                _ => a.element.monoisotopic_mass,
            };
            mass + f64::from(a.hydrogens) * HYDROGEN_EXACT_MASS
        })
        .sum()
}

fn num_valence_electrons(ctx: &GraphContext<'_>) -> f64 {
    ctx.mol
        .atoms()
        .map(|a| {
            f64::from(a.element.valence_electrons) + f64::from(a.hydrogens)
                - f64::from(a.formal_charge)
        })
        .sum()
}

fn heavy_atom_count(ctx: &GraphContext<'_>) -> f64 {
    ctx.count_atoms(|z| z > 1)
}

fn num_heteroatoms(ctx: &GraphContext<'_>) -> f64 {
    ctx.count_atoms(|z| !matches!(z, 0 | 1 | 6))
}

fn nhoh_count(ctx: &GraphContext<'_>) -> f64 {
    (0..ctx.mol.atom_count())
        .filter(|&i| matches!(ctx.mol.atom(i).atomic_number(), 7 | 8))
        .map(|i| ctx.mol.total_hydrogens(i) as f64)
        .sum()
}

fn no_count(ctx: &GraphContext<'_>) -> f64 {
    ctx.count_atoms(|z| matches!(z, 7 | 8))
}

fn num_h_donors(ctx: &GraphContext<'_>) -> f64 {
    (0..ctx.mol.atom_count())
        .filter(|&i| {
            matches!(ctx.mol.atom(i).atomic_number(), 7 | 8) && ctx.mol.total_hydrogens(i) > 0
        })
        .count() as f64
}

fn num_h_acceptors(ctx: &GraphContext<'_>) -> f64 {
    ctx.mol
        .atoms()
        .filter(|a| matches!(a.atomic_number(), 7 | 8) && a.formal_charge <= 0)
        .count() as f64
}

fn num_halogens(ctx: &GraphContext<'_>) -> f64 {
    ctx.count_atoms(|z| matches!(z, 9 | 17 | 35 | 53))
}

fn num_attachment_points(ctx: &GraphContext<'_>) -> f64 {
    ctx.count_atoms(|z| z == 0)
}

fn net_formal_charge(ctx: &GraphContext<'_>) -> f64 {
    ctx.mol
        .atoms()
        .map(|a| f64::from(a.formal_charge))
        .sum()
}

fn fraction_csp3(ctx: &GraphContext<'_>) -> f64 {
    let carbons: Vec<usize> = (0..ctx.mol.atom_count())
        .filter(|&i| ctx.mol.atom(i).atomic_number() == 6)
        .collect();
    if carbons.is_empty() {
        return f64::NAN;
    }
    let sp3 = carbons
        .iter()
        .filter(|&&i| {
            !ctx.mol.atom(i).aromatic
                && !ctx.has_bond(i, BondOrder::Double)
                && !ctx.has_bond(i, BondOrder::Triple)
        })
        .count();
    sp3 as f64 / carbons.len() as f64
}

// ---------------------------------------------------------------------------
// Bonds and rings
// ---------------------------------------------------------------------------

/// Non-ring single bonds between non-terminal heavy atoms, excluding bonds
/// adjacent to a triple bond.
fn num_rotatable_bonds(ctx: &GraphContext<'_>) -> f64 {
    ctx.mol
        .bonds()
        .enumerate()
        .filter(|(index, bond)| {
            bond.order == BondOrder::Single
                && !ctx.ring_bonds[*index]
                && [bond.atom1, bond.atom2].iter().all(|&a| {
                    !ctx.mol.atom(a).is_hydrogen()
                        && ctx.heavy_degree(a) >= 2
                        && !ctx.has_bond(a, BondOrder::Triple)
                })
        })
        .count() as f64
}

/// Cyclomatic number of the whole graph.
fn ring_count(ctx: &GraphContext<'_>) -> f64 {
    cyclomatic(
        ctx.mol.bond_count(),
        ctx.mol.atom_count(),
        ctx.mol.component_count(),
    )
}

/// Cyclomatic number of the subgraph formed by aromatic bonds.
fn num_aromatic_rings(ctx: &GraphContext<'_>) -> f64 {
    let aromatic = ctx.mol.graph().filter_map(
        |_, _| Some(()),
        |_, order| (*order == BondOrder::Aromatic).then_some(()),
    );
    let isolated = aromatic
        .node_indices()
        .filter(|&v| aromatic.neighbors(v).next().is_none())
        .count();
    let vertices = aromatic.node_count() - isolated;
    let components = connected_components(&aromatic) - isolated;
    cyclomatic(aromatic.edge_count(), vertices, components)
}

fn num_aliphatic_rings(ctx: &GraphContext<'_>) -> f64 {
    (ring_count(ctx) - num_aromatic_rings(ctx)).max(0.0)
}

fn cyclomatic(edges: usize, vertices: usize, components: usize) -> f64 {
    (edges + components).saturating_sub(vertices) as f64
}

// ---------------------------------------------------------------------------
// Polar surface area (Ertl fragment contributions)
// ---------------------------------------------------------------------------

fn tpsa(ctx: &GraphContext<'_>) -> f64 {
    (0..ctx.mol.atom_count())
        .map(|i| tpsa_contribution(ctx, i))
        .sum()
}

fn tpsa_contribution(ctx: &GraphContext<'_>, index: usize) -> f64 {
    let atom = ctx.mol.atom(index);
    let hydrogens = ctx.mol.total_hydrogens(index);
    let degree = ctx.heavy_degree(index);
    let has_double = ctx.has_bond(index, BondOrder::Double);
    let has_triple = ctx.has_bond(index, BondOrder::Triple);

    match atom.atomic_number() {
        7 => {
            if atom.formal_charge > 0 {
                return match hydrogens {
                    3.. => 27.64,
                    2 => 25.59,
                    1 => 23.47,
                    _ => 0.0,
                };
            }
            if atom.aromatic {
                return if hydrogens >= 1 { 15.79 } else { 12.89 };
            }
            if has_triple {
                return 23.79;
            }
            match (degree, hydrogens, has_double) {
                (1, 2, _) | (0, 3, _) => 26.02,
                (1, 1, true) => 23.85,
                (2, 1, false) => 12.03,
                (2, 0, true) => 12.36,
                (3, 0, false) => 3.24,
                _ if hydrogens >= 2 => 26.02,
                _ if hydrogens == 1 => 12.03,
                _ => 3.24,
            }
        }
        8 => {
            if atom.formal_charge < 0 {
                return 23.06;
            }
            if atom.aromatic {
                return 13.14;
            }
            match (degree, hydrogens, has_double) {
                (1, 1, false) | (0, 2, _) => 20.23,
                (1, 0, true) => 17.07,
                (2, 0, false) => 9.23,
                _ if hydrogens >= 1 => 20.23,
                _ if has_double => 17.07,
                _ => 9.23,
            }
        }
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Topological indices (hydrogen-suppressed skeleton)
// ---------------------------------------------------------------------------

fn chi0(ctx: &GraphContext<'_>) -> f64 {
    (0..ctx.skeleton.len())
        .map(|v| ctx.skeleton.degree(v))
        .filter(|&d| d > 0)
        .map(|d| 1.0 / (d as f64).sqrt())
        .sum()
}

fn chi1(ctx: &GraphContext<'_>) -> f64 {
    ctx.skeleton
        .edges()
        .map(|(a, b)| {
            let product = (ctx.skeleton.degree(a) * ctx.skeleton.degree(b)) as f64;
            1.0 / product.sqrt()
        })
        .sum()
}

fn wiener_index(ctx: &GraphContext<'_>) -> f64 {
    let n = ctx.skeleton.len();
    let mut total = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            if ctx.distances[i][j] != usize::MAX {
                total += ctx.distances[i][j];
            }
        }
    }
    total as f64
}

fn zagreb1(ctx: &GraphContext<'_>) -> f64 {
    (0..ctx.skeleton.len())
        .map(|v| (ctx.skeleton.degree(v) * ctx.skeleton.degree(v)) as f64)
        .sum()
}

/// J = m / (mu + 1) * sum over edges of (s_i * s_j)^-0.5, with s the distance sums.
fn balaban_j(ctx: &GraphContext<'_>) -> f64 {
    let n = ctx.skeleton.len();
    let m = ctx.skeleton.edge_count();
    if n < 2 || m == 0 {
        return 0.0;
    }

    let sums: Vec<f64> = (0..n)
        .map(|i| {
            ctx.distances[i]
                .iter()
                .filter(|&&d| d != usize::MAX)
                .map(|&d| d as f64)
                .sum()
        })
        .collect();

    let mu = cyclomatic(m, n, ctx.skeleton.component_count());
    let edge_sum: f64 = ctx
        .skeleton
        .edges()
        .filter(|&(a, b)| sums[a] > 0.0 && sums[b] > 0.0)
        .map(|(a, b)| (sums[a] * sums[b]).powf(-0.5))
        .sum();

    m as f64 / (mu + 1.0) * edge_sum
}

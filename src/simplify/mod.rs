pub mod geo2topo;
pub mod simplifier;

pub mod anchor;
pub mod keys;
pub mod transform;

//! Location probing: train a small regressor on frozen predicted
//! representations and report its unnormalized error per validation split.

pub mod evaluator;
pub mod loss;
pub mod normalizer;
pub mod prober;
pub mod schedule;

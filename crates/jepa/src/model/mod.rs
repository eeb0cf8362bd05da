//! JEPA model components: frame encoder, action-conditioned predictor, and
//! the tensor bridge between host-side episodes and burn tensors.

pub mod bridge;
pub mod encoder;
pub mod jepa;
pub mod predictor;

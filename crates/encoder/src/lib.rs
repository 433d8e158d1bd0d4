//! Image and text encoders.
//!
//! The encoder is an external capability: a pretrained vision-language model
//! that maps both modalities into one embedding space. This crate defines the
//! capability trait and the providers that reach such a model.

pub mod encoder;
pub mod factory;
pub mod providers;
pub mod types;

pub use encoder::Encoder;
pub use factory::create_encoder;
pub use types::{ImageFormat, ImageInput, Modality};

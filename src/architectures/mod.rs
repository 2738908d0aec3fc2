//! Neural network building blocks and the transformer classifier

pub mod layers;
pub mod loss;
pub mod optim;
pub mod transformer;

pub use layers::{softmax_2d, Module, Param};
pub use loss::cross_entropy;
pub use optim::{clip_grad_norm, Adam, AdamConfig};
pub use transformer::{argmax, ClassifierConfig, EncoderLayer, TransformerClassifier};

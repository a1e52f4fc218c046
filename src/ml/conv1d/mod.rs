//! Small 1-D convolutional classifier over the scaled feature sequence.
//!
//! Conv1D (single input channel, `same` padding) → ReLU → MaxPool → Flatten → Dense → softmax.

mod model;
mod train;

pub use model::ConvNetModel;
pub use train::{ConvNetFit, ConvNetOptions, EpochStats, train_conv_net};

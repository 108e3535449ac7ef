//! CNN models for image classification.

mod resnet;

pub use resnet::{BasicBlock, Downsample, ResNet, ResNetConfig};

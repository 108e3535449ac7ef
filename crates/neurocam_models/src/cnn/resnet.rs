//! ResNet model architecture for image classification.
//!
//! Layer names follow the torchvision convention: `stem`, `layer{stage}`,
//! `layer{stage}.{block}` and `layer{stage}.{block}.conv{1,2}`, with stages
//! counted from 1 and blocks from 0. The default saliency target is the
//! second convolution of the last block, e.g. `layer4.1.conv2` for ResNet-18.

use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
    BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d,
};
use burn::prelude::*;
use burn::tensor::activation::relu;
use neurocam_core::{ExecutionContext, ImageShape, LayerObserver, Mode};
use serde::{Deserialize, Serialize};

use crate::norm::batch_norm_2d;

/// Configuration for the ResNet model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResNetConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output logits (1 for a binary sigmoid classifier).
    pub n_classes: usize,
    /// Number of residual blocks in each of the four stages.
    pub layers: [usize; 4],
    /// Number of filters in each of the four stages.
    pub widths: [usize; 4],
    /// Square input resolution in pixels.
    pub input_size: usize,
}

impl Default for ResNetConfig {
    fn default() -> Self {
        Self::resnet18(4)
    }
}

impl ResNetConfig {
    /// ResNet-18 layout at 224x224.
    pub fn resnet18(n_classes: usize) -> Self {
        Self {
            in_channels: 3,
            n_classes,
            layers: [2, 2, 2, 2],
            widths: [64, 128, 256, 512],
            input_size: 224,
        }
    }

    /// ResNet-34 layout at 224x224.
    pub fn resnet34(n_classes: usize) -> Self {
        Self {
            layers: [3, 4, 6, 3],
            ..Self::resnet18(n_classes)
        }
    }

    /// A very small network, mostly for tests and smoke runs.
    pub fn tiny(n_classes: usize) -> Self {
        Self {
            in_channels: 3,
            n_classes,
            layers: [1, 1, 1, 1],
            widths: [4, 8, 8, 8],
            input_size: 64,
        }
    }

    /// Set the input resolution.
    #[must_use]
    pub fn with_input_size(mut self, input_size: usize) -> Self {
        self.input_size = input_size;
        self
    }

    /// Shape of a single input image.
    pub fn input_shape(&self) -> ImageShape {
        ImageShape::new(self.in_channels, self.input_size, self.input_size)
    }

    /// The last convolution of the last residual block.
    pub fn default_target_layer(&self) -> String {
        match self.layers[3] {
            0 => "layer4".to_string(),
            n => format!("layer4.{}.conv2", n - 1),
        }
    }

    /// All observable layer names, in traversal order.
    pub fn observable_layers(&self) -> Vec<String> {
        layer_names(self.layers)
    }

    /// Initialize the model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        ResNet::new(self.clone(), device)
    }
}

/// 1x1 strided projection for the shortcut path.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

/// Residual block with two 3x3 convolutions and a skip connection.
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    /// Create a new residual block.
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(out_channels).init(device);

        let conv2 = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn2 = BatchNormConfig::new(out_channels).init(device);

        // Projection when the spatial size or channel count changes
        let downsample = if stride != 1 || in_channels != out_channels {
            Some(Downsample {
                conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                    .with_stride([stride, stride])
                    .with_bias(false)
                    .init(device),
                bn: BatchNormConfig::new(out_channels).init(device),
            })
        } else {
            None
        };

        Self {
            conv1,
            bn1,
            conv2,
            bn2,
            downsample,
        }
    }

    /// Forward pass, reporting `{name}.conv1`, `{name}.conv2` and `{name}`.
    pub fn forward(
        &self,
        x: Tensor<B, 4>,
        name: &str,
        mode: Mode,
        observer: &mut dyn LayerObserver<B>,
    ) -> Tensor<B, 4> {
        let out = self.conv1.forward(x.clone());
        let out = observer.observe(&format!("{}.conv1", name), out);
        let out = relu(batch_norm_2d(&self.bn1, out, mode));

        let out = self.conv2.forward(out);
        let out = observer.observe(&format!("{}.conv2", name), out);
        let out = batch_norm_2d(&self.bn2, out, mode);

        let identity = match &self.downsample {
            Some(down) => batch_norm_2d(&down.bn, down.conv.forward(x), mode),
            None => x,
        };

        let out = relu(out + identity);
        observer.observe(name, out)
    }
}

/// ResNet model for image classification.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    maxpool: MaxPool2d,
    stages: Vec<Vec<BasicBlock<B>>>,
    gap: AdaptiveAvgPool2d,
    fc: Linear<B>,
    in_channels: usize,
    input_size: usize,
    n_classes: usize,
}

impl<B: Backend> ResNet<B> {
    /// Create a new ResNet model.
    pub fn new(config: ResNetConfig, device: &B::Device) -> Self {
        let stem_width = config.widths[0];
        let conv1 = Conv2dConfig::new([config.in_channels, stem_width], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(stem_width).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut stages = Vec::with_capacity(4);
        let mut in_channels = stem_width;
        for (stage, (&n_blocks, &width)) in config.layers.iter().zip(config.widths.iter()).enumerate() {
            let stride = if stage == 0 { 1 } else { 2 };
            let mut blocks = Vec::with_capacity(n_blocks);
            for block in 0..n_blocks {
                let block_stride = if block == 0 { stride } else { 1 };
                blocks.push(BasicBlock::new(in_channels, width, block_stride, device));
                in_channels = width;
            }
            stages.push(blocks);
        }

        let gap = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let fc = LinearConfig::new(in_channels, config.n_classes).init(device);

        Self {
            conv1,
            bn1,
            maxpool,
            stages,
            gap,
            fc,
            in_channels: config.in_channels,
            input_size: config.input_size,
            n_classes: config.n_classes,
        }
    }

    /// Forward pass reporting every named layer to `observer`.
    pub fn forward_observed(
        &self,
        x: Tensor<B, 4>,
        ctx: &ExecutionContext<B>,
        observer: &mut dyn LayerObserver<B>,
    ) -> Tensor<B, 2> {
        let mode = ctx.mode();

        let out = self.conv1.forward(x);
        let out = relu(batch_norm_2d(&self.bn1, out, mode));
        let out = self.maxpool.forward(out);
        let mut out = observer.observe("stem", out);

        for (stage, blocks) in self.stages.iter().enumerate() {
            for (block_idx, block) in blocks.iter().enumerate() {
                let name = format!("layer{}.{}", stage + 1, block_idx);
                out = block.forward(out, &name, mode, observer);
            }
            out = observer.observe(&format!("layer{}", stage + 1), out);
        }

        let out = self.gap.forward(out);
        let [batch, channels, _, _] = out.dims();
        self.fc.forward(out.reshape([batch, channels]))
    }

    /// Number of output logits.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Shape of a single input image.
    pub fn input_shape(&self) -> ImageShape {
        ImageShape::new(self.in_channels, self.input_size, self.input_size)
    }

    /// Observable layer names, in traversal order.
    pub fn observable_layers(&self) -> Vec<String> {
        layer_names(self.stages.iter().map(Vec::len))
    }
}

/// Layer names reported by [`ResNet::forward_observed`] for the given number of
/// blocks per stage.
fn layer_names(blocks_per_stage: impl IntoIterator<Item = usize>) -> Vec<String> {
    let mut names = vec!["stem".to_string()];
    for (stage, n_blocks) in blocks_per_stage.into_iter().enumerate() {
        for block in 0..n_blocks {
            let prefix = format!("layer{}.{}", stage + 1, block);
            names.push(format!("{}.conv1", prefix));
            names.push(format!("{}.conv2", prefix));
            names.push(prefix);
        }
        names.push(format!("layer{}", stage + 1));
    }
    names
}

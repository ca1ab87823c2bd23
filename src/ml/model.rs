use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};
use serde::Serialize;

use crate::domain::{modes::OutputMode, patch::PatchShape};
use crate::error::SiameseError;

/// Floor under squared distances and norms so sqrt/division stay finite.
const EPSILON: f64 = 1e-7;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SiameseNetworkConfig {
    /// Channels per patch (1 for grayscale)
    #[config(default = 1)]
    pub channels: usize,
    #[config(default = 32)]
    pub conv1_filters: usize,
    #[config(default = 64)]
    pub conv2_filters: usize,
    /// Size of the vector each branch maps a patch to
    #[config(default = 128)]
    pub embedding_dim: usize,
}

impl Default for SiameseNetworkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SiameseNetworkConfig {
    pub fn init<B: Backend>(&self, mode: OutputMode, device: &B::Device) -> SiameseNetwork<B> {
        let head = match mode {
            OutputMode::Logit => Some(LinearConfig::new(self.embedding_dim, 1).init(device)),
            OutputMode::Euclidean | OutputMode::Cosine => None,
        };
        SiameseNetwork {
            branch: self.build_branch(device),
            head,
            mode:   Ignored(mode),
            config: Ignored(self.clone()),
        }
    }

    fn build_branch<B: Backend>(&self, device: &B::Device) -> Branch<B> {
        let conv1 = Conv2dConfig::new([self.channels, self.conv1_filters], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([self.conv1_filters, self.conv2_filters], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        Branch {
            conv1,
            conv2,
            pool:        MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            embed:       LinearConfig::new(self.conv2_filters, self.embedding_dim).init(device),
            activation:  Relu::new(),
        }
    }
}

/// One encoder. The network holds a single Branch and runs both
/// inputs through it, which is what makes the weights shared.
#[derive(Module, Debug)]
pub struct Branch<B: Backend> {
    pub conv1:       Conv2d<B>,
    pub conv2:       Conv2d<B>,
    pub pool:        MaxPool2d,
    pub global_pool: AdaptiveAvgPool2d,
    pub embed:       Linear<B>,
    pub activation:  Relu,
}

impl<B: Backend> Branch<B> {
    /// patches: [batch, C, H, W] → embeddings: [batch, embedding_dim]
    pub fn forward(&self, patches: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv1.forward(patches));
        let x = self.pool.forward(x);
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.global_pool.forward(x); // [batch, filters, 1, 1]
        self.embed.forward(x.flatten::<2>(1, 3))
    }
}

#[derive(Module, Debug)]
pub struct SiameseNetwork<B: Backend> {
    pub branch: Branch<B>,
    /// Present only in logit mode
    pub head:   Option<Linear<B>>,
    pub mode:   Ignored<OutputMode>,
    pub config: Ignored<SiameseNetworkConfig>,
}

/// Static description of a network, written next to the training curves.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkGraph {
    pub output_mode: OutputMode,
    pub config:      SiameseNetworkConfig,
    pub num_params:  usize,
    pub layers:      Vec<&'static str>,
}

impl<B: Backend> SiameseNetwork<B> {
    /// left, right: [batch, C, H, W] → scores: [batch, 1]
    pub fn forward(&self, left: Tensor<B, 4>, right: Tensor<B, 4>) -> Tensor<B, 2> {
        let a = self.branch.forward(left);
        let b = self.branch.forward(right);

        match (self.output_mode(), &self.head) {
            (OutputMode::Euclidean, _) => (a - b)
                .powf_scalar(2.0)
                .sum_dim(1)
                .clamp_min(EPSILON)
                .sqrt(),
            (OutputMode::Cosine, _) => {
                let dot    = (a.clone() * b.clone()).sum_dim(1);
                let norm_a = a.powf_scalar(2.0).sum_dim(1).clamp_min(EPSILON).sqrt();
                let norm_b = b.powf_scalar(2.0).sum_dim(1).clamp_min(EPSILON).sqrt();
                dot / (norm_a * norm_b)
            }
            (OutputMode::Logit, Some(head)) => head.forward((a - b).abs()),
            // init() always builds the head for logit mode
            (OutputMode::Logit, None) => (a - b).abs().sum_dim(1),
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        self.mode.0
    }

    pub fn config(&self) -> &SiameseNetworkConfig {
        &self.config.0
    }

    /// Reject patches the branch cannot take before they reach a kernel.
    pub fn check_input(&self, shape: PatchShape) -> crate::error::Result<()> {
        let expected = self.config().channels;
        if shape.channels != expected {
            return Err(SiameseError::Shape(format!(
                "network expects {expected}-channel patches, data has {} ({shape})",
                shape.channels
            )));
        }
        // 2x2 max pooling needs at least two rows and columns
        if shape.height < 2 || shape.width < 2 {
            return Err(SiameseError::Shape(format!(
                "patches must be at least 2x2, got {}x{}",
                shape.height, shape.width
            )));
        }
        Ok(())
    }

    pub fn graph(&self) -> NetworkGraph {
        let mut layers = vec!["conv1", "relu", "max_pool", "conv2", "relu", "global_avg_pool", "embed"];
        layers.push(match self.output_mode() {
            OutputMode::Euclidean => "euclidean_distance",
            OutputMode::Cosine    => "cosine_similarity",
            OutputMode::Logit     => "abs_diff_linear_head",
        });
        NetworkGraph {
            output_mode: self.output_mode(),
            config:      self.config().clone(),
            num_params:  self.num_params(),
            layers,
        }
    }
}
